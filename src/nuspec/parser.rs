//! Streaming `.nuspec` reader.
//!
//! The document is walked once with an element path stack. Only the fields
//! below `package/metadata` that end up in [`PackageMetadata`] are kept;
//! everything else is skipped so newer manifest elements never break
//! extraction. Namespace prefixes are ignored.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::config::DependencyPolicy;
use crate::error::{ExtractionError, ExtractionResult};

use super::dependencies::DependencyNormalizer;
use super::metadata::PackageMetadata;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const METADATA: &[&str] = &["package", "metadata"];
const PACKAGE_TYPE: &[&str] = &["package", "metadata", "packageTypes", "packageType"];
const DEPENDENCY_GROUP: &[&str] = &["package", "metadata", "dependencies", "group"];
const DEPENDENCY: &[&str] = &["package", "metadata", "dependencies", "dependency"];
const GROUPED_DEPENDENCY: &[&str] =
    &["package", "metadata", "dependencies", "group", "dependency"];

/// Text fields under `package/metadata`.
#[derive(Debug, Default)]
struct TextFields {
    id: Option<String>,
    version: Option<String>,
    authors: Option<String>,
    description: Option<String>,
    license_url: Option<String>,
    project_url: Option<String>,
    icon_url: Option<String>,
    tags: Option<String>,
}

impl TextFields {
    fn slot(&mut self, element: &str) -> Option<&mut Option<String>> {
        match element {
            "id" => Some(&mut self.id),
            "version" => Some(&mut self.version),
            "authors" => Some(&mut self.authors),
            "description" => Some(&mut self.description),
            "licenseUrl" => Some(&mut self.license_url),
            "projectUrl" => Some(&mut self.project_url),
            "iconUrl" => Some(&mut self.icon_url),
            "tags" => Some(&mut self.tags),
            _ => None,
        }
    }
}

/// Manifest being assembled while the document is read.
struct ManifestDocument {
    path: Vec<String>,
    saw_metadata: bool,
    /// Text of the open `package/metadata` child is recorded
    keep_text: bool,
    fields: TextFields,
    package_types: Vec<String>,
    dependencies: DependencyNormalizer,
}

impl ManifestDocument {
    fn new(policy: DependencyPolicy) -> Self {
        Self {
            path: Vec::new(),
            saw_metadata: false,
            keep_text: false,
            fields: TextFields::default(),
            package_types: Vec::new(),
            dependencies: DependencyNormalizer::new(policy),
        }
    }

    fn at(&self, expected: &[&str]) -> bool {
        self.path.len() == expected.len() && self.path.iter().zip(expected).all(|(a, b)| a == b)
    }

    fn open(&mut self, element: &BytesStart<'_>, self_closing: bool) -> ExtractionResult<()> {
        let name = local_name(element);
        if self.path.is_empty() && name != "package" {
            return Err(ExtractionError::malformed(format!(
                "root element is <{name}>, expected <package>"
            )));
        }
        self.path.push(name);

        if let [first, second, field] = self.path.as_slice() {
            // Only the first occurrence of a field counts
            self.keep_text = first == METADATA[0]
                && second == METADATA[1]
                && self.fields.slot(field).is_some_and(|slot| slot.is_none());
        }

        if self.at(METADATA) {
            self.saw_metadata = true;
        } else if self.at(PACKAGE_TYPE) {
            if let Some(name) = attribute(element, "name")? {
                self.package_types.push(name);
            }
        } else if self.at(DEPENDENCY_GROUP) {
            if !self_closing {
                self.dependencies
                    .enter_group(attribute(element, "targetFramework")?);
            }
        } else if self.at(DEPENDENCY) || self.at(GROUPED_DEPENDENCY) {
            self.dependencies
                .declare(attribute(element, "id")?, attribute(element, "version")?)?;
        }

        if self_closing {
            self.path.pop();
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.at(DEPENDENCY_GROUP) {
            self.dependencies.leave_group();
        }
        self.path.pop();
    }

    /// Text directly inside a child of `package/metadata`. Segments split by
    /// CDATA sections or nested markup are joined as they appear.
    fn text(&mut self, text: &str) {
        if !self.keep_text || text.is_empty() {
            return;
        }
        let [_, _, element] = self.path.as_slice() else {
            return;
        };
        if let Some(slot) = self.fields.slot(element) {
            slot.get_or_insert_with(String::new).push_str(text);
        }
    }

    fn finish(self) -> ExtractionResult<PackageMetadata> {
        if !self.saw_metadata {
            return Err(ExtractionError::malformed("missing <metadata> element"));
        }

        let TextFields {
            id,
            version,
            authors,
            description,
            license_url,
            project_url,
            icon_url,
            tags,
        } = self.fields;

        let package_name =
            filled(id).ok_or_else(|| ExtractionError::malformed("missing package id"))?;
        let package_version = filled(version)
            .ok_or_else(|| ExtractionError::malformed("missing package version"))?;

        Ok(PackageMetadata {
            package_name,
            package_version,
            authors: filled(authors).unwrap_or_default(),
            description: filled(description).unwrap_or_default(),
            license_url: filled(license_url),
            project_url: filled(project_url),
            icon_url: filled(icon_url),
            package_tags: tags
                .map(|t| t.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            package_types: self.package_types,
            package_dependencies: self.dependencies.finish(),
        })
    }
}

/// Parse manifest bytes into package metadata.
pub fn parse_manifest(bytes: &[u8], policy: DependencyPolicy) -> ExtractionResult<PackageMetadata> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let source = std::str::from_utf8(bytes)
        .map_err(|e| ExtractionError::malformed(format!("document is not UTF-8: {e}")))?;

    let mut reader = Reader::from_str(source);

    let mut document = ManifestDocument::new(policy);

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => document.open(e, false)?,
            Ok(Event::Empty(ref e)) => document.open(e, true)?,
            Ok(Event::End(_)) => document.close(),
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(|err| {
                    ExtractionError::malformed(format!(
                        "{err} at position {}",
                        reader.buffer_position()
                    ))
                })?;
                document.text(&text);
            }
            Ok(Event::CData(ref e)) => document.text(&String::from_utf8_lossy(e)),
            Ok(Event::Eof) => break,
            // Declarations, comments, processing instructions, doctypes
            Ok(_) => {}
            Err(err) => {
                return Err(ExtractionError::malformed(format!(
                    "{err} at position {}",
                    reader.buffer_position()
                )));
            }
        }
    }

    document.finish()
}

/// Trimmed field value, `None` when absent or blank.
fn filled(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

/// Trimmed value of an attribute, `None` when absent or blank.
fn attribute(element: &BytesStart<'_>, name: &str) -> ExtractionResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| ExtractionError::malformed(e.to_string()))?;
        if attr.key.local_name().as_ref() != name.as_bytes() {
            continue;
        }
        let value = attr
            .unescape_value()
            .map_err(|e| ExtractionError::malformed(e.to_string()))?;
        let value = value.trim();
        return Ok((!value.is_empty()).then(|| value.to_string()));
    }
    Ok(None)
}
