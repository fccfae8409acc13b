//! Package metadata extraction.
//!
//! [`MetadataExtractor`] runs the whole pipeline for a stored package:
//! reference checks, manifest lookup in the central directory, the declared
//! size ceiling, bounded inflation and manifest parsing. The first failure
//! ends the call; no partial metadata is ever returned.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::config::{ExtractorConfig, ManifestSelection};
use crate::error::{ExtractionError, ExtractionResult};
use crate::io::ReadAt;
use crate::nuspec::{PackageMetadata, parse_manifest};
use crate::package::{PackageReference, validate};
use crate::store::PackageStore;
use crate::zip::{ArchiveEntry, ZipParser, ZipResult, inflate_entry};

/// Extracts manifest metadata from packages held in a [`PackageStore`].
///
/// The extractor keeps no per-call state, so one instance can serve any
/// number of concurrent extractions.
pub struct MetadataExtractor<S: PackageStore> {
    store: S,
    config: ExtractorConfig,
}

impl<S: PackageStore> MetadataExtractor<S> {
    pub fn new(store: S, config: ExtractorConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract metadata for `reference`.
    ///
    /// # Errors
    ///
    /// Exactly one [`ExtractionError`] describing the first failed stage.
    #[instrument(skip_all, fields(id = %reference.id))]
    pub async fn extract(&self, reference: &PackageReference) -> ExtractionResult<PackageMetadata> {
        validate(reference, &self.config)?;

        let reader = match self.store.open(&reference.id).await {
            Ok(Some(reader)) => reader,
            Ok(None) => {
                warn!("package file does not exist");
                return Err(ExtractionError::InvalidPackageFile);
            }
            Err(err) => {
                warn!(error = %err, "package file could not be opened");
                return Err(ExtractionError::InvalidPackageFile);
            }
        };

        if reader.size() == 0 {
            warn!("stored package file is empty");
            return Err(ExtractionError::InvalidPackageFile);
        }
        if reader.size() != reference.size {
            debug!(
                recorded = reference.size,
                stored = reader.size(),
                "stored size differs from the recorded size"
            );
        }

        extract_from_reader(Arc::new(reader), &self.config).await
    }
}

/// Whether `entry` follows the manifest naming convention: a file at the
/// archive root ending with `extension` (ASCII case-insensitive).
pub fn is_manifest_candidate(entry: &ArchiveEntry, extension: &str) -> bool {
    if entry.is_directory || !entry.is_at_root() || entry.name.len() <= extension.len() {
        return false;
    }
    entry
        .name
        .get(entry.name.len() - extension.len()..)
        .is_some_and(|tail| tail.eq_ignore_ascii_case(extension))
}

/// Refuse entries whose own header claims more than `ceiling` bytes.
pub fn check_declared_size(entry: &ArchiveEntry, ceiling: u64) -> ExtractionResult<()> {
    if entry.uncompressed_size > ceiling {
        warn!(
            entry = %entry.name,
            declared = entry.uncompressed_size,
            ceiling,
            "manifest entry declares an oversized body"
        );
        return Err(ExtractionError::ManifestTooLarge);
    }
    Ok(())
}

/// Run the archive stages against an already opened package.
///
/// Skips reference validation; use [`MetadataExtractor::extract`] for the
/// full pipeline.
pub async fn extract_from_reader<R: ReadAt>(
    reader: Arc<R>,
    config: &ExtractorConfig,
) -> ExtractionResult<PackageMetadata> {
    let parser = ZipParser::with_limit(reader, config.max_central_directory_size);
    let directory = parser
        .central_directory()
        .await
        .map_err(ExtractionError::from_archive)?;

    debug!(entries = directory.declared_entries(), "central directory loaded");

    let extension = config.manifest_extension.as_str();
    let candidates = directory.entries().filter(|entry| match entry {
        Ok(entry) => is_manifest_candidate(entry, extension),
        Err(_) => true,
    });

    match config.manifest_selection {
        ManifestSelection::FirstValid => first_valid(&parser, candidates, config).await,
        ManifestSelection::RejectMultiple => {
            let candidates = candidates
                .collect::<ZipResult<Vec<_>>>()
                .map_err(ExtractionError::from_archive)?;
            if candidates.len() > 1 {
                warn!(count = candidates.len(), "archive holds several manifests");
                return Err(ExtractionError::malformed("multiple nuspec files found"));
            }
            first_valid(&parser, candidates.into_iter().map(Ok), config).await
        }
    }
}

/// Try candidates in index order; the first that parses wins.
async fn first_valid<R: ReadAt>(
    parser: &ZipParser<R>,
    candidates: impl Iterator<Item = ZipResult<ArchiveEntry>>,
    config: &ExtractorConfig,
) -> ExtractionResult<PackageMetadata> {
    let mut first_failure = None;

    for candidate in candidates {
        let entry = candidate.map_err(ExtractionError::from_archive)?;
        debug!(
            entry = %entry.name,
            declared = entry.uncompressed_size,
            compressed = entry.compressed_size,
            "trying manifest candidate"
        );

        match read_candidate(parser, &entry, config).await {
            Ok(metadata) => {
                debug!(
                    name = %metadata.package_name,
                    version = %metadata.package_version,
                    dependencies = metadata.package_dependencies.len(),
                    "manifest extracted"
                );
                return Ok(metadata);
            }
            Err(err) => {
                debug!(entry = %entry.name, error = %err, "manifest candidate rejected");
                first_failure.get_or_insert(err);
            }
        }
    }

    Err(first_failure.unwrap_or(ExtractionError::ManifestNotFound))
}

async fn read_candidate<R: ReadAt>(
    parser: &ZipParser<R>,
    entry: &ArchiveEntry,
    config: &ExtractorConfig,
) -> ExtractionResult<PackageMetadata> {
    check_declared_size(entry, config.max_manifest_size)?;
    let bytes = inflate_entry(parser, entry)
        .await
        .map_err(ExtractionError::from_entry)?;
    parse_manifest(&bytes, config.dependency_policy)
}
