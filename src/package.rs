//! Package references and the pre-flight check run before any archive I/O.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::warn;

use crate::config::ExtractorConfig;
use crate::error::{ExtractionError, ExtractionResult};

/// Registry format a stored package file claims to belong to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PackageFormat {
    Nuget,
    Maven,
    Npm,
    Pypi,
    Composer,
    Conan,
    Generic,
    Golang,
    Debian,
    Rubygems,
    Helm,
    TerraformModule,
    Other(String),
}

impl PackageFormat {
    pub fn as_str(&self) -> &str {
        match self {
            PackageFormat::Nuget => "nuget",
            PackageFormat::Maven => "maven",
            PackageFormat::Npm => "npm",
            PackageFormat::Pypi => "pypi",
            PackageFormat::Composer => "composer",
            PackageFormat::Conan => "conan",
            PackageFormat::Generic => "generic",
            PackageFormat::Golang => "golang",
            PackageFormat::Debian => "debian",
            PackageFormat::Rubygems => "rubygems",
            PackageFormat::Helm => "helm",
            PackageFormat::TerraformModule => "terraform_module",
            PackageFormat::Other(tag) => tag,
        }
    }

    /// Guess the format from a file name, as uploads arrive with one.
    pub fn from_file_name(name: &str) -> Self {
        let extension = Path::new(name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "nupkg" | "snupkg" => PackageFormat::Nuget,
            "jar" | "pom" => PackageFormat::Maven,
            "whl" => PackageFormat::Pypi,
            "gem" => PackageFormat::Rubygems,
            "deb" => PackageFormat::Debian,
            _ => PackageFormat::Generic,
        }
    }
}

impl fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Ok(match tag.as_str() {
            "nuget" => PackageFormat::Nuget,
            "maven" => PackageFormat::Maven,
            "npm" => PackageFormat::Npm,
            "pypi" => PackageFormat::Pypi,
            "composer" => PackageFormat::Composer,
            "conan" => PackageFormat::Conan,
            "generic" => PackageFormat::Generic,
            "golang" => PackageFormat::Golang,
            "debian" => PackageFormat::Debian,
            "rubygems" => PackageFormat::Rubygems,
            "helm" => PackageFormat::Helm,
            "terraform_module" => PackageFormat::TerraformModule,
            _ => PackageFormat::Other(tag),
        })
    }
}

/// Handle to an already-stored package file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReference {
    /// Store-specific identifier
    pub id: String,
    /// Size recorded when the file was stored
    pub size: u64,
    pub format: PackageFormat,
}

impl PackageReference {
    pub fn new(id: impl Into<String>, size: u64, format: PackageFormat) -> Self {
        Self {
            id: id.into(),
            size,
            format,
        }
    }
}

/// Reject references that can never hold a manifest for this extractor.
pub fn validate(reference: &PackageReference, config: &ExtractorConfig) -> ExtractionResult<()> {
    if reference.format != config.package_format {
        warn!(
            id = %reference.id,
            format = %reference.format,
            expected = %config.package_format,
            "package file has the wrong format"
        );
        return Err(ExtractionError::InvalidPackageFile);
    }

    if reference.size == 0 {
        warn!(id = %reference.id, "package file is empty");
        return Err(ExtractionError::InvalidPackageFile);
    }

    Ok(())
}
