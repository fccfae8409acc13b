//! The extraction error taxonomy.
//!
//! Every failure ends up as exactly one [`ExtractionError`]. Archive-level
//! damage means the upload is not a usable package; entry-level damage means
//! the manifest itself cannot be trusted.

use thiserror::Error;
use tracing::debug;

use crate::zip::ZipError;

pub type ExtractionResult<T> = Result<T, ExtractionError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// Unknown reference, wrong format, empty file, or unreadable container
    #[error("invalid package file")]
    InvalidPackageFile,

    /// No manifest entry at the archive root
    #[error("nuspec file not found")]
    ManifestNotFound,

    /// The manifest entry declares a size above the ceiling
    #[error("nuspec file too big")]
    ManifestTooLarge,

    /// The manifest entry is damaged or lies about its size
    #[error(transparent)]
    CorruptManifestEntry(#[from] CorruptEntry),
}

/// Why a manifest entry was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CorruptEntry {
    #[error(
        "nuspec file has the wrong entry size: entry '{name}' should be {declared}B, but is larger when inflated."
    )]
    Oversized { name: String, declared: u64 },

    #[error(
        "nuspec file has the wrong entry size: entry '{name}' should be {declared}B, but is {actual}B when inflated."
    )]
    Undersized {
        name: String,
        declared: u64,
        actual: u64,
    },

    #[error("nuspec file is malformed: {0}")]
    Malformed(String),
}

impl CorruptEntry {
    pub fn malformed(reason: impl Into<String>) -> Self {
        CorruptEntry::Malformed(reason.into())
    }
}

impl ExtractionError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        CorruptEntry::malformed(reason).into()
    }

    /// Classify a failure hit while opening or indexing the container.
    pub fn from_archive(err: ZipError) -> Self {
        debug!(error = %err, "package archive rejected");
        ExtractionError::InvalidPackageFile
    }

    /// Classify a failure hit while decoding one manifest candidate.
    pub fn from_entry(err: ZipError) -> Self {
        debug!(error = %err, "manifest entry rejected");
        let corrupt = match err {
            ZipError::Oversized { name, declared } => CorruptEntry::Oversized { name, declared },
            ZipError::Undersized {
                name,
                declared,
                actual,
            } => CorruptEntry::Undersized {
                name,
                declared,
                actual,
            },
            other => CorruptEntry::Malformed(other.to_string()),
        };
        corrupt.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_messages() {
        assert_eq!(
            ExtractionError::InvalidPackageFile.to_string(),
            "invalid package file"
        );
        assert_eq!(
            ExtractionError::ManifestNotFound.to_string(),
            "nuspec file not found"
        );
        assert_eq!(
            ExtractionError::ManifestTooLarge.to_string(),
            "nuspec file too big"
        );
    }

    #[test]
    fn oversized_entry_message_is_verbatim() {
        let err = ExtractionError::from_entry(ZipError::Oversized {
            name: "DummyProject.DummyPackage.nuspec".to_string(),
            declared: 255,
        });

        assert_eq!(
            err.to_string(),
            "nuspec file has the wrong entry size: entry 'DummyProject.DummyPackage.nuspec' should be 255B, but is larger when inflated."
        );
    }

    #[test]
    fn archive_failures_are_invalid_package_files() {
        assert_eq!(
            ExtractionError::from_archive(ZipError::NotZip),
            ExtractionError::InvalidPackageFile
        );
        assert_eq!(
            ExtractionError::from_archive(ZipError::InvalidCentralHeader),
            ExtractionError::InvalidPackageFile
        );
    }

    #[test]
    fn other_entry_failures_are_malformed() {
        let err = ExtractionError::from_entry(ZipError::Encrypted("a.nuspec".to_string()));

        assert_eq!(
            err,
            ExtractionError::malformed("entry 'a.nuspec' is encrypted")
        );
        assert_eq!(
            err.to_string(),
            "nuspec file is malformed: entry 'a.nuspec' is encrypted"
        );
    }
}
