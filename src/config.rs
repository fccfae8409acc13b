//! Extraction settings.
//!
//! All limits are plain values handed to the extractor; nothing here is
//! global.

use crate::package::PackageFormat;
use crate::zip::DEFAULT_MAX_CENTRAL_DIRECTORY_SIZE;

/// Default ceiling on the declared manifest size (5 MiB).
pub const DEFAULT_MAX_MANIFEST_SIZE: u64 = 5 * 1024 * 1024;

/// Default manifest file extension.
pub const DEFAULT_MANIFEST_EXTENSION: &str = ".nuspec";

/// What to do with a dependency row that has no `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependencyPolicy {
    /// Drop the row and keep going.
    #[default]
    Skip,
    /// Treat the whole manifest as malformed.
    Reject,
}

/// How to treat archives carrying more than one root manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifestSelection {
    /// Use the first candidate, in index order, that extracts cleanly.
    #[default]
    FirstValid,
    /// Fail unless there is exactly one candidate.
    RejectMultiple,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Format tag a reference must carry to be processed
    pub package_format: PackageFormat,
    /// Extension identifying the manifest entry, including the dot
    pub manifest_extension: String,
    /// Largest declared uncompressed manifest size accepted
    pub max_manifest_size: u64,
    /// Largest central directory buffered while locating the manifest
    pub max_central_directory_size: u64,
    pub dependency_policy: DependencyPolicy,
    pub manifest_selection: ManifestSelection,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            package_format: PackageFormat::Nuget,
            manifest_extension: DEFAULT_MANIFEST_EXTENSION.to_string(),
            max_manifest_size: DEFAULT_MAX_MANIFEST_SIZE,
            max_central_directory_size: DEFAULT_MAX_CENTRAL_DIRECTORY_SIZE,
            dependency_policy: DependencyPolicy::default(),
            manifest_selection: ManifestSelection::default(),
        }
    }
}

impl ExtractorConfig {
    pub fn with_max_manifest_size(mut self, bytes: u64) -> Self {
        self.max_manifest_size = bytes;
        self
    }

    pub fn with_max_central_directory_size(mut self, bytes: u64) -> Self {
        self.max_central_directory_size = bytes;
        self
    }

    pub fn with_package_format(mut self, format: PackageFormat) -> Self {
        self.package_format = format;
        self
    }

    pub fn with_manifest_extension(mut self, extension: impl Into<String>) -> Self {
        self.manifest_extension = extension.into();
        self
    }

    pub fn with_dependency_policy(mut self, policy: DependencyPolicy) -> Self {
        self.dependency_policy = policy;
        self
    }

    pub fn with_manifest_selection(mut self, selection: ManifestSelection) -> Self {
        self.manifest_selection = selection;
        self
    }
}
