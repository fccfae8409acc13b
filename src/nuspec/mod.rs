//! The `.nuspec` manifest: its data model, parser and dependency flattening.

mod dependencies;
mod metadata;
mod parser;

pub use dependencies::DependencyNormalizer;
pub use metadata::{DependencyEntry, PackageMetadata};
pub use parser::parse_manifest;
