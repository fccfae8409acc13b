//! # nupkg-meta
//!
//! Defensive metadata extraction for NuGet package archives.
//!
//! A `.nupkg` is a ZIP archive with a `.nuspec` XML manifest at its root.
//! This library finds that manifest without reading the rest of the
//! payload, refuses entries whose declared or actual size is abusive, and
//! returns the package identity, descriptive fields, tags, types and a flat
//! list of dependencies annotated with their target framework.
//!
//! ## Features
//!
//! - Packages from local directories, memory, or HTTP Range-capable storage
//! - ZIP64 archives and archives with trailing comments
//! - Declared-size ceiling checked before any decompression
//! - Inflation bounded by the entry's declared size, with CRC-32 verification
//! - A closed error taxonomy with stable, user-facing messages
//!
//! ## Example
//!
//! ```no_run
//! use nupkg_meta::{
//!     DirectoryStore, ExtractorConfig, MetadataExtractor, PackageFormat, PackageReference,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let extractor = MetadataExtractor::new(
//!         DirectoryStore::new("/var/packages"),
//!         ExtractorConfig::default(),
//!     );
//!
//!     let reference = PackageReference::new("foo.1.0.0.nupkg", 4096, PackageFormat::Nuget);
//!     let metadata = extractor.extract(&reference).await?;
//!     println!("{} {}", metadata.package_name, metadata.package_version);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod io;
pub mod nuspec;
pub mod package;
pub mod store;
pub mod zip;

pub use cli::Cli;
pub use config::{DependencyPolicy, ExtractorConfig, ManifestSelection};
pub use error::{CorruptEntry, ExtractionError, ExtractionResult};
pub use extractor::{MetadataExtractor, extract_from_reader};
pub use io::{HttpOptions, HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
pub use nuspec::{DependencyEntry, PackageMetadata};
pub use package::{PackageFormat, PackageReference, validate};
pub use store::{DirectoryStore, MemoryStore, PackageStore};
pub use zip::{ArchiveEntry, ZipParser};
