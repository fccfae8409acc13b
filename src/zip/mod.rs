//! ZIP container reading.
//!
//! Package archives are ZIP files. This module reads just enough of one to
//! find and decode a single entry without touching the rest of the payload.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of ZIP structures from raw bytes
//! - [`inflate`]: Size-bounded decompression of a single entry
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The EOCD is read first (from the end of the file), then the Central
//! Directory, so entries can be located without reading the archive body.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions
//! - STORED and DEFLATE entries, with CRC-32 verification
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod error;
mod inflate;
mod parser;
mod structures;

pub use error::{ZipError, ZipResult};
pub use inflate::inflate_entry;
pub use parser::{CentralDirectory, DEFAULT_MAX_CENTRAL_DIRECTORY_SIZE, Entries, ZipParser};
pub use structures::*;
