use thiserror::Error;

/// Failures raised while reading the container or one of its entries.
///
/// These are internal to the engine; [`crate::error`] folds them into the
/// public [`ExtractionError`](crate::ExtractionError) taxonomy depending on
/// which stage they came from.
#[derive(Debug, Error)]
pub enum ZipError {
    #[error("not a valid ZIP file")]
    NotZip,

    #[error("invalid ZIP64 format")]
    InvalidZip64,

    #[error("central directory of {size} bytes exceeds the {limit} byte limit")]
    CentralDirectoryTooLarge { size: u64, limit: u64 },

    #[error("{what} lies outside the archive")]
    OutOfBounds { what: &'static str },

    #[error("invalid central directory file header")]
    InvalidCentralHeader,

    #[error("invalid local file header for entry '{0}'")]
    InvalidLocalHeader(String),

    #[error("entry '{0}' is encrypted")]
    Encrypted(String),

    #[error("entry '{name}' uses unsupported compression method {method}")]
    UnsupportedCompression { name: String, method: u16 },

    #[error("entry '{name}' has an invalid deflate stream: {source}")]
    Deflate {
        name: String,
        source: flate2::DecompressError,
    },

    #[error("entry '{0}' has a truncated deflate stream")]
    TruncatedStream(String),

    #[error("entry '{name}' should be {declared}B, but is larger when inflated")]
    Oversized { name: String, declared: u64 },

    #[error("entry '{name}' should be {declared}B, but is {actual}B when inflated")]
    Undersized {
        name: String,
        declared: u64,
        actual: u64,
    },

    #[error("entry '{name}' failed its CRC-32 check: expected {expected:08x}, got {actual:08x}")]
    Checksum {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("failed to read archive: {0:#}")]
    Read(anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<anyhow::Error> for ZipError {
    fn from(err: anyhow::Error) -> Self {
        ZipError::Read(err)
    }
}

pub type ZipResult<T> = Result<T, ZipError>;
