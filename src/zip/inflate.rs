//! Bounded entry decompression.
//!
//! An entry is inflated into a buffer that grows in steps up to the entry's
//! declared uncompressed size. The moment the decoder has one more byte to
//! give, the entry is rejected, so a lying central directory can never make
//! us buffer more than it claimed, nor reserve it before data arrives.

use flate2::{Crc, Decompress, FlushDecompress, Status};
use tracing::trace;

use crate::io::ReadAt;

use super::error::{ZipError, ZipResult};
use super::parser::ZipParser;
use super::structures::{ArchiveEntry, CompressionMethod};

/// Compressed bytes pulled from the reader per request.
const READ_CHUNK_SIZE: u64 = 32 * 1024;

/// Output capacity added whenever the inflate buffer fills up.
const OUTPUT_STEP: u64 = 64 * 1024;

/// Inflate `entry` into memory, enforcing its declared size and CRC-32.
///
/// Callers are expected to have bounded `entry.uncompressed_size` already;
/// memory use never exceeds it, but grows only as output is produced.
pub async fn inflate_entry<R: ReadAt>(
    parser: &ZipParser<R>,
    entry: &ArchiveEntry,
) -> ZipResult<Vec<u8>> {
    if entry.is_encrypted() {
        return Err(ZipError::Encrypted(entry.name.clone()));
    }

    let data_offset = parser.get_data_offset(entry).await?;
    let data_end = data_offset
        .checked_add(entry.compressed_size)
        .filter(|end| *end <= parser.size())
        .ok_or(ZipError::OutOfBounds { what: "entry data" })?;

    let output = match entry.compression_method {
        CompressionMethod::Stored => read_stored(parser, entry, data_offset).await?,
        CompressionMethod::Deflate => inflate_deflate(parser, entry, data_offset, data_end).await?,
        CompressionMethod::Unknown(method) => {
            return Err(ZipError::UnsupportedCompression {
                name: entry.name.clone(),
                method,
            });
        }
    };

    if (output.len() as u64) < entry.uncompressed_size {
        return Err(ZipError::Undersized {
            name: entry.name.clone(),
            declared: entry.uncompressed_size,
            actual: output.len() as u64,
        });
    }

    let mut crc = Crc::new();
    crc.update(&output);
    if crc.sum() != entry.crc32 {
        return Err(ZipError::Checksum {
            name: entry.name.clone(),
            expected: entry.crc32,
            actual: crc.sum(),
        });
    }

    Ok(output)
}

async fn read_stored<R: ReadAt>(
    parser: &ZipParser<R>,
    entry: &ArchiveEntry,
    data_offset: u64,
) -> ZipResult<Vec<u8>> {
    // For STORED data both sizes describe the same bytes
    if entry.compressed_size > entry.uncompressed_size {
        return Err(ZipError::Oversized {
            name: entry.name.clone(),
            declared: entry.uncompressed_size,
        });
    }

    let mut output = vec![0u8; entry.compressed_size as usize];
    parser.reader().read_exact_at(data_offset, &mut output).await?;
    Ok(output)
}

async fn inflate_deflate<R: ReadAt>(
    parser: &ZipParser<R>,
    entry: &ArchiveEntry,
    data_offset: u64,
    data_end: u64,
) -> ZipResult<Vec<u8>> {
    let declared = entry.uncompressed_size;
    let mut inflater = Decompress::new(false);
    let mut output: Vec<u8> = Vec::new();

    let mut chunk = Vec::new();
    let mut consumed_in_chunk = 0;
    let mut position = data_offset;

    loop {
        if consumed_in_chunk == chunk.len() && position < data_end {
            let len = READ_CHUNK_SIZE.min(data_end - position) as usize;
            chunk.resize(len, 0);
            parser.reader().read_exact_at(position, &mut chunk).await?;
            position += len as u64;
            consumed_in_chunk = 0;
        }

        let input = &chunk[consumed_in_chunk..];
        let in_before = inflater.total_in();
        let out_before = inflater.total_out();

        let result = if (output.len() as u64) < declared {
            if output.len() == output.capacity() {
                let remaining = declared - output.len() as u64;
                output.reserve_exact(remaining.min(OUTPUT_STEP) as usize);
            }
            inflater.decompress_vec(input, &mut output, FlushDecompress::None)
        } else {
            // Buffer is full: any further byte proves the index lied
            let mut spare = [0u8; 1];
            inflater.decompress(input, &mut spare, FlushDecompress::None)
        };
        let status = result.map_err(|source| ZipError::Deflate {
            name: entry.name.clone(),
            source,
        })?;

        let consumed = (inflater.total_in() - in_before) as usize;
        let produced = inflater.total_out() - out_before;
        consumed_in_chunk += consumed;

        if inflater.total_out() > declared {
            trace!(entry = %entry.name, declared, "inflated output exceeded declared size");
            return Err(ZipError::Oversized {
                name: entry.name.clone(),
                declared,
            });
        }

        if status == Status::StreamEnd {
            break;
        }

        if consumed == 0 && produced == 0 {
            // No progress and no more input to offer
            return Err(ZipError::TruncatedStream(entry.name.clone()));
        }
    }

    Ok(output)
}
