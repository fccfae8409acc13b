//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory in one request
//! 4. Walk the Central Directory one header at a time, on demand
//!
//! Every offset and length read from the archive is checked against the
//! archive size before it is used to allocate or read.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::sync::Arc;

use crate::io::ReadAt;

use super::error::{ZipError, ZipResult};
use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Default cap on the central directory size (64 MiB).
pub const DEFAULT_MAX_CENTRAL_DIRECTORY_SIZE: u64 = 64 * 1024 * 1024;

/// Low-level ZIP file parser.
///
/// Generic over the reader type so the same code serves local files,
/// in-memory buffers and HTTP sources.
///
/// ## Example
///
/// ```ignore
/// let parser = ZipParser::new(reader);
/// let directory = parser.central_directory().await?;
/// for entry in directory.entries() {
///     let entry = entry?;
///     let offset = parser.get_data_offset(&entry).await?;
///     // Read entry data from offset...
/// }
/// ```
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
    /// Largest central directory we are willing to buffer
    max_cd_size: u64,
}

/// The raw central directory, parsed lazily by [`CentralDirectory::entries`].
pub struct CentralDirectory {
    data: Vec<u8>,
    total_entries: u64,
}

impl<R: ReadAt> ZipParser<R> {
    /// Create a new parser with the default central directory cap.
    pub fn new(reader: Arc<R>) -> Self {
        Self::with_limit(reader, DEFAULT_MAX_CENTRAL_DIRECTORY_SIZE)
    }

    /// Create a parser that refuses central directories above `max_cd_size`.
    pub fn with_limit(reader: Arc<R>, max_cd_size: u64) -> Self {
        let size = reader.size();
        Self {
            reader,
            size,
            max_cd_size,
        }
    }

    /// Total archive size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Handles both the simple case (no comment) and archives with
    /// comments by searching backwards for the signature.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in file).
    pub async fn find_eocd(&self) -> ZipResult<(EndOfCentralDirectory, u64)> {
        let eocd_size = EndOfCentralDirectory::SIZE as u64;
        if self.size < eocd_size {
            return Err(ZipError::NotZip);
        }

        // Common case: no comment, EOCD is the last 22 bytes.
        let offset = self.size - eocd_size;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf).await?;

        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        // The EOCD is followed by a comment; search backwards for it.
        let search_size = (MAX_COMMENT_SIZE + eocd_size).min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.reader.read_exact_at(search_start, &mut buf).await?;

        for i in (0..buf.len().saturating_sub(EndOfCentralDirectory::SIZE)).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                // Only accept a candidate whose comment runs exactly to EOF
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(ZipError::NotZip)
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD indicates ZIP64 extensions are needed
    /// (fields set to 0xFFFF or 0xFFFFFFFF).
    pub async fn read_zip64_eocd(&self, eocd_offset: u64) -> ZipResult<Zip64EOCD> {
        // The locator sits immediately before the regular EOCD
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or(ZipError::InvalidZip64)?;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.reader
            .read_exact_at(locator_offset, &mut locator_buf)
            .await?;

        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        let eocd64_end = locator
            .eocd64_offset
            .checked_add(Zip64EOCD::MIN_SIZE as u64)
            .filter(|end| *end <= locator_offset)
            .ok_or(ZipError::OutOfBounds {
                what: "ZIP64 end of central directory",
            })?;
        let mut eocd64_buf = vec![0u8; (eocd64_end - locator.eocd64_offset) as usize];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)
            .await?;

        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    /// Locate and buffer the Central Directory.
    ///
    /// Only the raw bytes are read here; headers are decoded one at a time
    /// by [`CentralDirectory::entries`].
    pub async fn central_directory(&self) -> ZipResult<CentralDirectory> {
        let (eocd, eocd_offset) = self.find_eocd().await?;

        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset).await?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        if cd_size > self.max_cd_size {
            return Err(ZipError::CentralDirectoryTooLarge {
                size: cd_size,
                limit: self.max_cd_size,
            });
        }

        cd_offset
            .checked_add(cd_size)
            .filter(|end| *end <= eocd_offset)
            .ok_or(ZipError::OutOfBounds {
                what: "central directory",
            })?;

        let mut data = vec![0u8; cd_size as usize];
        self.reader.read_exact_at(cd_offset, &mut data).await?;

        Ok(CentralDirectory {
            data,
            total_entries,
        })
    }

    /// List all entries in the archive.
    pub async fn list_files(&self) -> ZipResult<Vec<ArchiveEntry>> {
        self.central_directory().await?.entries().collect()
    }

    /// Get the actual data offset for an entry.
    ///
    /// The Local File Header has variable-length fields (filename, extra
    /// field) that may differ from the Central Directory entry, so it has
    /// to be read to find where the entry data begins.
    pub async fn get_data_offset(&self, entry: &ArchiveEntry) -> ZipResult<u64> {
        entry
            .lfh_offset
            .checked_add(LFH_SIZE as u64)
            .filter(|end| *end <= self.size)
            .ok_or(ZipError::OutOfBounds {
                what: "local file header",
            })?;

        let mut lfh_buf = vec![0u8; LFH_SIZE];
        self.reader
            .read_exact_at(entry.lfh_offset, &mut lfh_buf)
            .await?;

        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(ZipError::InvalidLocalHeader(entry.name.clone()));
        }

        // Filename and extra field lengths live at offset 26
        let mut cursor = Cursor::new(&lfh_buf[26..]);
        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}

impl CentralDirectory {
    /// Number of entries the EOCD claims.
    pub fn declared_entries(&self) -> u64 {
        self.total_entries
    }

    /// Iterate the central directory headers in index order.
    ///
    /// The iterator yields at most one error, after which it is exhausted.
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            cursor: Cursor::new(self.data.as_slice()),
            remaining: self.total_entries,
        }
    }
}

/// Lazy iterator over central directory headers.
pub struct Entries<'a> {
    cursor: Cursor<&'a [u8]>,
    remaining: u64,
}

impl Iterator for Entries<'_> {
    type Item = ZipResult<ArchiveEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let parsed = parse_cdfh(&mut self.cursor);
        if parsed.is_err() {
            self.remaining = 0;
        }
        Some(parsed)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.cursor.get_ref().len() as u64 - self.cursor.position();
        let upper = self.remaining.min(left / CDFH_MIN_SIZE as u64) as usize;
        (0, Some(upper))
    }
}

/// Parse one Central Directory File Header.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> ZipResult<ArchiveEntry> {
    let data_len = cursor.get_ref().len() as u64;
    if cursor.position() + CDFH_MIN_SIZE as u64 > data_len {
        return Err(ZipError::InvalidCentralHeader);
    }

    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        return Err(ZipError::InvalidCentralHeader);
    }

    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
    let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;
    let file_comment_length = cursor.read_u16::<LittleEndian>()? as u64;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let record_end =
        cursor.position() + file_name_length + extra_field_length + file_comment_length;
    if record_end > data_len {
        return Err(ZipError::InvalidCentralHeader);
    }

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    // Non-UTF8 names cannot match the manifest convention anyway
    let file_name = String::from_utf8_lossy(&file_name_bytes).into_owned();
    let is_directory = file_name.ends_with('/');

    // ZIP64 extended information lives in extra field 0x0001
    let extra_field_end = cursor.position() + extra_field_length;

    while cursor.position() + 4 <= extra_field_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()? as u64;
        let field_end = (cursor.position() + field_size).min(extra_field_end);

        if header_id == 0x0001 {
            // Fields are present only if the header field is saturated
            if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                uncompressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                compressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                lfh_offset = cursor.read_u64::<LittleEndian>()?;
            }
        }
        cursor.set_position(field_end);
    }

    cursor.set_position(record_end);

    Ok(ArchiveEntry {
        name: file_name,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        flags,
        lfh_offset,
        is_directory,
    })
}
