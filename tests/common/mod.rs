//! Test archive builder.
//!
//! Writes real ZIP bytes, but lets each entry's headers claim whatever the
//! test needs: wrong sizes, wrong CRCs, encryption flags.
#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};
use std::io::Write;

pub const DUMMY_NUSPEC: &str = include_str!("../fixtures/DummyProject.DummyPackage.nuspec");
pub const WITH_DEPENDENCIES: &str = include_str!("../fixtures/with_dependencies.nuspec");
pub const WITH_PACKAGE_TYPES: &str = include_str!("../fixtures/with_package_types.nuspec");
pub const WITH_METADATA: &str = include_str!("../fixtures/with_metadata.nuspec");

const STORED: u16 = 0;
const DEFLATE: u16 = 8;

/// Header overrides for one entry.
#[derive(Debug, Clone, Default)]
pub struct EntryOptions {
    stored: bool,
    declared_size: Option<u32>,
    crc32: Option<u32>,
    flags: u16,
}

impl EntryOptions {
    pub fn stored() -> Self {
        Self {
            stored: true,
            ..Default::default()
        }
    }

    pub fn deflated() -> Self {
        Self::default()
    }

    /// Claim `size` as the uncompressed size regardless of the real data.
    pub fn declared_size(mut self, size: u32) -> Self {
        self.declared_size = Some(size);
        self
    }

    pub fn crc32(mut self, crc: u32) -> Self {
        self.crc32 = Some(crc);
        self
    }

    pub fn encrypted(mut self) -> Self {
        self.flags |= 0x0001;
        self
    }
}

/// Where the ZIP64 locator sends the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zip64Locator {
    /// Points at the ZIP64 end of central directory record
    Valid,
    /// Points at an arbitrary offset
    PointingAt(u64),
    /// Left out of the archive
    Missing,
}

#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    body: Vec<u8>,
    central: Vec<u8>,
    entries: u16,
    comment: Vec<u8>,
    zip64: Option<Zip64Locator>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        self.entry(name, data, EntryOptions::deflated())
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.entry(name, data, EntryOptions::stored())
    }

    pub fn directory(self, name: &str) -> Self {
        self.entry(name, b"", EntryOptions::stored())
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.as_bytes().to_vec();
        self
    }

    /// Write ZIP64 end records and saturate the classic EOCD fields.
    pub fn zip64_with(mut self, locator: Zip64Locator) -> Self {
        self.zip64 = Some(locator);
        self
    }

    pub fn entry(mut self, name: &str, data: &[u8], options: EntryOptions) -> Self {
        let mut crc = Crc::new();
        crc.update(data);
        let crc32 = options.crc32.unwrap_or(crc.sum());

        let (method, payload) = if options.stored {
            (STORED, data.to_vec())
        } else {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).unwrap();
            (DEFLATE, encoder.finish().unwrap())
        };
        let uncompressed = options.declared_size.unwrap_or(data.len() as u32);
        let compressed = payload.len() as u32;
        let offset = self.body.len() as u32;

        let body = &mut self.body;
        body.extend_from_slice(b"PK\x03\x04");
        body.write_u16::<LittleEndian>(20).unwrap();
        body.write_u16::<LittleEndian>(options.flags).unwrap();
        body.write_u16::<LittleEndian>(method).unwrap();
        body.write_u16::<LittleEndian>(0).unwrap();
        body.write_u16::<LittleEndian>(0x21).unwrap();
        body.write_u32::<LittleEndian>(crc32).unwrap();
        body.write_u32::<LittleEndian>(compressed).unwrap();
        body.write_u32::<LittleEndian>(uncompressed).unwrap();
        body.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        body.write_u16::<LittleEndian>(0).unwrap();
        body.extend_from_slice(name.as_bytes());
        body.extend_from_slice(&payload);

        let cd = &mut self.central;
        cd.extend_from_slice(b"PK\x01\x02");
        cd.write_u16::<LittleEndian>(20).unwrap();
        cd.write_u16::<LittleEndian>(20).unwrap();
        cd.write_u16::<LittleEndian>(options.flags).unwrap();
        cd.write_u16::<LittleEndian>(method).unwrap();
        cd.write_u16::<LittleEndian>(0).unwrap();
        cd.write_u16::<LittleEndian>(0x21).unwrap();
        cd.write_u32::<LittleEndian>(crc32).unwrap();
        cd.write_u32::<LittleEndian>(compressed).unwrap();
        cd.write_u32::<LittleEndian>(uncompressed).unwrap();
        cd.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        cd.write_u16::<LittleEndian>(0).unwrap();
        cd.write_u16::<LittleEndian>(0).unwrap();
        cd.write_u16::<LittleEndian>(0).unwrap();
        cd.write_u16::<LittleEndian>(0).unwrap();
        cd.write_u32::<LittleEndian>(0).unwrap();
        cd.write_u32::<LittleEndian>(offset).unwrap();
        cd.extend_from_slice(name.as_bytes());

        self.entries += 1;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = self.body;
        let cd_offset = out.len() as u32;
        let cd_size = self.central.len() as u32;
        out.extend_from_slice(&self.central);

        let (entries, cd_size, cd_offset) = match self.zip64 {
            Some(locator) => {
                let eocd64_offset = out.len() as u64;
                out.extend_from_slice(b"PK\x06\x06");
                out.write_u64::<LittleEndian>(44).unwrap();
                out.write_u16::<LittleEndian>(45).unwrap();
                out.write_u16::<LittleEndian>(45).unwrap();
                out.write_u32::<LittleEndian>(0).unwrap();
                out.write_u32::<LittleEndian>(0).unwrap();
                out.write_u64::<LittleEndian>(self.entries as u64).unwrap();
                out.write_u64::<LittleEndian>(self.entries as u64).unwrap();
                out.write_u64::<LittleEndian>(cd_size as u64).unwrap();
                out.write_u64::<LittleEndian>(cd_offset as u64).unwrap();

                let target = match locator {
                    Zip64Locator::Valid => Some(eocd64_offset),
                    Zip64Locator::PointingAt(offset) => Some(offset),
                    Zip64Locator::Missing => None,
                };
                if let Some(target) = target {
                    out.extend_from_slice(b"PK\x06\x07");
                    out.write_u32::<LittleEndian>(0).unwrap();
                    out.write_u64::<LittleEndian>(target).unwrap();
                    out.write_u32::<LittleEndian>(1).unwrap();
                }
                (0xFFFF, 0xFFFF_FFFF, 0xFFFF_FFFF)
            }
            None => (self.entries, cd_size, cd_offset),
        };

        out.extend_from_slice(b"PK\x05\x06");
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(entries).unwrap();
        out.write_u16::<LittleEndian>(entries).unwrap();
        out.write_u32::<LittleEndian>(cd_size).unwrap();
        out.write_u32::<LittleEndian>(cd_offset).unwrap();
        out.write_u16::<LittleEndian>(self.comment.len() as u16).unwrap();
        out.extend_from_slice(&self.comment);
        out
    }
}

/// The usual payload entries of a `.nupkg`, minus the manifest.
pub fn package_skeleton() -> ArchiveBuilder {
    ArchiveBuilder::new()
        .deflated(
            "_rels/.rels",
            br#"<?xml version="1.0" encoding="utf-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships" />"#,
        )
        .deflated(
            "[Content_Types].xml",
            br#"<?xml version="1.0" encoding="utf-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types" />"#,
        )
        .directory("lib/")
        .directory("lib/netcoreapp3.0/")
        .stored("lib/netcoreapp3.0/DummyProject.DummyPackage.dll", &[0x4D, 0x5A, 0x90, 0x00, 0x03])
        .deflated(
            "package/services/metadata/core-properties/5d1b5d7f0bd4424b9bd8f4ec5b0e9f5a.psmdcp",
            br#"<coreProperties><creator>Test</creator></coreProperties>"#,
        )
}

/// A well-formed package whose manifest is `nuspec`.
pub fn package_with(nuspec: &str) -> Vec<u8> {
    package_skeleton()
        .deflated("DummyProject.DummyPackage.nuspec", nuspec.as_bytes())
        .build()
}

pub fn dummy_package() -> Vec<u8> {
    package_with(DUMMY_NUSPEC)
}
