//! Image header and byte order.
//!
//! The header is the only fixed-size part of an image. Every table after it is
//! sized from the header's counts.

use binrw::{binrw, BinRead, BinWrite, Endian};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};

use crate::{ImageError, Result};

/// Magic value at the start of every image, written in the image byte order.
pub const IMAGE_MAGIC: u32 = 0xCAFE_DADA;

/// Major format version written by this crate. Readers reject any other major.
pub const MAJOR_VERSION: u16 = 1;

/// Minor format version written by this crate.
pub const MINOR_VERSION: u16 = 0;

/// Byte order of every multi-byte integer in the header and tables.
///
/// The order is part of the file's compatibility contract: the reader detects it
/// from the magic, so an image built on one host can be read on any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum ImageByteOrder {
    Little,
    Big,
    /// The byte order of the building host.
    #[default]
    Native,
}

impl ImageByteOrder {
    /// Resolve [`ImageByteOrder::Native`] to the concrete order of this host.
    pub fn resolve(self) -> Self {
        match self {
            ImageByteOrder::Native if cfg!(target_endian = "big") => ImageByteOrder::Big,
            ImageByteOrder::Native => ImageByteOrder::Little,
            order => order,
        }
    }

    pub fn endian(self) -> Endian {
        match self.resolve() {
            ImageByteOrder::Big => Endian::Big,
            _ => Endian::Little,
        }
    }
}

impl std::fmt::Display for ImageByteOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ImageByteOrder::Little => "little",
            ImageByteOrder::Big => "big",
            ImageByteOrder::Native => "native",
        })
    }
}

/// Fixed-size header at the start of an image.
#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub magic: u32,
    pub major_version: u16,
    pub minor_version: u16,
    /// Number of real (content) resources.
    pub resource_count: u32,
    /// Number of slots in the redirect and offset tables.
    pub table_length: u32,
    pub location_attributes_size: u32,
    pub strings_size: u32,
}

impl ImageHeader {
    /// Encoded size of the header in bytes.
    pub const SIZE: usize = 4 + 2 + 2 + 4 * 4;

    pub fn new(
        resource_count: u32,
        table_length: u32,
        location_attributes_size: u32,
        strings_size: u32,
    ) -> Self {
        Self {
            magic: IMAGE_MAGIC,
            major_version: MAJOR_VERSION,
            minor_version: MINOR_VERSION,
            resource_count,
            table_length,
            location_attributes_size,
            strings_size,
        }
    }

    /// Byte offset of the redirect table.
    pub fn redirect_offset(&self) -> u64 {
        Self::SIZE as u64
    }

    /// Byte offset of the location offsets table.
    pub fn offsets_offset(&self) -> u64 {
        self.redirect_offset() + self.table_length as u64 * 4
    }

    /// Byte offset of the location attribute region.
    pub fn location_attributes_offset(&self) -> u64 {
        self.offsets_offset() + self.table_length as u64 * 4
    }

    /// Byte offset of the string table.
    pub fn strings_offset(&self) -> u64 {
        self.location_attributes_offset() + self.location_attributes_size as u64
    }

    /// Size of the whole index region; content offsets are relative to this.
    pub fn index_size(&self) -> u64 {
        self.strings_offset() + self.strings_size as u64
    }

    pub fn encode(&self, order: ImageByteOrder) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(Self::SIZE));
        self.write_options(&mut cursor, order.endian(), ())?;
        Ok(cursor.into_inner())
    }

    /// Decode a header, detecting the byte order from the magic.
    pub fn decode<R: Read>(reader: &mut R) -> Result<(Self, ImageByteOrder)> {
        let mut bytes = [0; Self::SIZE];
        reader.read_exact(&mut bytes)?;

        let raw_magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        let order = if u32::from_le_bytes(raw_magic) == IMAGE_MAGIC {
            ImageByteOrder::Little
        } else if u32::from_be_bytes(raw_magic) == IMAGE_MAGIC {
            ImageByteOrder::Big
        } else {
            return Err(ImageError::InvalidMagic(u32::from_le_bytes(raw_magic)));
        };

        let header = Self::read_options(&mut Cursor::new(&bytes[..]), order.endian(), ())?;
        if header.major_version != MAJOR_VERSION {
            return Err(ImageError::UnsupportedVersion {
                major: header.major_version,
                minor: header.minor_version,
            });
        }

        Ok((header, order))
    }
}
