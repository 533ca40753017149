//! Compact on-disk location attribute records.
//!
//! Every location is a stream of attributes. Each attribute starts with a byte
//! holding `kind << 3 | (len - 1)`, followed by `len` big-endian value bytes.
//! Attributes with a zero value are omitted and the stream ends with a zero byte,
//! so a typical class location takes well under 20 bytes.

use crate::{path::join_name, strings::StringTable, ImageError, Result};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeKind {
    End = 0,
    Module = 1,
    Parent = 2,
    Base = 3,
    Extension = 4,
    Offset = 5,
    Compressed = 6,
    Uncompressed = 7,
}

impl TryFrom<u8> for AttributeKind {
    type Error = ImageError;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => AttributeKind::End,
            1 => AttributeKind::Module,
            2 => AttributeKind::Parent,
            3 => AttributeKind::Base,
            4 => AttributeKind::Extension,
            5 => AttributeKind::Offset,
            6 => AttributeKind::Compressed,
            7 => AttributeKind::Uncompressed,
            _ => {
                return Err(ImageError::CorruptIndex(format!(
                    "unknown location attribute kind {value}"
                )))
            }
        })
    }
}

/// Decoded attributes of one location.
///
/// Name components are string table ids. `content_offset` is relative to the
/// start of the content region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocationAttributes {
    pub module: u32,
    pub parent: u32,
    pub base: u32,
    pub extension: u32,
    pub content_offset: u64,
    /// Zero when the content is stored uncompressed.
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

impl LocationAttributes {
    pub fn is_compressed(&self) -> bool {
        self.compressed_size != 0
    }

    /// Number of content bytes the location occupies in the image.
    pub fn on_disk_size(&self) -> u64 {
        if self.is_compressed() {
            self.compressed_size
        } else {
            self.uncompressed_size
        }
    }

    pub fn module_name<'s>(&self, strings: &'s StringTable) -> Result<&'s str> {
        strings.get_string(self.module)
    }

    /// Rebuild the full path of the location from its name components.
    pub fn full_name(&self, strings: &StringTable) -> Result<String> {
        Ok(join_name(
            strings.get_string(self.module)?,
            strings.get_string(self.parent)?,
            strings.get_string(self.base)?,
            strings.get_string(self.extension)?,
        ))
    }

    /// Append the encoded attribute stream to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        write_attribute(out, AttributeKind::Module, self.module as u64);
        write_attribute(out, AttributeKind::Parent, self.parent as u64);
        write_attribute(out, AttributeKind::Base, self.base as u64);
        write_attribute(out, AttributeKind::Extension, self.extension as u64);
        write_attribute(out, AttributeKind::Offset, self.content_offset);
        write_attribute(out, AttributeKind::Compressed, self.compressed_size);
        write_attribute(out, AttributeKind::Uncompressed, self.uncompressed_size);
        out.push(AttributeKind::End as u8);
    }

    /// Decode the attribute stream starting at `offset` in `bytes`.
    pub fn decode(bytes: &[u8], offset: usize) -> Result<Self> {
        let mut attributes = Self::default();
        let mut position = offset;

        loop {
            let Some(&header) = bytes.get(position) else {
                return Err(ImageError::CorruptIndex(format!(
                    "unterminated location at offset {offset}"
                )));
            };
            position += 1;

            let kind = AttributeKind::try_from(header >> 3)?;
            if kind == AttributeKind::End {
                return Ok(attributes);
            }

            let len = (header & 0x7) as usize + 1;
            let Some(value_bytes) = bytes.get(position..position + len) else {
                return Err(ImageError::CorruptIndex(format!(
                    "truncated location attribute at offset {position}"
                )));
            };
            position += len;

            let value = value_bytes
                .iter()
                .fold(0u64, |acc, &byte| (acc << 8) | byte as u64);

            match kind {
                AttributeKind::Module => attributes.module = string_id(value)?,
                AttributeKind::Parent => attributes.parent = string_id(value)?,
                AttributeKind::Base => attributes.base = string_id(value)?,
                AttributeKind::Extension => attributes.extension = string_id(value)?,
                AttributeKind::Offset => attributes.content_offset = value,
                AttributeKind::Compressed => attributes.compressed_size = value,
                AttributeKind::Uncompressed => attributes.uncompressed_size = value,
                AttributeKind::End => unreachable!(),
            }
        }
    }
}

fn write_attribute(out: &mut Vec<u8>, kind: AttributeKind, value: u64) {
    if value == 0 {
        return;
    }

    let len = (8 - value.leading_zeros() as usize / 8).max(1);
    out.push(((kind as u8) << 3) | (len - 1) as u8);
    out.extend_from_slice(&value.to_be_bytes()[8 - len..]);
}

fn string_id(value: u64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| ImageError::CorruptIndex(format!("string id {value} exceeds u32")))
}

/// A location resolved by the reader: its path plus its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLocation {
    pub name: String,
    pub attributes: LocationAttributes,
}

impl ImageLocation {
    pub fn content_offset(&self) -> u64 {
        self.attributes.content_offset
    }

    pub fn compressed_size(&self) -> u64 {
        self.attributes.compressed_size
    }

    pub fn uncompressed_size(&self) -> u64 {
        self.attributes.uncompressed_size
    }

    pub fn is_compressed(&self) -> bool {
        self.attributes.is_compressed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_attributes_are_omitted() {
        let mut out = Vec::new();
        LocationAttributes::default().encode(&mut out);
        assert_eq!(out, vec![0]);
    }

    #[test]
    fn test_minimal_value_width() {
        let mut out = Vec::new();
        LocationAttributes {
            module: 1,
            content_offset: 0x1_0000,
            uncompressed_size: u64::MAX,
            ..Default::default()
        }
        .encode(&mut out);

        assert_eq!(
            out,
            vec![
                1 << 3,
                1,
                (5 << 3) | 2,
                0x01,
                0x00,
                0x00,
                (7 << 3) | 7,
                0xFF,
                0xFF,
                0xFF,
                0xFF,
                0xFF,
                0xFF,
                0xFF,
                0xFF,
                0,
            ]
        );
    }

    #[test]
    fn test_decode_at_offset() {
        let first = LocationAttributes {
            module: 3,
            base: 4,
            uncompressed_size: 12,
            ..Default::default()
        };
        let second = LocationAttributes {
            module: 3,
            parent: 5,
            base: 6,
            extension: 7,
            content_offset: 12,
            compressed_size: 300,
            uncompressed_size: 900,
        };

        let mut out = Vec::new();
        first.encode(&mut out);
        let second_offset = out.len();
        second.encode(&mut out);

        assert_eq!(LocationAttributes::decode(&out, 0).unwrap(), first);
        assert_eq!(LocationAttributes::decode(&out, second_offset).unwrap(), second);
        assert_eq!(second.on_disk_size(), 300);
        assert_eq!(first.on_disk_size(), 12);
    }

    #[test]
    fn test_decode_truncated() {
        assert!(LocationAttributes::decode(&[(5 << 3) | 3, 1, 2], 0).is_err());
        assert!(LocationAttributes::decode(&[1 << 3, 1], 0).is_err());
        assert!(LocationAttributes::decode(&[], 0).is_err());
    }

    #[test]
    fn test_full_name() {
        let mut strings = StringTable::new();
        let attributes = LocationAttributes {
            module: strings.add_string("java.base"),
            parent: strings.add_string("java/lang"),
            base: strings.add_string("String"),
            extension: strings.add_string("class"),
            ..Default::default()
        };
        assert_eq!(
            attributes.full_name(&strings).unwrap(),
            "/java.base/java/lang/String.class"
        );
    }
}
