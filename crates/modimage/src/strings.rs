//! Interned string table backing every name reference in the index.

use byteorder::{ReadBytesExt, WriteBytesExt};
use indexmap::IndexSet;
use std::io::{self, Cursor, Read};

use crate::{header::ImageByteOrder, ImageError, Result};

/// Insertion-ordered, bidirectional string interner.
///
/// Id `0` is always the empty string. Ids are dense and assigned in insertion
/// order, which is also the on-disk order, so an id never changes once issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringTable {
    strings: IndexSet<String>,
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StringTable {
    /// The id of the empty string.
    pub const EMPTY_ID: u32 = 0;

    pub fn new() -> Self {
        let mut strings = IndexSet::new();
        strings.insert(String::new());
        Self { strings }
    }

    /// Intern `s`, returning the id it already had if it was added before.
    pub fn add_string(&mut self, s: &str) -> u32 {
        if let Some(index) = self.strings.get_index_of(s) {
            return index as u32;
        }
        let (index, _) = self.strings.insert_full(s.to_string());
        index as u32
    }

    pub fn get_string(&self, id: u32) -> Result<&str> {
        self.strings
            .get_index(id as usize)
            .map(String::as_str)
            .ok_or(ImageError::StringOutOfRange(id))
    }

    pub fn get_id(&self, s: &str) -> Option<u32> {
        self.strings.get_index_of(s).map(|index| index as u32)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Always false: the empty string is interned on construction.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterate `(id, string)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(index, s)| (index as u32, s.as_str()))
    }

    /// Size of the serialized table in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.strings.iter().map(|s| 4 + s.len()).sum()
    }

    /// Serialize as length-prefixed UTF-8 strings in id order.
    pub fn to_bytes(&self, order: ImageByteOrder) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.size_in_bytes());
        for s in &self.strings {
            let len = u32::try_from(s.len()).map_err(|_| {
                ImageError::TableOverflow(format!("string of {} bytes", s.len()))
            })?;
            order.write_u32(&mut bytes, len)?;
            bytes.extend_from_slice(s.as_bytes());
        }
        Ok(bytes)
    }

    /// Parse a table written by [`StringTable::to_bytes`].
    pub fn from_bytes(bytes: &[u8], order: ImageByteOrder) -> Result<Self> {
        let mut strings = IndexSet::new();
        let mut cursor = Cursor::new(bytes);
        while (cursor.position() as usize) < bytes.len() {
            let len = order
                .read_u32(&mut cursor)
                .map_err(|_| ImageError::CorruptIndex("truncated string length".to_string()))?;
            let mut buffer = vec![0; len as usize];
            cursor
                .read_exact(&mut buffer)
                .map_err(|_| ImageError::CorruptIndex("truncated string".to_string()))?;
            let s = String::from_utf8(buffer)
                .map_err(|e| ImageError::CorruptIndex(format!("invalid UTF-8 string: {e}")))?;
            // Ids are positional, a repeated string would shift every later id.
            if !strings.insert(s) {
                return Err(ImageError::CorruptIndex(
                    "duplicate string in string table".to_string(),
                ));
            }
        }

        if strings.get_index(0).map(String::as_str) != Some("") {
            return Err(ImageError::CorruptIndex(
                "string table does not start with the empty string".to_string(),
            ));
        }

        Ok(Self { strings })
    }
}

impl ImageByteOrder {
    pub(crate) fn write_u32<W: io::Write>(self, writer: &mut W, value: u32) -> io::Result<()> {
        match self.resolve() {
            ImageByteOrder::Big => writer.write_u32::<byteorder::BE>(value),
            _ => writer.write_u32::<byteorder::LE>(value),
        }
    }

    pub(crate) fn read_u32<R: Read>(self, reader: &mut R) -> io::Result<u32> {
        match self.resolve() {
            ImageByteOrder::Big => reader.read_u32::<byteorder::BE>(),
            _ => reader.read_u32::<byteorder::LE>(),
        }
    }
}
