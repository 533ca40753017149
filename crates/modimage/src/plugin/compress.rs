use glob::Pattern;
use std::io::{BufWriter, Write};

use super::{compile_patterns, ResourcePlugin};
use crate::{
    content::bytes_content,
    pool::{EntryData, EntryKind, ResourceEntry, ResourcePool},
    Result,
};

/// Compresses class and resource entries with zstd.
///
/// Entries that do not get smaller are kept as they are.
#[derive(Debug, Clone)]
pub struct CompressPlugin {
    level: i32,
    include: Vec<Pattern>,
}

impl CompressPlugin {
    pub const DEFAULT_LEVEL: i32 = 3;

    /// Compress entries matching `include`, or every entry when it is empty.
    pub fn new(level: i32, include: &[String]) -> Result<Self> {
        Ok(Self {
            level,
            include: compile_patterns(include)?,
        })
    }

    fn applies_to(&self, entry: &ResourceEntry) -> bool {
        entry.kind() == EntryKind::ClassOrResource
            && !entry.is_compressed()
            && (self.include.is_empty() || self.include.iter().any(|p| p.matches(entry.path())))
    }

    fn compress(&self, entry: ResourceEntry) -> Result<ResourceEntry> {
        let data = entry.content().read_all()?;

        let mut compressed = Vec::new();
        let mut encoder = zstd::Encoder::new(BufWriter::new(&mut compressed), self.level)?;
        encoder.write_all(&data)?;
        encoder.finish()?.flush()?;

        if compressed.len() >= data.len() {
            tracing::trace!("{} does not compress, storing as is", entry.path());
            return Ok(entry);
        }

        Ok(entry.with_data(EntryData::Compressed {
            content: bytes_content(compressed),
            uncompressed_size: data.len() as u64,
        }))
    }
}

impl Default for CompressPlugin {
    fn default() -> Self {
        Self {
            level: Self::DEFAULT_LEVEL,
            include: Vec::new(),
        }
    }
}

impl ResourcePlugin for CompressPlugin {
    fn name(&self) -> &str {
        "compress"
    }

    fn transform(&self, pool: ResourcePool) -> Result<ResourcePool> {
        let mut compressed = pool.empty_like();
        for entry in pool.into_entries() {
            let entry = if self.applies_to(&entry) {
                self.compress(entry)?
            } else {
                entry
            };
            compressed.add(entry)?;
        }
        Ok(compressed)
    }
}
