//! The resource pool: every entry destined for an image, in content order.
//!
//! Paths are unique within a pool. What happens when a second entry arrives
//! for a path is decided by the pool's [`DuplicatePolicy`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, rc::Rc};

use crate::{content::ContentProvider, ImageError, Result};

/// What kind of file an entry is.
///
/// Only [`EntryKind::ClassOrResource`] entries are stored inside the image; the
/// other kinds are kept in the pool so they can be written next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum EntryKind {
    ClassOrResource,
    Config,
    NativeLib,
    Other,
}

/// How the pool treats a second entry with an already present path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Log a warning and keep the first entry.
    #[default]
    Warn,
    /// Fail with [`ImageError::DuplicateResource`].
    Fail,
    /// Keep the position of the first entry but use the content of the new one.
    Replace,
}

/// Result of [`ResourcePool::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Skipped,
    Replaced,
}

/// The bytes of an entry, either stored as-is or already compressed.
#[derive(Debug, Clone)]
pub enum EntryData {
    Plain(Rc<dyn ContentProvider>),
    Compressed {
        content: Rc<dyn ContentProvider>,
        uncompressed_size: u64,
    },
}

impl EntryData {
    /// The provider of the bytes that go into the image.
    pub fn content(&self) -> &Rc<dyn ContentProvider> {
        match self {
            EntryData::Plain(content) => content,
            EntryData::Compressed { content, .. } => content,
        }
    }
}

/// A named, byte-bearing entry destined for the image.
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    module: String,
    path: String,
    kind: EntryKind,
    data: EntryData,
}

impl ResourceEntry {
    /// Create an entry owned by `module`, which must not be empty.
    pub fn new(
        module: impl Into<String>,
        path: impl Into<String>,
        kind: EntryKind,
        data: EntryData,
    ) -> Result<Self> {
        let module = module.into();
        let path = path.into();
        if module.is_empty() {
            return Err(ImageError::malformed(path, "entry has no owning module"));
        }

        Ok(Self {
            module,
            path,
            kind,
            data,
        })
    }

    /// Shorthand for an uncompressed class or resource entry.
    pub fn resource(
        module: impl Into<String>,
        path: impl Into<String>,
        content: Rc<dyn ContentProvider>,
    ) -> Result<Self> {
        Self::new(
            module,
            path,
            EntryKind::ClassOrResource,
            EntryData::Plain(content),
        )
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn data(&self) -> &EntryData {
        &self.data
    }

    pub fn content(&self) -> &Rc<dyn ContentProvider> {
        self.data.content()
    }

    /// Uncompressed size of the entry.
    pub fn length(&self) -> u64 {
        match &self.data {
            EntryData::Plain(content) => content.size(),
            EntryData::Compressed {
                uncompressed_size, ..
            } => *uncompressed_size,
        }
    }

    /// Compressed size of the entry, `0` when it is stored uncompressed.
    pub fn compressed_length(&self) -> u64 {
        match &self.data {
            EntryData::Plain(_) => 0,
            EntryData::Compressed { content, .. } => content.size(),
        }
    }

    /// Number of bytes the entry occupies in the content region.
    pub fn on_disk_size(&self) -> u64 {
        self.content().size()
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.data, EntryData::Compressed { .. })
    }

    /// Replace the entry's data, keeping its identity.
    pub fn with_data(mut self, data: EntryData) -> Self {
        self.data = data;
        self
    }
}

/// Ordered, path-unique collection of entries.
///
/// Iteration order is insertion order and is the order in which content is laid
/// out in the image.
#[derive(Debug, Clone, Default)]
pub struct ResourcePool {
    entries: Vec<ResourceEntry>,
    index: HashMap<String, usize>,
    policy: DuplicatePolicy,
}

impl ResourcePool {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            policy,
        }
    }

    /// An empty pool with the same duplicate policy.
    pub fn empty_like(&self) -> Self {
        Self::new(self.policy)
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Add an entry, resolving path collisions with the pool's [`DuplicatePolicy`].
    pub fn add(&mut self, entry: ResourceEntry) -> Result<AddOutcome> {
        let Some(&existing) = self.index.get(entry.path()) else {
            self.index.insert(entry.path.clone(), self.entries.len());
            self.entries.push(entry);
            return Ok(AddOutcome::Added);
        };

        match self.policy {
            DuplicatePolicy::Warn => {
                tracing::warn!("duplicate resource \"{}\", skipping", entry.path());
                Ok(AddOutcome::Skipped)
            }
            DuplicatePolicy::Fail => Err(ImageError::DuplicateResource(entry.path)),
            DuplicatePolicy::Replace => {
                tracing::debug!("duplicate resource \"{}\", replacing", entry.path());
                self.entries[existing] = entry;
                Ok(AddOutcome::Replaced)
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&ResourceEntry> {
        self.index.get(path).map(|&index| &self.entries[index])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Remove and return the entry at `path`, preserving the order of the rest.
    pub fn remove(&mut self, path: &str) -> Option<ResourceEntry> {
        let index = self.index.remove(path)?;
        let entry = self.entries.remove(index);
        self.reindex();
        Some(entry)
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&ResourceEntry) -> bool) {
        self.entries.retain(keep);
        self.reindex();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &ResourceEntry> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<ResourceEntry> {
        self.entries
    }

    /// Distinct owning modules, in the order they were first seen.
    pub fn modules(&self) -> Vec<&str> {
        self.by_module().into_keys().collect()
    }

    /// Entries grouped by owning module, modules in first-seen order.
    pub fn by_module(&self) -> IndexMap<&str, Vec<&ResourceEntry>> {
        let mut modules: IndexMap<&str, Vec<&ResourceEntry>> = IndexMap::new();
        for entry in &self.entries {
            modules.entry(entry.module()).or_default().push(entry);
        }
        modules
    }

    pub fn entries_for_module<'a>(
        &'a self,
        module: &'a str,
    ) -> impl Iterator<Item = &'a ResourceEntry> + 'a {
        self.entries.iter().filter(move |e| e.module() == module)
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.path.clone(), index))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::bytes_content;

    fn entry(module: &str, path: &str, bytes: &[u8]) -> ResourceEntry {
        ResourceEntry::resource(module, path, bytes_content(bytes.to_vec())).unwrap()
    }

    #[test]
    fn test_insertion_order() {
        let mut pool = ResourcePool::default();
        pool.add(entry("mod", "/mod/b/Z.txt", b"z")).unwrap();
        pool.add(entry("mod", "/mod/a/X.class", b"x")).unwrap();
        pool.add(entry("other", "/other/Y.class", b"y")).unwrap();

        let paths: Vec<_> = pool.entries().map(ResourceEntry::path).collect();
        assert_eq!(paths, vec!["/mod/b/Z.txt", "/mod/a/X.class", "/other/Y.class"]);
        assert_eq!(pool.modules(), vec!["mod", "other"]);
        assert_eq!(pool.entries_for_module("mod").count(), 2);
    }

    #[test]
    fn test_duplicate_warn_keeps_first() {
        let mut pool = ResourcePool::new(DuplicatePolicy::Warn);
        assert_eq!(pool.add(entry("m", "/m/p/A.class", b"first")).unwrap(), AddOutcome::Added);
        assert_eq!(pool.add(entry("m", "/m/p/A.class", b"second")).unwrap(), AddOutcome::Skipped);

        assert_eq!(pool.len(), 1);
        let kept = pool.get("/m/p/A.class").unwrap();
        assert_eq!(kept.content().read_all().unwrap(), b"first");
    }

    #[test]
    fn test_duplicate_fail() {
        let mut pool = ResourcePool::new(DuplicatePolicy::Fail);
        pool.add(entry("m", "/m/p/A.class", b"first")).unwrap();
        let result = pool.add(entry("m", "/m/p/A.class", b"second"));
        assert!(matches!(result, Err(ImageError::DuplicateResource(path)) if path == "/m/p/A.class"));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_duplicate_replace_keeps_position() {
        let mut pool = ResourcePool::new(DuplicatePolicy::Replace);
        pool.add(entry("m", "/m/p/A.class", b"first")).unwrap();
        pool.add(entry("m", "/m/p/B.class", b"b")).unwrap();
        assert_eq!(pool.add(entry("m", "/m/p/A.class", b"second")).unwrap(), AddOutcome::Replaced);

        let entries: Vec<_> = pool.entries().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path(), "/m/p/A.class");
        assert_eq!(entries[0].content().read_all().unwrap(), b"second");
    }

    #[test]
    fn test_remove_and_retain_reindex() {
        let mut pool = ResourcePool::default();
        for path in ["/m/A.class", "/m/B.class", "/m/C.class"] {
            pool.add(entry("m", path, b"")).unwrap();
        }

        assert!(pool.remove("/m/A.class").is_some());
        assert!(pool.remove("/m/A.class").is_none());
        assert_eq!(pool.get("/m/C.class").unwrap().path(), "/m/C.class");

        pool.retain(|e| e.path() != "/m/B.class");
        assert_eq!(pool.len(), 1);
        assert!(pool.contains("/m/C.class"));
        assert!(!pool.contains("/m/B.class"));
    }

    #[test]
    fn test_empty_module_fails_fast() {
        let result = ResourceEntry::resource("", "/m/A.class", bytes_content(vec![]));
        assert!(matches!(result, Err(ImageError::MalformedPath { .. })));
        assert!(ResourceEntry::resource("m", "/module-info.class", bytes_content(vec![])).is_ok());
    }

    #[test]
    fn test_sizes() {
        let plain = entry("m", "/m/A.class", b"12345");
        assert_eq!((plain.length(), plain.compressed_length(), plain.on_disk_size()), (5, 0, 5));

        let compressed = plain.with_data(EntryData::Compressed {
            content: bytes_content(vec![1, 2]),
            uncompressed_size: 5,
        });
        assert!(compressed.is_compressed());
        assert_eq!(
            (compressed.length(), compressed.compressed_length(), compressed.on_disk_size()),
            (5, 2, 2)
        );
    }
}
