//! Index construction: content offsets, name split, redirect table and the
//! synthetic directory tree.

use itertools::Itertools;
use std::{collections::HashMap, io};
use xxhash_rust::xxh3::Xxh3;

use crate::{
    header::{ImageByteOrder, ImageHeader},
    location::{ImageLocation, LocationAttributes},
    options::ImageOptions,
    path::ResourceName,
    pool::{EntryKind, ResourceEntry, ResourcePool},
    redirect::RedirectTable,
    strings::StringTable,
    tree::ImageTree,
    ImageError, Result,
};

/// Offset table value of a slot that holds no location.
pub const EMPTY_SLOT: u32 = u32::MAX;

/// A pool entry whose bytes go into the content region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSlot {
    /// Position of the entry in the pool's iteration order.
    pub entry: usize,
    pub path: String,
    pub offset: u64,
    pub size: u64,
}

/// Everything the writer needs besides the content itself.
#[derive(Debug, Clone)]
pub struct ImageIndex {
    header: ImageHeader,
    byte_order: ImageByteOrder,
    strings: StringTable,
    redirect: RedirectTable,
    offsets: Vec<u32>,
    attributes: Vec<u8>,
    locations: Vec<ImageLocation>,
    content_slots: Vec<ContentSlot>,
    resource_content_size: u64,
    directory_content: Vec<u8>,
}

impl ImageIndex {
    pub fn header(&self) -> &ImageHeader {
        &self.header
    }

    /// The resolved byte order of the image.
    pub fn byte_order(&self) -> ImageByteOrder {
        self.byte_order
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn redirect(&self) -> &RedirectTable {
        &self.redirect
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    pub fn attributes(&self) -> &[u8] {
        &self.attributes
    }

    /// Real locations followed by the synthetic directory locations.
    pub fn locations(&self) -> &[ImageLocation] {
        &self.locations
    }

    /// Real resource locations only.
    pub fn resources(&self) -> &[ImageLocation] {
        &self.locations[..self.header.resource_count as usize]
    }

    pub fn resource_count(&self) -> u32 {
        self.header.resource_count
    }

    /// Entries whose bytes are written, in content order.
    pub fn content_slots(&self) -> &[ContentSlot] {
        &self.content_slots
    }

    /// Size of the real resource content, excluding directory listings.
    pub fn resource_content_size(&self) -> u64 {
        self.resource_content_size
    }

    pub fn directory_content(&self) -> &[u8] {
        &self.directory_content
    }

    /// Size of the whole content region.
    pub fn content_size(&self) -> u64 {
        self.resource_content_size + self.directory_content.len() as u64
    }

    pub fn index_size(&self) -> u64 {
        self.header.index_size()
    }
}

/// Builds an [`ImageIndex`] from a [`ResourcePool`].
#[derive(Debug, Clone)]
pub struct ImageIndexBuilder {
    options: ImageOptions,
}

/// Identity of stored content for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ContentKey {
    digest: u128,
    on_disk_size: u64,
    uncompressed_size: u64,
    compressed: bool,
}

impl ImageIndexBuilder {
    pub fn new(options: &ImageOptions) -> Self {
        Self { options: *options }
    }

    pub fn build(&self, pool: &ResourcePool) -> Result<ImageIndex> {
        let byte_order = self.options.byte_order.resolve();
        let mut strings = StringTable::new();
        let mut locations = Vec::new();
        let mut content_slots = Vec::new();
        let mut seen_content: HashMap<ContentKey, u64> = HashMap::new();
        let mut offset = 0u64;

        for (position, entry) in pool.entries().enumerate() {
            if entry.kind() != EntryKind::ClassOrResource {
                tracing::debug!("not storing {:?} entry {} in image", entry.kind(), entry.path());
                continue;
            }

            let name = ResourceName::parse_resource(entry.path())?;
            let size = entry.on_disk_size();

            let content_offset = match self.content_key(entry)? {
                Some(key) if seen_content.contains_key(&key) => {
                    tracing::debug!("deduplicated content of {}", entry.path());
                    seen_content[&key]
                }
                key => {
                    if let Some(key) = key {
                        seen_content.insert(key, offset);
                    }
                    content_slots.push(ContentSlot {
                        entry: position,
                        path: entry.path().to_string(),
                        offset,
                        size,
                    });
                    let content_offset = offset;
                    offset += size;
                    content_offset
                }
            };

            locations.push(ImageLocation {
                name: entry.path().to_string(),
                attributes: LocationAttributes {
                    content_offset,
                    compressed_size: entry.compressed_length(),
                    uncompressed_size: entry.length(),
                    ..name_attributes(&mut strings, &name)
                },
            });
        }

        let resource_count = locations.len();
        let resource_content_size = offset;

        let tree = ImageTree::build(locations.iter().map(|l| l.name.as_str()))?;
        let mut directory_content = Vec::new();
        for (directory, bytes) in tree.encode(&mut strings, byte_order)? {
            let attributes = LocationAttributes {
                content_offset: resource_content_size + directory_content.len() as u64,
                uncompressed_size: bytes.len() as u64,
                ..name_attributes(&mut strings, &ResourceName::parse(&directory)?)
            };
            directory_content.extend_from_slice(&bytes);
            locations.push(ImageLocation {
                name: directory,
                attributes,
            });
        }

        let names = locations.iter().map(|l| l.name.as_str()).collect_vec();
        let layout = RedirectTable::build(&names)?;
        let table_length = u32::try_from(layout.table.len())
            .map_err(|_| ImageError::TableOverflow("redirect table too long".to_string()))?;

        let mut attributes = Vec::new();
        let mut offsets = vec![EMPTY_SLOT; layout.table.len()];
        for (location, &slot) in locations.iter().zip(&layout.slots) {
            offsets[slot] = u32::try_from(attributes.len()).map_err(|_| {
                ImageError::TableOverflow("location attributes exceed 4 GiB".to_string())
            })?;
            location.attributes.encode(&mut attributes);
        }

        let attributes_size = u32::try_from(attributes.len()).map_err(|_| {
            ImageError::TableOverflow("location attributes exceed 4 GiB".to_string())
        })?;
        let strings_size = u32::try_from(strings.size_in_bytes())
            .map_err(|_| ImageError::TableOverflow("string table exceeds 4 GiB".to_string()))?;
        let header = ImageHeader::new(
            resource_count as u32,
            table_length,
            attributes_size,
            strings_size,
        );

        tracing::info!(
            "indexed {} resources and {} directories into {} slots",
            resource_count,
            tree.len(),
            table_length
        );

        Ok(ImageIndex {
            header,
            byte_order,
            strings,
            redirect: layout.table,
            offsets,
            attributes,
            locations,
            content_slots,
            resource_content_size,
            directory_content,
        })
    }

    fn content_key(&self, entry: &ResourceEntry) -> Result<Option<ContentKey>> {
        if !self.options.deduplicate_content {
            return Ok(None);
        }

        let mut hasher = HashWriter(Xxh3::new());
        entry.content().read_into(&mut hasher)?;
        Ok(Some(ContentKey {
            digest: hasher.0.digest128(),
            on_disk_size: entry.on_disk_size(),
            uncompressed_size: entry.length(),
            compressed: entry.is_compressed(),
        }))
    }
}

fn name_attributes(strings: &mut StringTable, name: &ResourceName) -> LocationAttributes {
    LocationAttributes {
        module: strings.add_string(name.module),
        parent: strings.add_string(name.parent),
        base: strings.add_string(name.base),
        extension: strings.add_string(name.extension),
        ..Default::default()
    }
}

struct HashWriter(Xxh3);

impl io::Write for HashWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        content::bytes_content,
        pool::{DuplicatePolicy, EntryData},
    };

    fn pool(entries: &[(&str, &str, &str)]) -> ResourcePool {
        let mut pool = ResourcePool::new(DuplicatePolicy::Fail);
        for &(module, path, text) in entries {
            let content = bytes_content(text.as_bytes().to_vec());
            pool.add(ResourceEntry::resource(module, path, content).unwrap())
                .unwrap();
        }
        pool
    }

    fn build(pool: &ResourcePool, options: ImageOptions) -> ImageIndex {
        ImageIndexBuilder::new(&options).build(pool).unwrap()
    }

    #[test]
    fn test_offsets_follow_pool_order() {
        let pool = pool(&[
            ("mod", "/mod/a/X.class", "xx"),
            ("mod", "/mod/a/Y.class", "yyy"),
            ("mod", "/mod/b/Z.txt", "z"),
        ]);
        let index = build(&pool, ImageOptions::default());

        let resources = index.resources();
        assert_eq!(resources.len(), 3);
        assert_eq!(
            resources.iter().map(|l| l.content_offset()).collect_vec(),
            vec![0, 2, 5]
        );
        assert_eq!(index.resource_content_size(), 6);
        assert_eq!(index.resource_count(), 3);
        assert_eq!(index.locations().len(), 3 + 7);
        assert!(index.header().table_length as usize >= index.locations().len());
    }

    #[test]
    fn test_every_location_has_a_slot() {
        let pool = pool(&[
            ("mod", "/mod/a/X.class", "xx"),
            ("other", "/other/c/W.class", "w"),
        ]);
        let index = build(&pool, ImageOptions::default());

        for location in index.locations() {
            let slot = index.redirect().lookup(&location.name).unwrap();
            let offset = index.offsets()[slot];
            assert_ne!(offset, EMPTY_SLOT);
            let attributes = LocationAttributes::decode(index.attributes(), offset as usize).unwrap();
            assert_eq!(attributes.full_name(index.strings()).unwrap(), location.name);
        }
    }

    #[test]
    fn test_directories_after_resource_content() {
        let pool = pool(&[("mod", "/mod/a/X.class", "1234")]);
        let index = build(&pool, ImageOptions::default());

        let directories = &index.locations()[1..];
        assert_eq!(directories[0].name, "/modules");
        assert_eq!(directories[0].content_offset(), 4);
        assert_eq!(
            index.content_size(),
            4 + index.directory_content().len() as u64
        );
    }

    #[test]
    fn test_empty_pool() {
        let index = build(&ResourcePool::default(), ImageOptions::default());
        assert_eq!(index.header().table_length, 0);
        assert_eq!(index.resource_count(), 0);
        assert!(index.locations().is_empty());
        assert_eq!(index.content_size(), 0);
        assert_eq!(index.index_size(), ImageHeader::SIZE as u64 + 4);
    }

    #[test]
    fn test_non_resources_are_not_indexed() {
        let mut pool = pool(&[("mod", "/mod/a/X.class", "x")]);
        pool.add(
            ResourceEntry::new(
                "mod",
                "/mod/conf/net.properties",
                EntryKind::Config,
                EntryData::Plain(bytes_content(b"k=v".to_vec())),
            )
            .unwrap(),
        )
        .unwrap();

        let index = build(&pool, ImageOptions::default());
        assert_eq!(index.resource_count(), 1);
        assert_eq!(index.content_slots().len(), 1);
    }

    #[test]
    fn test_reserved_module_rejected() {
        let pool = pool(&[("modules", "/modules/a/X.class", "x")]);
        let result = ImageIndexBuilder::new(&ImageOptions::default()).build(&pool);
        assert!(matches!(result, Err(ImageError::MalformedPath { .. })));
    }

    #[test]
    fn test_deduplicate_content() {
        let pool = pool(&[
            ("mod", "/mod/a/X.class", "same"),
            ("mod", "/mod/a/Y.class", "other"),
            ("mod", "/mod/b/X.class", "same"),
        ]);

        let plain = build(&pool, ImageOptions::default());
        assert_eq!(plain.resource_content_size(), 13);

        let deduplicated = build(&pool, ImageOptions::default().with_deduplicate_content(true));
        assert_eq!(deduplicated.resource_content_size(), 9);
        assert_eq!(deduplicated.content_slots().len(), 2);
        let resources = deduplicated.resources();
        assert_eq!(resources[0].content_offset(), resources[2].content_offset());
    }

    #[test]
    fn test_build_is_deterministic() {
        let pool = pool(&[
            ("b", "/b/q/Q.class", "q"),
            ("a", "/a/p/P.class", "p"),
        ]);
        let first = build(&pool, ImageOptions::default());
        let second = build(&pool, ImageOptions::default());
        assert_eq!(first.offsets(), second.offsets());
        assert_eq!(first.attributes(), second.attributes());
        assert_eq!(first.redirect(), second.redirect());
        assert_eq!(first.directory_content(), second.directory_content());
    }
}
