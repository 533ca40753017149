//! Modular runtime image container.
//!
//! An image packs the class and resource files of a set of modules into one
//! file with a compact index: a string table, a perfect-hash redirect table, an
//! offset table, per-location attribute records and a synthetic directory tree
//! (`/modules/...`, `/packages/...`). Any resource can be located by path with at
//! most two hash evaluations and without reading the content region.
//!
//! Building goes `Archive` → [`ResourcePool`] → [`PluginStack`] →
//! [`ImageIndexBuilder`] → [`ImageWriter`], driven by [`ImageFileCreator`].
//! Reading goes through [`ModImage`].

use std::io::{Read, Seek};

pub mod archive;
pub mod config;
pub mod content;
mod creator;
mod decoder;
mod error;
mod extractor;
pub mod header;
pub mod index;
pub mod location;
mod options;
pub mod path;
pub mod plugin;
pub mod pool;
mod read;
pub mod redirect;
pub mod strings;
pub mod tree;
mod writer;


pub use config::ImageConfig;
pub use content::{bytes_content, BytesContent, ContentProvider, FileContent};
pub use creator::ImageFileCreator;
pub use decoder::ModImageDecoder;
pub use error::{ImageError, Result};
pub use extractor::ImageExtractor;
pub use header::{ImageByteOrder, ImageHeader};
pub use index::{ImageIndex, ImageIndexBuilder};
pub use location::ImageLocation;
pub use options::ImageOptions;
pub use path::split_path;
pub use plugin::{PluginStack, ResourcePlugin};
pub use pool::{AddOutcome, DuplicatePolicy, EntryData, EntryKind, ResourceEntry, ResourcePool};
pub use tree::{DirectoryEntry, DirectoryEntryKind};
pub use writer::{ImageSummary, ImageWriter};

use crate::{
    index::EMPTY_SLOT,
    location::LocationAttributes,
    path::{MODULES_ROOT, PACKAGES_ROOT},
    redirect::RedirectTable,
    strings::StringTable,
};

/// A mounted image.
///
/// Only the index region is held in memory; resource content is read from
/// `source` on demand.
#[derive(Debug)]
pub struct ModImage<TSource: Read + Seek> {
    header: ImageHeader,
    byte_order: ImageByteOrder,
    redirect: RedirectTable,
    offsets: Vec<u32>,
    attributes: Vec<u8>,
    strings: StringTable,

    /// The original byte source.
    source: TSource,
}

impl<TSource: Read + Seek> ModImage<TSource> {
    pub fn header(&self) -> &ImageHeader {
        &self.header
    }

    /// The byte order detected from the magic.
    pub fn byte_order(&self) -> ImageByteOrder {
        self.byte_order
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// Create a decoder for this image
    pub fn decoder(&'_ mut self) -> ModImageDecoder<'_, TSource> {
        ModImageDecoder {
            source: &mut self.source,
            content_start: self.header.index_size(),
        }
    }

    /// Find any location, real or synthetic, by its full name.
    ///
    /// Unknown names resolve to `None`.
    pub fn find_location(&self, name: &str) -> Result<Option<ImageLocation>> {
        let Some(slot) = self.redirect.lookup(name) else {
            return Ok(None);
        };
        let offset = match self.offsets.get(slot) {
            Some(&offset) if offset != EMPTY_SLOT => offset,
            _ => return Ok(None),
        };

        let attributes = LocationAttributes::decode(&self.attributes, offset as usize)?;
        // The redirect table only yields a candidate; confirm the name.
        if attributes.full_name(&self.strings)? != name {
            return Ok(None);
        }

        Ok(Some(ImageLocation {
            name: name.to_string(),
            attributes,
        }))
    }

    /// Find a real resource by module and name inside the module.
    ///
    /// An empty module looks up module-less paths such as `/module-info.class`.
    pub fn find_resource(&self, module: &str, name: &str) -> Result<Option<ImageLocation>> {
        let path = match module {
            "" => format!("/{name}"),
            module => format!("/{module}/{name}"),
        };
        self.find_resource_path(&path)
    }

    fn find_resource_path(&self, path: &str) -> Result<Option<ImageLocation>> {
        if is_directory_name(path) {
            return Ok(None);
        }
        self.find_location(path)
    }

    fn require_resource(&self, path: &str) -> Result<ImageLocation> {
        self.find_resource_path(path)?
            .ok_or_else(|| ImageError::ResourceNotFound(path.to_string()))
    }

    pub fn has_resource(&self, path: &str) -> Result<bool> {
        Ok(self.find_resource_path(path)?.is_some())
    }

    /// Load the uncompressed bytes of a resource.
    pub fn load_resource(&mut self, path: &str) -> Result<Box<[u8]>> {
        let location = self.require_resource(path)?;
        self.decoder().load_decompressed(&location)
    }

    /// Load the bytes of a resource as stored, without decompressing them.
    pub fn load_resource_raw(&mut self, path: &str) -> Result<Box<[u8]>> {
        let location = self.require_resource(path)?;
        self.decoder().load_raw(&location)
    }

    /// Read at most `max` uncompressed bytes from the start of a resource.
    pub fn read_resource_prefix(&mut self, path: &str, max: u64) -> Result<Box<[u8]>> {
        let location = self.require_resource(path)?;
        self.decoder().read_prefix(&location, max)
    }

    /// Locations of all real resources, sorted by name.
    pub fn resources(&self) -> Result<Vec<ImageLocation>> {
        let mut resources = Vec::with_capacity(self.header.resource_count as usize);
        for &offset in self.offsets.iter().filter(|&&offset| offset != EMPTY_SLOT) {
            let attributes = LocationAttributes::decode(&self.attributes, offset as usize)?;
            let name = attributes.full_name(&self.strings)?;
            if !is_directory_name(&name) {
                resources.push(ImageLocation { name, attributes });
            }
        }
        resources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(resources)
    }

    /// Names of all real resources, sorted. Never includes directory locations.
    pub fn entry_names(&self) -> Result<Vec<String>> {
        Ok(self.resources()?.into_iter().map(|l| l.name).collect())
    }

    /// Children of a synthetic directory such as `/modules/java.base/java`.
    ///
    /// Returns `None` when `path` is not a directory of this image.
    pub fn list_directory(&mut self, path: &str) -> Result<Option<Vec<DirectoryEntry>>> {
        if !is_directory_name(path) {
            return Ok(None);
        }
        let Some(location) = self.find_location(path)? else {
            return Ok(None);
        };

        let bytes = self.decoder().load_decompressed(&location)?;
        tree::decode_directory(&bytes, self.byte_order, &self.strings).map(Some)
    }

    /// Names of all modules in the image, sorted.
    pub fn modules(&mut self) -> Result<Vec<String>> {
        let root = format!("/{MODULES_ROOT}");
        Ok(self
            .list_directory(&root)?
            .unwrap_or_default()
            .into_iter()
            .map(|entry| entry.name)
            .collect())
    }

    /// Dotted names of the packages of `module`, sorted.
    ///
    /// A package is any directory of the module holding at least one resource.
    pub fn packages(&mut self, module: &str) -> Result<Vec<String>> {
        let root = format!("/{MODULES_ROOT}/{module}");
        let mut packages = Vec::new();
        // (directory location, dotted package name)
        let mut pending = vec![(root.clone(), String::new())];
        while let Some((directory, package)) = pending.pop() {
            let Some(children) = self.list_directory(&directory)? else {
                continue;
            };

            let mut has_resource = false;
            for child in children {
                if child.kind == DirectoryEntryKind::Resource {
                    has_resource = true;
                    continue;
                }
                let child_package = match package.as_str() {
                    "" => child.name.clone(),
                    package => format!("{package}.{}", child.name),
                };
                pending.push((format!("{directory}/{}", child.name), child_package));
            }
            if has_resource && directory != root {
                packages.push(package);
            }
        }

        packages.sort();
        packages.dedup();
        Ok(packages)
    }

    /// The module that contains `package`.
    ///
    /// When several modules share the package the first in name order is
    /// returned.
    pub fn package_to_module(&mut self, package: &str) -> Result<Option<String>> {
        let directory = format!("/{PACKAGES_ROOT}/{package}");
        Ok(self
            .list_directory(&directory)?
            .and_then(|modules| modules.into_iter().next())
            .map(|entry| entry.name))
    }
}

/// Whether `name` is one of the synthetic directory locations.
pub(crate) fn is_directory_name(name: &str) -> bool {
    [MODULES_ROOT, PACKAGES_ROOT].iter().any(|root| {
        name.strip_prefix('/')
            .and_then(|rest| rest.strip_prefix(root))
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}
