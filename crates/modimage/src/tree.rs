//! Synthetic directory locations derived from the real resource paths.
//!
//! Two trees are emitted after the real resources: `/modules/<module>/...`
//! mirrors the `/`-separated directories of every module, and `/packages/<package>`
//! lists the modules that contain a package. Each directory is stored as a
//! location whose content is a child listing.

use byteorder::ReadBytesExt;
use std::{collections::BTreeMap, io::Cursor};

use crate::{
    header::ImageByteOrder,
    path::{ResourceName, MODULES_ROOT, PACKAGES_ROOT},
    strings::StringTable,
    ImageError, Result,
};

/// Kind of a child in a directory listing.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirectoryEntryKind {
    Resource = 0,
    Directory = 1,
    Module = 2,
}

impl TryFrom<u8> for DirectoryEntryKind {
    type Error = ImageError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(DirectoryEntryKind::Resource),
            1 => Ok(DirectoryEntryKind::Directory),
            2 => Ok(DirectoryEntryKind::Module),
            _ => Err(ImageError::CorruptIndex(format!(
                "unknown directory entry kind {value}"
            ))),
        }
    }
}

/// One child of a synthetic directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub kind: DirectoryEntryKind,
    pub name: String,
}

type Children = BTreeMap<String, DirectoryEntryKind>;

/// All synthetic directories, keyed by their full location name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageTree {
    directories: BTreeMap<String, Children>,
}

impl ImageTree {
    /// Build the tree from real resource paths.
    ///
    /// Paths without a module segment (`/module-info.class`) belong to no module
    /// directory and are left out.
    pub fn build<'a>(paths: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut tree = ImageTree::default();
        for path in paths {
            let resource = ResourceName::parse(path)?;
            if resource.module.is_empty() {
                continue;
            }
            let module = resource.module;
            let name = path.rsplit('/').next().unwrap_or_default();

            let modules_root = format!("/{MODULES_ROOT}");
            tree.add_child(&modules_root, module, DirectoryEntryKind::Module);

            let mut directory = format!("{modules_root}/{module}");
            tree.directories.entry(directory.clone()).or_default();
            for segment in resource.parent.split('/').filter(|s| !s.is_empty()) {
                tree.add_child(&directory, segment, DirectoryEntryKind::Directory);
                directory.push('/');
                directory.push_str(segment);
            }
            tree.add_child(&directory, name, DirectoryEntryKind::Resource);

            if !resource.parent.is_empty() {
                let package = resource.parent.replace('/', ".");
                let packages_root = format!("/{PACKAGES_ROOT}");
                tree.add_child(&packages_root, &package, DirectoryEntryKind::Directory);
                tree.add_child(
                    &format!("{packages_root}/{package}"),
                    module,
                    DirectoryEntryKind::Module,
                );
            }
        }

        Ok(tree)
    }

    fn add_child(&mut self, directory: &str, name: &str, kind: DirectoryEntryKind) {
        let children = self.directories.entry(directory.to_string()).or_default();
        // A name used as both a file and a directory is listed as the directory.
        let current = children.entry(name.to_string()).or_insert(kind);
        *current = (*current).max(kind);
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.directories.len()
    }

    /// Directory names in sorted order.
    pub fn directory_names(&self) -> impl Iterator<Item = &str> {
        self.directories.keys().map(String::as_str)
    }

    pub fn children(&self, directory: &str) -> Option<Vec<DirectoryEntry>> {
        self.directories.get(directory).map(|children| {
            children
                .iter()
                .map(|(name, &kind)| DirectoryEntry {
                    kind,
                    name: name.clone(),
                })
                .collect()
        })
    }

    /// Encode every directory's listing, interning child names into `strings`.
    ///
    /// Returns `(directory name, content bytes)` pairs in directory name order.
    pub fn encode(
        &self,
        strings: &mut StringTable,
        order: ImageByteOrder,
    ) -> Result<Vec<(String, Vec<u8>)>> {
        self.directories
            .iter()
            .map(|(directory, children)| -> Result<(String, Vec<u8>)> {
                let mut bytes = Vec::with_capacity(4 + children.len() * 5);
                let count = u32::try_from(children.len()).map_err(|_| {
                    ImageError::TableOverflow(format!("directory {directory} has too many entries"))
                })?;
                order.write_u32(&mut bytes, count)?;
                for (name, &kind) in children {
                    bytes.push(kind as u8);
                    order.write_u32(&mut bytes, strings.add_string(name))?;
                }
                Ok((directory.clone(), bytes))
            })
            .collect()
    }
}

/// Decode a directory listing written by [`ImageTree::encode`].
pub fn decode_directory(
    bytes: &[u8],
    order: ImageByteOrder,
    strings: &StringTable,
) -> Result<Vec<DirectoryEntry>> {
    let truncated = |_| ImageError::CorruptIndex("truncated directory listing".to_string());

    let mut cursor = Cursor::new(bytes);
    let count = order.read_u32(&mut cursor).map_err(truncated)?;
    if count as usize > bytes.len() / 5 {
        return Err(ImageError::CorruptIndex(format!(
            "directory listing claims {count} entries in {} bytes",
            bytes.len()
        )));
    }

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let kind = DirectoryEntryKind::try_from(cursor.read_u8().map_err(truncated)?)?;
        let name = strings.get_string(order.read_u32(&mut cursor).map_err(truncated)?)?;
        entries.push(DirectoryEntry {
            kind,
            name: name.to_string(),
        });
    }
    Ok(entries)
}
