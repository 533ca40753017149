//! Module sources: exploded directories, zip/jmod files and in-memory archives.

use std::{fmt::Debug, rc::Rc};

use crate::{content::ContentProvider, pool::EntryKind, Result};

mod dir;
mod memory;
mod zip_file;

pub use dir::DirArchive;
pub use memory::MemoryArchive;
pub use zip_file::ZipArchive;

/// The files of one module.
pub trait Archive: Debug {
    fn module_name(&self) -> &str;

    /// Enumerate the archive's entries. Content is read lazily through each
    /// entry's provider, so the archive must stay open until the image is written.
    fn entries(&mut self) -> Result<Vec<ArchiveEntry>>;

    /// Release any handle held by the archive. Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;
}

/// A file inside an archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Name inside the module, e.g. `java/lang/String.class` or `net.properties`.
    pub name: String,
    /// Path inside the archive including the section directory, e.g.
    /// `conf/net.properties`.
    pub path: String,
    pub kind: EntryKind,
    pub content: Rc<dyn ContentProvider>,
}

/// Classify an archive-relative path by its section directory, returning the
/// entry kind and the name inside the module.
///
/// `classes/` is stripped, `conf/` holds config files, `lib/` and `native/`
/// hold native libraries and `bin/`, `legal/`, `include/` and `man/` hold other
/// files. Anything else is a class or resource.
pub fn classify(path: &str) -> (EntryKind, &str) {
    let Some((section, rest)) = path.split_once('/') else {
        return (EntryKind::ClassOrResource, path);
    };

    match section {
        "classes" => (EntryKind::ClassOrResource, rest),
        "conf" => (EntryKind::Config, rest),
        "lib" | "native" => (EntryKind::NativeLib, rest),
        "bin" | "legal" | "include" | "man" => (EntryKind::Other, rest),
        _ => (EntryKind::ClassOrResource, path),
    }
}

/// Owns a set of archives and closes every one of them when dropped.
#[derive(Debug, Default)]
pub struct ArchiveSet {
    archives: Vec<Box<dyn Archive>>,
    closed: bool,
}

impl ArchiveSet {
    pub fn new(archives: Vec<Box<dyn Archive>>) -> Self {
        Self {
            archives,
            closed: false,
        }
    }

    pub fn push(&mut self, archive: Box<dyn Archive>) {
        self.archives.push(archive);
        self.closed = false;
    }

    pub fn len(&self) -> usize {
        self.archives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    /// Order the archives by module name.
    pub fn sort_by_module(&mut self) {
        self.archives
            .sort_by(|a, b| a.module_name().cmp(b.module_name()));
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Archive>> {
        self.archives.iter_mut()
    }

    /// Close every archive, returning the first error after trying them all.
    pub fn close_all(&mut self) -> Result<()> {
        self.closed = true;
        let mut first_error = None;
        for archive in &mut self.archives {
            if let Err(error) = archive.close() {
                tracing::warn!("failed to close archive {}: {}", archive.module_name(), error);
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl From<Vec<Box<dyn Archive>>> for ArchiveSet {
    fn from(archives: Vec<Box<dyn Archive>>) -> Self {
        Self::new(archives)
    }
}

impl Drop for ArchiveSet {
    fn drop(&mut self) {
        if !self.closed {
            // Errors are logged by close_all.
            let _ = self.close_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("classes/java/lang/String.class"),
            (EntryKind::ClassOrResource, "java/lang/String.class")
        );
        assert_eq!(classify("conf/net.properties"), (EntryKind::Config, "net.properties"));
        assert_eq!(classify("lib/libnet.so"), (EntryKind::NativeLib, "libnet.so"));
        assert_eq!(classify("native/libnet.so"), (EntryKind::NativeLib, "libnet.so"));
        assert_eq!(classify("bin/java"), (EntryKind::Other, "java"));
        assert_eq!(
            classify("java/lang/Object.class"),
            (EntryKind::ClassOrResource, "java/lang/Object.class")
        );
        assert_eq!(classify("module-info.class"), (EntryKind::ClassOrResource, "module-info.class"));
    }

    #[test]
    fn test_archive_set_closes_on_drop() {
        let archive = MemoryArchive::new("mod").with_entry("a/X.class", b"x".to_vec());
        let closed = archive.close_flag();
        {
            let _set = ArchiveSet::new(vec![Box::new(archive)]);
            assert!(!closed.get());
        }
        assert!(closed.get());
    }

    #[test]
    fn test_sort_by_module() {
        let mut set = ArchiveSet::new(vec![
            Box::new(MemoryArchive::new("b")),
            Box::new(MemoryArchive::new("a")),
        ]);
        set.sort_by_module();
        let names: Vec<_> = set.iter_mut().map(|a| a.module_name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        set.close_all().unwrap();
    }
}
