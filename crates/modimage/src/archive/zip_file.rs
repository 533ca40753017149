use camino::{Utf8Path, Utf8PathBuf};
use std::{
    cell::RefCell,
    fmt,
    fs::File,
    io::{self, BufReader, Write},
    rc::Rc,
};

use super::{classify, Archive, ArchiveEntry};
use crate::{content::ContentProvider, ImageError, Result};

type SharedZip = Rc<RefCell<Option<zip::ZipArchive<BufReader<File>>>>>;

/// A zip packaged module (`.jar`, `.jmod` or plain `.zip`).
///
/// Entry content is read on demand from the open archive; after
/// [`close`](Archive::close) every read fails.
pub struct ZipArchive {
    path: Utf8PathBuf,
    module: String,
    archive: SharedZip,
}

impl fmt::Debug for ZipArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipArchive")
            .field("path", &self.path)
            .field("module", &self.module)
            .field("open", &self.archive.borrow().is_some())
            .finish()
    }
}

impl ZipArchive {
    /// Open `path`, naming the module after the file stem unless `module` is given.
    pub fn open(path: impl Into<Utf8PathBuf>, module: Option<String>) -> Result<Self> {
        let path = path.into();
        let module = match module {
            Some(module) => module,
            None => path
                .file_stem()
                .map(str::to_string)
                .ok_or_else(|| ImageError::Config(format!("cannot derive a module name from {path}")))?,
        };

        let file = File::open(path.as_std_path())?;
        let archive = zip::ZipArchive::new(BufReader::new(file))?;

        Ok(Self {
            path,
            module,
            archive: Rc::new(RefCell::new(Some(archive))),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.archive.borrow().is_some()
    }
}

impl Archive for ZipArchive {
    fn module_name(&self) -> &str {
        &self.module
    }

    fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let mut shared = self.archive.borrow_mut();
        let archive = shared
            .as_mut()
            .ok_or_else(|| ImageError::ArchiveClosed(self.module.clone()))?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }

            let relative = file.name().trim_start_matches('/').to_string();
            let (kind, name) = classify(&relative);
            entries.push(ArchiveEntry {
                name: name.to_string(),
                path: relative.clone(),
                kind,
                content: Rc::new(ZipEntryContent {
                    archive: Rc::clone(&self.archive),
                    module: self.module.clone(),
                    index,
                    size: file.size(),
                }),
            });
        }

        tracing::debug!("found {} entries in {}", entries.len(), self.path);
        Ok(entries)
    }

    fn close(&mut self) -> Result<()> {
        if self.archive.borrow_mut().take().is_some() {
            tracing::debug!("closed {}", self.path);
        }
        Ok(())
    }
}

/// Lazily read content of one zip entry.
struct ZipEntryContent {
    archive: SharedZip,
    module: String,
    index: usize,
    size: u64,
}

impl fmt::Debug for ZipEntryContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipEntryContent")
            .field("module", &self.module)
            .field("index", &self.index)
            .field("size", &self.size)
            .finish()
    }
}

impl ContentProvider for ZipEntryContent {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_into(&self, out: &mut dyn Write) -> io::Result<u64> {
        let mut shared = self.archive.borrow_mut();
        let archive = shared.as_mut().ok_or_else(|| {
            io::Error::other(format!("archive '{}' is closed", self.module))
        })?;

        let mut file = archive.by_index(self.index)?;
        io::copy(&mut file, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::EntryKind;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Utf8Path, files: &[(&str, &str)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, contents) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_zip_entries_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("java.logging.jmod");
        write_zip(
            &path,
            &[
                ("classes/java/util/logging/Logger.class", "logger"),
                ("conf/logging.properties", "level=INFO"),
            ],
        );

        let mut archive = ZipArchive::open(path, None).unwrap();
        assert_eq!(archive.module_name(), "java.logging");

        let entries = archive.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "java/util/logging/Logger.class");
        assert_eq!(entries[0].kind, EntryKind::ClassOrResource);
        assert_eq!(entries[1].kind, EntryKind::Config);
        assert_eq!(entries[0].content.read_all().unwrap(), b"logger");

        archive.close().unwrap();
        assert!(!archive.is_open());
        assert!(entries[0].content.read_all().is_err());
        assert!(matches!(archive.entries(), Err(ImageError::ArchiveClosed(_))));
        archive.close().unwrap();
    }
}
