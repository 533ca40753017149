use std::{cell::Cell, rc::Rc};

use super::{classify, Archive, ArchiveEntry};
use crate::{content::bytes_content, ImageError, Result};

/// An archive whose files are held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    module: String,
    files: Vec<(String, Rc<[u8]>)>,
    closed: Rc<Cell<bool>>,
}

impl MemoryArchive {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Default::default()
        }
    }

    /// Add a file at an archive-relative path such as `classes/a/X.class`.
    pub fn with_entry(mut self, path: impl Into<String>, bytes: impl Into<Rc<[u8]>>) -> Self {
        self.files.push((path.into(), bytes.into()));
        self
    }

    /// Shared flag that turns true once the archive is closed.
    pub fn close_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.closed)
    }
}

impl Archive for MemoryArchive {
    fn module_name(&self) -> &str {
        &self.module
    }

    fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        if self.closed.get() {
            return Err(ImageError::ArchiveClosed(self.module.clone()));
        }

        Ok(self
            .files
            .iter()
            .map(|(path, bytes)| {
                let (kind, name) = classify(path);
                ArchiveEntry {
                    name: name.to_string(),
                    path: path.clone(),
                    kind,
                    content: bytes_content(Rc::clone(bytes)),
                }
            })
            .collect())
    }

    fn close(&mut self) -> Result<()> {
        self.closed.set(true);
        Ok(())
    }
}
