use camino::{Utf8Path, Utf8PathBuf};
use std::{io, rc::Rc};

use super::{classify, Archive, ArchiveEntry};
use crate::{content::FileContent, ImageError, Result};

/// An exploded module directory.
#[derive(Debug, Clone)]
pub struct DirArchive {
    root: Utf8PathBuf,
    module: String,
}

impl DirArchive {
    /// Open `root`, naming the module after the directory unless `module` is given.
    pub fn new(root: impl Into<Utf8PathBuf>, module: Option<String>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ImageError::Config(format!("{root} is not a directory")));
        }

        let module = match module {
            Some(module) => module,
            None => root
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| ImageError::Config(format!("cannot derive a module name from {root}")))?,
        };

        Ok(Self { root, module })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl Archive for DirArchive {
    fn module_name(&self) -> &str {
        &self.module
    }

    fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let mut entries = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = Utf8PathBuf::from_path_buf(entry.into_path()).map_err(|path| {
                ImageError::malformed(path.display().to_string(), "file name is not UTF-8")
            })?;
            let relative = path
                .strip_prefix(&self.root)
                .map_err(|_| ImageError::malformed(path.as_str(), "file outside module root"))?
                .components()
                .map(|component| component.as_str())
                .collect::<Vec<_>>()
                .join("/");

            let (kind, name) = classify(&relative);
            entries.push(ArchiveEntry {
                name: name.to_string(),
                path: relative.clone(),
                kind,
                content: Rc::new(FileContent::new(path)?),
            });
        }

        tracing::debug!("found {} entries in {}", entries.len(), self.root);
        Ok(entries)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
