use camino::Utf8Path;
use itertools::Itertools;
use std::{
    fs::File,
    io::{BufWriter, Write},
};

use crate::{
    archive::{ArchiveEntry, ArchiveSet},
    extractor::output_path,
    index::{ImageIndex, ImageIndexBuilder},
    options::ImageOptions,
    plugin::PluginStack,
    pool::{EntryData, EntryKind, ResourceEntry, ResourcePool},
    writer::{ImageSummary, ImageWriter},
    Result,
};

/// Drives a whole build: archives, pool, plugins, index and writer.
#[derive(Debug, Default)]
pub struct ImageFileCreator {
    options: ImageOptions,
    plugins: PluginStack,
}

impl ImageFileCreator {
    pub fn new(options: ImageOptions) -> Self {
        Self {
            options,
            plugins: PluginStack::default(),
        }
    }

    pub fn with_plugins(mut self, plugins: PluginStack) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn options(&self) -> &ImageOptions {
        &self.options
    }

    /// Build the image and write it atomically to `path`.
    ///
    /// Every archive is closed before returning, whether the build succeeded
    /// or not.
    pub fn create(
        &self,
        archives: impl Into<ArchiveSet>,
        path: impl AsRef<Utf8Path>,
    ) -> Result<ImageSummary> {
        let mut archives = archives.into();
        let result = self.build(&mut archives).and_then(|(pool, index)| {
            ImageWriter::new(&self.options).write_to_path(&pool, &index, path.as_ref())
        });
        finish(archives, result)
    }

    /// Build the image and write it to `writer`.
    pub fn create_to_writer<W: Write>(
        &self,
        archives: impl Into<ArchiveSet>,
        writer: &mut W,
    ) -> Result<ImageSummary> {
        let mut archives = archives.into();
        let result = self
            .build(&mut archives)
            .and_then(|(pool, index)| ImageWriter::new(&self.options).write(&pool, &index, writer));
        finish(archives, result)
    }

    /// Read, transform and index the archives without writing anything.
    pub fn build(&self, archives: &mut ArchiveSet) -> Result<(ResourcePool, ImageIndex)> {
        let pool = self.read_archives(archives)?;
        let pool = self.plugins.visit_resources(pool)?;
        let index = ImageIndexBuilder::new(&self.options).build(&pool)?;
        Ok((pool, index))
    }

    /// Collect the entries of every archive into a pool.
    ///
    /// Modules are read in name order; within a module non-resource entries
    /// come before classes and resources.
    pub fn read_archives(&self, archives: &mut ArchiveSet) -> Result<ResourcePool> {
        archives.sort_by_module();

        let mut pool = ResourcePool::new(self.options.duplicate_policy);
        for archive in archives.iter_mut() {
            let module = archive.module_name().to_string();
            let (resources, others): (Vec<_>, Vec<_>) = archive
                .entries()?
                .into_iter()
                .partition(|entry| entry.kind == EntryKind::ClassOrResource);
            tracing::info!(
                "reading module {} ({} resources, {} other files)",
                module,
                resources.len(),
                others.len()
            );

            for entry in others.into_iter().chain(resources) {
                pool.add(pool_entry(&module, entry)?)?;
            }
        }

        Ok(pool)
    }

    /// Write the entries that are not stored in the image to
    /// `dir/<module>/<path>`, returning how many were written.
    pub fn store_files(pool: &ResourcePool, dir: impl AsRef<Utf8Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let files = pool
            .entries()
            .filter(|entry| entry.kind() != EntryKind::ClassOrResource)
            .collect_vec();

        for entry in &files {
            let target = output_path(dir, entry.path())?;
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut out = BufWriter::new(File::create(&target)?);
            entry.content().read_into(&mut out)?;
            out.flush()?;
            tracing::debug!("stored {} at {}", entry.path(), target);
        }

        Ok(files.len())
    }
}

fn finish(mut archives: ArchiveSet, result: Result<ImageSummary>) -> Result<ImageSummary> {
    let closed = archives.close_all();
    let summary = result?;
    closed?;
    Ok(summary)
}

/// Map an archive entry to its image path.
fn pool_entry(module: &str, entry: ArchiveEntry) -> Result<ResourceEntry> {
    let path = match entry.kind {
        EntryKind::ClassOrResource if entry.name.ends_with("module-info.class") => {
            format!("/{}", entry.name)
        }
        EntryKind::ClassOrResource => format!("/{module}/{}", entry.name),
        // Keep the section directory so `lib/x.cfg` and `conf/x.cfg` cannot collide.
        _ => format!("/{module}/{}", entry.path),
    };

    ResourceEntry::new(module, path, entry.kind, EntryData::Plain(entry.content))
}
