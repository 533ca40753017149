//! Serialization of a built index and its pool into the image layout.

use camino::Utf8Path;
use itertools::Itertools;
use std::io::{self, BufWriter, Write};

use crate::{
    header::ImageByteOrder, index::ImageIndex, options::ImageOptions, pool::ResourcePool,
    ImageError, Result,
};

/// Totals reported after an image has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSummary {
    pub resource_count: u32,
    pub table_length: u32,
    pub index_size: u64,
    pub content_size: u64,
    pub total_size: u64,
    pub byte_order: ImageByteOrder,
}

/// Serializes an [`ImageIndex`] and the content of its pool.
#[derive(Debug, Clone)]
pub struct ImageWriter {
    options: ImageOptions,
}

impl ImageWriter {
    pub fn new(options: &ImageOptions) -> Self {
        Self { options: *options }
    }

    /// Write the image to `writer`.
    ///
    /// `index` must have been built from `pool`.
    pub fn write<W: Write>(
        &self,
        pool: &ResourcePool,
        index: &ImageIndex,
        writer: &mut W,
    ) -> Result<ImageSummary> {
        let order = index.byte_order();
        if order != self.options.byte_order.resolve() {
            tracing::warn!(
                "index was built for {order} byte order, writer configured for {}",
                self.options.byte_order
            );
        }

        let mut writer = CountingWriter::new(writer);
        let header = index.header();
        writer.write_all(&header.encode(order)?)?;
        for &value in index.redirect().values() {
            order.write_u32(&mut writer, value as u32)?;
        }
        for &offset in index.offsets() {
            order.write_u32(&mut writer, offset)?;
        }
        writer.write_all(index.attributes())?;
        writer.write_all(&index.strings().to_bytes(order)?)?;

        let index_size = writer.written;
        if index_size != index.index_size() {
            return Err(ImageError::CorruptIndex(format!(
                "wrote {index_size} index bytes, header declares {}",
                index.index_size()
            )));
        }

        let entries = pool.entries().collect_vec();
        for slot in index.content_slots() {
            let entry = entries
                .get(slot.entry)
                .filter(|entry| entry.path() == slot.path)
                .ok_or_else(|| {
                    ImageError::CorruptIndex(format!("{} is missing from the pool", slot.path))
                })?;

            let start = writer.written;
            entry.content().read_into(&mut writer)?;
            let actual = writer.written - start;
            if actual != slot.size {
                return Err(ImageError::SizeMismatch {
                    path: slot.path.clone(),
                    expected: slot.size,
                    actual,
                });
            }
            tracing::trace!("wrote {} ({} bytes)", slot.path, actual);
        }
        writer.write_all(index.directory_content())?;
        writer.flush()?;

        let summary = ImageSummary {
            resource_count: header.resource_count,
            table_length: header.table_length,
            index_size,
            content_size: writer.written - index_size,
            total_size: writer.written,
            byte_order: order,
        };
        tracing::info!(
            "wrote image with {} resources ({} bytes)",
            summary.resource_count,
            summary.total_size
        );

        Ok(summary)
    }

    /// Write the image to `path` atomically.
    ///
    /// The image is written to a temporary file next to `path` and renamed into
    /// place once complete, so a failed build never leaves a partial image.
    pub fn write_to_path(
        &self,
        pool: &ResourcePool,
        index: &ImageIndex,
        path: impl AsRef<Utf8Path>,
    ) -> Result<ImageSummary> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let mut file = tempfile::NamedTempFile::new_in(parent)?;
        let summary = {
            let mut writer = BufWriter::new(file.as_file_mut());
            let summary = self.write(pool, index, &mut writer)?;
            writer.flush()?;
            summary
        };
        file.as_file().sync_all()?;
        file.persist(path).map_err(|error| ImageError::Io(error.error))?;

        Ok(summary)
    }
}

struct CountingWriter<'a, W: Write> {
    inner: &'a mut W,
    written: u64,
}

impl<'a, W: Write> CountingWriter<'a, W> {
    fn new(inner: &'a mut W) -> Self {
        Self { inner, written: 0 }
    }
}

impl<W: Write> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        content::{bytes_content, ContentProvider},
        header::ImageHeader,
        index::ImageIndexBuilder,
        pool::{EntryData, ResourceEntry},
    };
    use std::rc::Rc;

    /// Announces more bytes than it produces.
    #[derive(Debug)]
    struct LyingContent;

    impl ContentProvider for LyingContent {
        fn size(&self) -> u64 {
            10
        }

        fn read_into(&self, out: &mut dyn Write) -> io::Result<u64> {
            out.write_all(b"short")?;
            Ok(5)
        }
    }

    fn three_resource_pool() -> ResourcePool {
        let mut pool = ResourcePool::default();
        for (path, bytes) in [
            ("/mod/a/X.class", &b"\xCA\xFE"[..]),
            ("/mod/a/Y.class", &b"\xBA\xBE\x00"[..]),
            ("/mod/b/Z.txt", &b"hello"[..]),
        ] {
            pool.add(ResourceEntry::resource("mod", path, bytes_content(bytes.to_vec())).unwrap())
                .unwrap();
        }
        pool
    }

    #[test]
    fn test_layout() {
        let pool = three_resource_pool();
        let options = ImageOptions::default().with_byte_order(ImageByteOrder::Big);
        let index = ImageIndexBuilder::new(&options).build(&pool).unwrap();

        let mut bytes = Vec::new();
        let summary = ImageWriter::new(&options)
            .write(&pool, &index, &mut bytes)
            .unwrap();

        assert_eq!(summary.total_size, bytes.len() as u64);
        assert_eq!(summary.resource_count, 3);
        assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xDA, 0xDA]);

        let (header, order) = ImageHeader::decode(&mut &bytes[..]).unwrap();
        assert_eq!(order, ImageByteOrder::Big);
        assert_eq!(header.index_size(), summary.index_size);

        let content = &bytes[summary.index_size as usize..];
        assert_eq!(&content[..10], b"\xCA\xFE\xBA\xBE\x00hello");
        assert_eq!(content.len() as u64, index.content_size());
    }

    #[test]
    fn test_empty_image() {
        let pool = ResourcePool::default();
        let options = ImageOptions::default();
        let index = ImageIndexBuilder::new(&options).build(&pool).unwrap();

        let mut bytes = Vec::new();
        let summary = ImageWriter::new(&options)
            .write(&pool, &index, &mut bytes)
            .unwrap();
        assert_eq!(bytes.len(), ImageHeader::SIZE + 4);
        assert_eq!(summary.content_size, 0);
        assert_eq!(summary.table_length, 0);
    }

    #[test]
    fn test_size_mismatch() {
        let mut pool = ResourcePool::default();
        pool.add(
            ResourceEntry::new(
                "mod",
                "/mod/a/X.class",
                crate::pool::EntryKind::ClassOrResource,
                EntryData::Plain(Rc::new(LyingContent)),
            )
            .unwrap(),
        )
        .unwrap();
        let options = ImageOptions::default();
        let index = ImageIndexBuilder::new(&options).build(&pool).unwrap();

        let result = ImageWriter::new(&options).write(&pool, &index, &mut Vec::new());
        assert!(matches!(
            result,
            Err(ImageError::SizeMismatch { expected: 10, actual: 5, .. })
        ));
    }

    #[test]
    fn test_atomic_write_leaves_nothing_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("out/modules");

        let mut pool = ResourcePool::default();
        pool.add(ResourceEntry::resource("mod", "/mod/a/X.class", Rc::new(LyingContent)).unwrap())
            .unwrap();
        let options = ImageOptions::default();
        let index = ImageIndexBuilder::new(&options).build(&pool).unwrap();

        assert!(ImageWriter::new(&options)
            .write_to_path(&pool, &index, &path)
            .is_err());
        assert!(!path.exists());
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_write_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("modules");

        let pool = three_resource_pool();
        let options = ImageOptions::default();
        let index = ImageIndexBuilder::new(&options).build(&pool).unwrap();
        let summary = ImageWriter::new(&options)
            .write_to_path(&pool, &index, &path)
            .unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), summary.total_size);
    }
}
