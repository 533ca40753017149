//! Lazy content access for pool entries.
//!
//! Entries never hold their bytes up front; they hold a [`ContentProvider`] that
//! knows its size and can stream the bytes into a writer when the image is
//! written. This keeps peak memory bounded by the largest single resource.

use camino::Utf8PathBuf;
use std::{
    fmt::Debug,
    fs::File,
    io::{self, BufReader, Write},
    rc::Rc,
};

/// A source of bytes for one resource.
pub trait ContentProvider: Debug {
    /// Number of bytes [`read_into`](Self::read_into) will produce.
    fn size(&self) -> u64;

    /// Stream the content into `out`, returning the number of bytes written.
    fn read_into(&self, out: &mut dyn Write) -> io::Result<u64>;

    /// Read the whole content into memory.
    fn read_all(&self) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.size() as usize);
        self.read_into(&mut buffer)?;
        Ok(buffer)
    }
}

/// Content already held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct BytesContent(Rc<[u8]>);

impl BytesContent {
    pub fn new(bytes: impl Into<Rc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for BytesContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BytesContent")
            .field("len", &self.0.len())
            .finish()
    }
}

impl ContentProvider for BytesContent {
    fn size(&self) -> u64 {
        self.0.len() as u64
    }

    fn read_into(&self, out: &mut dyn Write) -> io::Result<u64> {
        out.write_all(&self.0)?;
        Ok(self.0.len() as u64)
    }
}

/// Content of a file on disk, opened only when it is read.
#[derive(Debug, Clone)]
pub struct FileContent {
    path: Utf8PathBuf,
    size: u64,
}

impl FileContent {
    /// Create a provider for `path`, recording its current size.
    pub fn new(path: impl Into<Utf8PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let size = std::fs::metadata(path.as_std_path())?.len();
        Ok(Self { path, size })
    }

    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }
}

impl ContentProvider for FileContent {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_into(&self, out: &mut dyn Write) -> io::Result<u64> {
        let mut reader = BufReader::new(File::open(self.path.as_std_path())?);
        io::copy(&mut reader, out)
    }
}

/// Shorthand for an in-memory provider.
pub fn bytes_content(bytes: impl Into<Rc<[u8]>>) -> Rc<dyn ContentProvider> {
    Rc::new(BytesContent::new(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_content() {
        let content = BytesContent::new(vec![1u8, 2, 3]);
        assert_eq!(content.size(), 3);
        assert_eq!(content.read_all().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_file_content_is_lazy() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("X.class")).unwrap();
        std::fs::write(&path, b"\xCA\xFE\xBA\xBE").unwrap();

        let content = FileContent::new(path.clone()).unwrap();
        assert_eq!(content.size(), 4);

        std::fs::write(&path, b"\xCA\xFE\xBA\xBF").unwrap();
        assert_eq!(content.read_all().unwrap(), b"\xCA\xFE\xBA\xBF");
    }
}
