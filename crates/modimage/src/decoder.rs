use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::{location::ImageLocation, ImageError, Result};

/// Reads the content of located resources from an image source.
pub struct ModImageDecoder<'a, TSource: Read + Seek> {
    pub(crate) source: &'a mut TSource,
    /// Absolute position of the content region.
    pub(crate) content_start: u64,
}

impl<TSource: Read + Seek> ModImageDecoder<'_, TSource> {
    fn seek_to(&mut self, location: &ImageLocation) -> Result<()> {
        self.source.seek(SeekFrom::Start(
            self.content_start + location.content_offset(),
        ))?;
        Ok(())
    }

    /// Load the stored bytes of a location, compressed or not.
    pub fn load_raw(&mut self, location: &ImageLocation) -> Result<Box<[u8]>> {
        self.seek_to(location)?;
        let mut data = vec![0; location.attributes.on_disk_size() as usize];
        self.source.read_exact(&mut data)?;
        Ok(data.into_boxed_slice())
    }

    /// Load the bytes of a location, decompressing them when needed.
    pub fn load_decompressed(&mut self, location: &ImageLocation) -> Result<Box<[u8]>> {
        let raw = self.load_raw(location)?;
        if !location.is_compressed() {
            return Ok(raw);
        }

        let expected = location.uncompressed_size();
        let data = zstd::bulk::decompress(&raw, expected as usize).map_err(|error| {
            ImageError::Decompression {
                path: location.name.clone(),
                reason: error.to_string(),
            }
        })?;
        if data.len() as u64 != expected {
            return Err(ImageError::Decompression {
                path: location.name.clone(),
                reason: format!("expected {expected} bytes, got {}", data.len()),
            });
        }

        Ok(data.into_boxed_slice())
    }

    /// Read at most `max` uncompressed bytes from the start of a location.
    pub fn read_prefix(&mut self, location: &ImageLocation, max: u64) -> Result<Box<[u8]>> {
        self.seek_to(location)?;
        let stored = (&mut *self.source).take(location.attributes.on_disk_size());

        let mut data = Vec::with_capacity(max.min(location.uncompressed_size()) as usize);
        if location.is_compressed() {
            zstd::Decoder::new(stored)?
                .take(max)
                .read_to_end(&mut data)
                .map_err(|error| ImageError::Decompression {
                    path: location.name.clone(),
                    reason: error.to_string(),
                })?;
        } else {
            stored.take(max).read_to_end(&mut data)?;
        }

        Ok(data.into_boxed_slice())
    }

    /// Stream the uncompressed bytes of a location into `out`.
    pub fn copy_to<W: Write>(&mut self, location: &ImageLocation, out: &mut W) -> Result<u64> {
        self.seek_to(location)?;
        let mut stored = (&mut *self.source).take(location.attributes.on_disk_size());

        let copied = if location.is_compressed() {
            let mut decoder = zstd::Decoder::new(stored)?;
            io::copy(&mut decoder, out).map_err(|error| ImageError::Decompression {
                path: location.name.clone(),
                reason: error.to_string(),
            })?
        } else {
            io::copy(&mut stored, out)?
        };

        if copied != location.uncompressed_size() {
            return Err(ImageError::SizeMismatch {
                path: location.name.clone(),
                expected: location.uncompressed_size(),
                actual: copied,
            });
        }
        Ok(copied)
    }
}
