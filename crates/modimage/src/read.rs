use camino::Utf8Path;
use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
};

use crate::{
    header::ImageHeader, redirect::RedirectTable, strings::StringTable, ImageError, ModImage,
    Result,
};

impl<TSource: Read + Seek> ModImage<TSource> {
    /// Mount an image, loading only its index region.
    pub fn mount_from_reader(mut source: TSource) -> Result<Self> {
        let source_len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        let mut reader = BufReader::new(&mut source);
        let (header, byte_order) = ImageHeader::decode(&mut reader)?;
        if header.index_size() > source_len {
            return Err(ImageError::CorruptIndex(format!(
                "index of {} bytes does not fit in a {source_len} byte image",
                header.index_size()
            )));
        }

        let table_length = header.table_length as usize;
        let mut redirect = Vec::with_capacity(table_length);
        for _ in 0..table_length {
            redirect.push(byte_order.read_u32(&mut reader)? as i32);
        }
        let mut offsets = Vec::with_capacity(table_length);
        for _ in 0..table_length {
            offsets.push(byte_order.read_u32(&mut reader)?);
        }

        let mut attributes = vec![0; header.location_attributes_size as usize];
        reader.read_exact(&mut attributes)?;

        let mut strings = vec![0; header.strings_size as usize];
        reader.read_exact(&mut strings)?;
        let strings = StringTable::from_bytes(&strings, byte_order)?;

        tracing::debug!(
            "mounted {byte_order} endian image with {} resources in {} slots",
            header.resource_count,
            header.table_length
        );

        Ok(Self {
            header,
            byte_order,
            redirect: RedirectTable::from_raw(redirect),
            offsets,
            attributes,
            strings,
            source,
        })
    }
}

impl ModImage<BufReader<File>> {
    /// Open and mount the image at `path`.
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let file = File::open(path.as_ref().as_std_path())?;
        Self::mount_from_reader(BufReader::new(file))
    }
}
