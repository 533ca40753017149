use camino::{Utf8Path, Utf8PathBuf};
use std::{
    fs::File,
    io::{BufWriter, Read, Seek, Write},
};

use crate::{location::ImageLocation, path::split_path, ImageError, ModImage, Result};

/// Writes the resources of a mounted image back to the filesystem.
pub struct ImageExtractor<'a, TSource: Read + Seek> {
    image: &'a mut ModImage<TSource>,
}

impl<'a, TSource: Read + Seek> ImageExtractor<'a, TSource> {
    pub fn new(image: &'a mut ModImage<TSource>) -> Self {
        Self { image }
    }

    /// Extract every resource to `dir/<path>`, returning the number written.
    pub fn extract_all(&mut self, dir: impl AsRef<Utf8Path>) -> Result<usize> {
        let resources = self.image.resources()?;
        self.extract(resources, dir.as_ref())
    }

    /// Extract the resources of one module.
    pub fn extract_module(&mut self, module: &str, dir: impl AsRef<Utf8Path>) -> Result<usize> {
        let resources = self
            .image
            .resources()?
            .into_iter()
            .filter(|location| {
                split_path(&location.name).is_ok_and(|(owner, _, _)| owner == module)
            })
            .collect::<Vec<_>>();
        if resources.is_empty() {
            return Err(ImageError::ResourceNotFound(format!("/{module}")));
        }
        self.extract(resources, dir.as_ref())
    }

    fn extract(&mut self, resources: Vec<ImageLocation>, dir: &Utf8Path) -> Result<usize> {
        for location in &resources {
            let target = output_path(dir, &location.name)?;
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut out = BufWriter::new(File::create(&target)?);
            self.image.decoder().copy_to(location, &mut out)?;
            out.flush()?;
            tracing::debug!("extracted {} to {}", location.name, target);
        }

        tracing::info!("extracted {} resources to {}", resources.len(), dir);
        Ok(resources.len())
    }
}

/// Map an image path below `dir`, refusing anything that would escape it.
pub(crate) fn output_path(dir: &Utf8Path, name: &str) -> Result<Utf8PathBuf> {
    let relative = name.trim_start_matches('/');
    if relative
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(ImageError::malformed(name, "path cannot be extracted safely"));
    }
    Ok(dir.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        let dir = Utf8Path::new("out");
        assert_eq!(
            output_path(dir, "/mod/a/X.class").unwrap(),
            Utf8PathBuf::from("out/mod/a/X.class")
        );
        assert!(output_path(dir, "/mod/../../etc/passwd").is_err());
        assert!(output_path(dir, "/mod/./X.class").is_err());
    }
}
