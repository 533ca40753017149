use camino::{Utf8Path, Utf8PathBuf};
use modimage::ModImage;
use std::{fs::File, io::BufReader};

use crate::errors::CliError;

#[macro_export]
macro_rules! println_pad {
    ($($arg:tt)*) => {{
        let __s = format!($($arg)*);
        for __line in __s.lines() {
            println!("    {}", __line);
        }
    }};
}

pub fn current_dir() -> Result<Utf8PathBuf, CliError> {
    let cwd = std::env::current_dir()?;
    Utf8PathBuf::from_path_buf(cwd).map_err(|path| CliError::NonUtf8Path {
        path: path.display().to_string(),
    })
}

/// Resolve `path` against the working directory unless it is absolute.
pub fn absolute(path: impl AsRef<Utf8Path>) -> Result<Utf8PathBuf, CliError> {
    let path = path.as_ref();
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(current_dir()?.join(path))
    }
}

pub fn open_image(path: &Utf8Path) -> Result<ModImage<BufReader<File>>, CliError> {
    if !path.exists() {
        return Err(CliError::image_not_found(path.to_path_buf()));
    }
    Ok(ModImage::open(path)?)
}

/// Fail with [`CliError::ModuleNotFound`] when `module` is not in the image.
pub fn ensure_module(
    image: &mut ModImage<BufReader<File>>,
    module: &str,
) -> Result<(), CliError> {
    match image.modules() {
        Ok(modules) if modules.iter().any(|m| m == module) => Ok(()),
        Ok(_) => Err(CliError::module_not_found(module)),
        Err(source) => Err(source.into()),
    }
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
