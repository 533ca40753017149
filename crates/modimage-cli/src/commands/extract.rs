use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use miette::Result;
use modimage::ImageExtractor;

use crate::{
    errors::CliError,
    println_pad,
    utils::{ensure_module, open_image},
};

pub struct ExtractImageArgs {
    pub file_path: String,
    pub output_dir: Option<String>,
    pub module: Option<String>,
}

/// Parent folder + file stem of the image. Images are often named `modules`
/// with no extension, so the stem alone would collide with the file.
fn default_output_dir(file_path: &Utf8Path) -> Utf8PathBuf {
    let file_stem = match (file_path.file_stem(), file_path.extension()) {
        (Some(stem), Some(_)) => stem.to_string(),
        (Some(stem), None) => format!("{stem}.extracted"),
        (None, _) => "extracted".to_string(),
    };
    match file_path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.join(file_stem),
        _ => Utf8PathBuf::from(file_stem),
    }
}

pub fn extract_image(args: ExtractImageArgs) -> Result<()> {
    let file_path = Utf8Path::new(&args.file_path);
    let mut image = open_image(file_path)?;

    println_pad!(
        "{} {}",
        "🗄️  Extracting image:".bright_blue().bold(),
        file_path.as_str().bright_cyan().bold()
    );

    let output_dir = args
        .output_dir
        .map(Utf8PathBuf::from)
        .unwrap_or_else(|| default_output_dir(file_path));
    println_pad!(
        "{} {}",
        "📁 Extracting to:".bright_yellow(),
        output_dir.as_str().bright_white().bold()
    );

    let count = match &args.module {
        Some(module) => {
            ensure_module(&mut image, module)?;
            ImageExtractor::new(&mut image)
                .extract_module(module, &output_dir)
                .map_err(CliError::from)?
        }
        None => ImageExtractor::new(&mut image)
            .extract_all(&output_dir)
            .map_err(CliError::from)?,
    };

    println_pad!(
        "{} {}",
        "✅ Extraction complete!".bright_green().bold(),
        format!("({count} resources)").dimmed()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_dir() {
        assert_eq!(
            default_output_dir(Utf8Path::new("build/modules.image")),
            Utf8PathBuf::from("build/modules")
        );
        assert_eq!(
            default_output_dir(Utf8Path::new("lib/modules")),
            Utf8PathBuf::from("lib/modules.extracted")
        );
    }
}
