use camino::Utf8Path;
use colored::Colorize;
use miette::Result;

use crate::{
    errors::CliError,
    println_pad,
    utils::{ensure_module, format_size, open_image},
};

pub struct ListImageArgs {
    pub file_path: String,
    pub module: Option<String>,
    pub packages: bool,
}

pub fn list_image(args: ListImageArgs) -> Result<()> {
    let mut image = open_image(Utf8Path::new(&args.file_path))?;
    if let Some(module) = &args.module {
        ensure_module(&mut image, module)?;
    }

    if args.packages {
        let modules = match &args.module {
            Some(module) => vec![module.clone()],
            None => image.modules().map_err(CliError::from)?,
        };
        for module in modules {
            println_pad!("{}", module.bright_cyan().bold());
            for package in image.packages(&module).map_err(CliError::from)? {
                println_pad!("   {} {}", "•".bright_cyan(), package);
            }
        }
        return Ok(());
    }

    let prefix = args.module.as_ref().map(|module| format!("/{module}/"));
    for location in image.resources().map_err(CliError::from)? {
        if prefix
            .as_ref()
            .is_some_and(|prefix| !location.name.starts_with(prefix.as_str()))
        {
            continue;
        }

        let size = format_size(location.uncompressed_size());
        if location.is_compressed() {
            println_pad!(
                "{} {}",
                location.name,
                format!("{size}, {} compressed", format_size(location.compressed_size())).dimmed()
            );
        } else {
            println_pad!("{} {}", location.name, size.dimmed());
        }
    }

    Ok(())
}
