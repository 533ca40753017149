use camino::Utf8Path;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use serde_json::to_string_pretty;

use crate::{
    errors::CliError,
    println_pad,
    utils::{format_size, open_image},
};

pub struct InfoImageArgs {
    pub file_path: String,
}

#[derive(Serialize)]
struct ImageInfo {
    version: String,
    byte_order: String,
    resource_count: u32,
    table_length: u32,
    location_attributes_size: u32,
    strings_size: u32,
    index_size: u64,
    content_size: u64,
    modules: Vec<ModuleInfo>,
}

#[derive(Serialize)]
struct ModuleInfo {
    name: String,
    resources: usize,
    packages: usize,
}

pub fn info_image(args: InfoImageArgs) -> Result<()> {
    let file_path = Utf8Path::new(&args.file_path);
    let mut image = open_image(file_path)?;
    let header = *image.header();
    let file_size = std::fs::metadata(file_path).map_err(CliError::from)?.len();

    let resources = image.resources().map_err(CliError::from)?;
    let mut modules = Vec::new();
    for module in image.modules().map_err(CliError::from)? {
        let prefix = format!("/{module}/");
        modules.push(ModuleInfo {
            resources: resources
                .iter()
                .filter(|location| location.name.starts_with(&prefix))
                .count(),
            packages: image.packages(&module).map_err(CliError::from)?.len(),
            name: module,
        });
    }

    let info = ImageInfo {
        version: format!("{}.{}", header.major_version, header.minor_version),
        byte_order: image.byte_order().to_string(),
        resource_count: header.resource_count,
        table_length: header.table_length,
        location_attributes_size: header.location_attributes_size,
        strings_size: header.strings_size,
        index_size: header.index_size(),
        content_size: file_size.saturating_sub(header.index_size()),
        modules,
    };

    println_pad!(
        "{} {}",
        "🗄️  Image:".bright_blue().bold(),
        file_path.as_str().bright_cyan().bold()
    );
    println_pad!(
        "{} {}",
        "🏷️ Version:".bright_green(),
        info.version.bright_white().bold()
    );
    println_pad!(
        "{} {}",
        "📏 Size:".bright_yellow(),
        format!(
            "{} ({} index, {} content)",
            format_size(file_size),
            format_size(info.index_size),
            format_size(info.content_size)
        )
        .bright_white()
    );

    println_pad!("\n{}", "🧩 Modules:".bright_magenta().bold());
    for module in &info.modules {
        println_pad!(
            "   {} {} {}",
            "•".bright_cyan(),
            module.name.bright_cyan().bold(),
            format!(
                "({} resources, {} packages)",
                module.resources, module.packages
            )
            .dimmed()
        );
    }

    println_pad!("\n{}", "🧾 Full header (JSON):".bright_magenta().bold());
    println_pad!("{}", to_string_pretty(&info).into_diagnostic()?);

    Ok(())
}
