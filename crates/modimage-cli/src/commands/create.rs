use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use miette::Result;
use modimage::{
    config::{ArchiveConfig, CompressConfig},
    ImageByteOrder, ImageConfig, ImageFileCreator, ImageSummary, ImageWriter,
};

use crate::{
    errors::CliError,
    println_pad,
    utils::{self, format_size},
};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ByteOrderArg {
    Little,
    Big,
    Native,
}

impl From<ByteOrderArg> for ImageByteOrder {
    fn from(value: ByteOrderArg) -> Self {
        match value {
            ByteOrderArg::Little => ImageByteOrder::Little,
            ByteOrderArg::Big => ImageByteOrder::Big,
            ByteOrderArg::Native => ImageByteOrder::Native,
        }
    }
}

#[derive(Debug)]
pub struct CreateImageArgs {
    pub config_path: Option<String>,
    pub output: Option<String>,
    pub module_path: Vec<String>,
    pub byte_order: Option<ByteOrderArg>,
    pub compress: Option<i32>,
    pub exclude: Vec<String>,
    pub dedup: bool,
    pub files_dir: Option<String>,
}

pub fn create_image(args: CreateImageArgs) -> Result<()> {
    let (config, base_dir) = resolve_config(&args)?;
    let config = apply_overrides(config, &args)?;
    if config.archives.is_empty() {
        return Err(CliError::NoArchives.into());
    }

    let output = match &args.output {
        Some(output) => utils::absolute(output)?,
        None => config.output_path(&base_dir),
    };
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).map_err(CliError::from)?;
    }

    println_pad!(
        "{} {}",
        "📦 Creating image:".bright_blue().bold(),
        output.as_str().bright_cyan().bold()
    );
    for archive in &config.archives {
        println_pad!(
            "   {} {}",
            "•".bright_cyan(),
            archive.path.as_str().bright_white()
        );
    }

    let plugins = config
        .plugin_stack()
        .map_err(|e| CliError::config_parse_error(base_dir.clone(), e))?;
    if !plugins.is_empty() {
        println_pad!(
            "{} {}",
            "🔌 Plugins:".bright_magenta(),
            plugins.names().collect::<Vec<_>>().join(", ").bright_white()
        );
    }

    let creator = ImageFileCreator::new(config.options()).with_plugins(plugins);
    let archives = config.open_archives(&base_dir).map_err(CliError::from)?;
    let summary = match &args.files_dir {
        Some(files_dir) => {
            create_with_files(&creator, archives, &output, &utils::absolute(files_dir)?)?
        }
        None => creator.create(archives, &output).map_err(CliError::from)?,
    };

    print_summary(&summary);
    println_pad!(
        "{}\n{} {}",
        "✅ Image created successfully!".bright_green().bold(),
        "📍 Path:".bright_green(),
        output.as_str().bright_white().bold()
    );

    Ok(())
}

/// Load the config file if there is one; module paths on the command line
/// make it optional.
fn resolve_config(args: &CreateImageArgs) -> Result<(ImageConfig, Utf8PathBuf), CliError> {
    let config_path = match &args.config_path {
        Some(path) => Some(utils::absolute(path)?),
        None => ImageConfig::locate(utils::current_dir()?),
    };

    match config_path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path));
            }
            let config = ImageConfig::from_path(&path)
                .map_err(|e| CliError::config_parse_error(path.clone(), e))?;
            let base_dir = path
                .parent()
                .map(Utf8Path::to_path_buf)
                .unwrap_or_default();
            Ok((config, base_dir))
        }
        None if !args.module_path.is_empty() => {
            Ok((ImageConfig::default(), utils::current_dir()?))
        }
        None => Err(CliError::config_not_found(utils::current_dir()?)),
    }
}

fn apply_overrides(mut config: ImageConfig, args: &CreateImageArgs) -> Result<ImageConfig, CliError> {
    for path in &args.module_path {
        config.archives.push(ArchiveConfig {
            path: utils::absolute(path)?,
            module: None,
        });
    }
    if let Some(byte_order) = args.byte_order {
        config.byte_order = byte_order.into();
    }
    if let Some(level) = args.compress {
        let include = config
            .plugins
            .compress
            .take()
            .map(|compress| compress.include)
            .unwrap_or_default();
        config.plugins.compress = Some(CompressConfig { level, include });
    }
    config.plugins.exclude.extend(args.exclude.iter().cloned());
    config.deduplicate_content |= args.dedup;

    config
        .validate()
        .map_err(|e| CliError::config_parse_error(Utf8PathBuf::from("<command line>"), e))?;
    Ok(config)
}

fn create_with_files(
    creator: &ImageFileCreator,
    mut archives: modimage::archive::ArchiveSet,
    output: &Utf8Path,
    files_dir: &Utf8Path,
) -> Result<ImageSummary, CliError> {
    let (pool, index) = creator.build(&mut archives)?;
    let stored = ImageFileCreator::store_files(&pool, files_dir)?;
    println_pad!(
        "{} {} {}",
        "📁 Stored".bright_yellow(),
        stored.to_string().bright_white().bold(),
        format!("files in {files_dir}").bright_yellow()
    );

    let summary = ImageWriter::new(creator.options()).write_to_path(&pool, &index, output)?;
    archives.close_all()?;
    Ok(summary)
}

fn print_summary(summary: &ImageSummary) {
    println_pad!(
        "{} {} {}",
        "🧾 Resources:".bright_green(),
        summary.resource_count.to_string().bright_white().bold(),
        format!("(table length {})", summary.table_length).dimmed()
    );
    println_pad!(
        "{} {} {}",
        "📏 Size:".bright_green(),
        format_size(summary.total_size).bright_white().bold(),
        format!(
            "(index {}, content {}, {} endian)",
            format_size(summary.index_size),
            format_size(summary.content_size),
            summary.byte_order
        )
        .dimmed()
    );
}
