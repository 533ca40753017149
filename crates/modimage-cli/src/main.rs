use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    create_image, extract_image, info_image, list_image, ByteOrderArg, CreateImageArgs,
    ExtractImageArgs, InfoImageArgs, ListImageArgs,
};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build an image from module directories and archives
    Create {
        /// The path to the image config file
        #[arg(short, long)]
        config_path: Option<String>,

        /// Where to write the image; overrides the config file
        #[arg(short, long)]
        output: Option<String>,

        /// Module directories or zip/jmod archives to add
        #[arg(short, long = "module-path")]
        module_path: Vec<String>,

        /// Byte order of the image
        #[arg(long, value_enum)]
        byte_order: Option<ByteOrderArg>,

        /// Compress resources with zstd at this level
        #[arg(long)]
        compress: Option<i32>,

        /// Glob of image paths to leave out
        #[arg(long)]
        exclude: Vec<String>,

        /// Store content shared by several resources only once
        #[arg(long)]
        dedup: bool,

        /// Write config, native library and other non-resource files here
        #[arg(long)]
        files_dir: Option<String>,
    },
    /// Show information about an image
    Info {
        /// The path to the image file
        #[arg(short, long)]
        file_path: String,
    },
    /// List the resources or packages of an image
    List {
        /// The path to the image file
        #[arg(short, long)]
        file_path: String,

        /// Only list this module
        #[arg(short, long)]
        module: Option<String>,

        /// List packages instead of resources
        #[arg(short, long)]
        packages: bool,
    },
    /// Extract the resources of an image to a directory
    Extract {
        /// The path to the image file
        #[arg(short, long)]
        file_path: String,

        /// The directory to extract to
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Only extract this module
        #[arg(short, long)]
        module: Option<String>,
    },
}

fn parse_args() -> Result<Args> {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).into_diagnostic()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("modimage=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;

    match args.command {
        Commands::Create {
            config_path,
            output,
            module_path,
            byte_order,
            compress,
            exclude,
            dedup,
            files_dir,
        } => create_image(CreateImageArgs {
            config_path,
            output,
            module_path,
            byte_order,
            compress,
            exclude,
            dedup,
            files_dir,
        }),
        Commands::Info { file_path } => info_image(InfoImageArgs { file_path }),
        Commands::List {
            file_path,
            module,
            packages,
        } => list_image(ListImageArgs {
            file_path,
            module,
            packages,
        }),
        Commands::Extract {
            file_path,
            output_dir,
            module,
        } => extract_image(ExtractImageArgs {
            file_path,
            output_dir,
            module,
        }),
    }
}
