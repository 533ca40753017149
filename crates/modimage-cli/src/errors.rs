use camino::Utf8PathBuf;
use miette::Diagnostic;
use modimage::ImageError;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Configuration file not found")]
    #[diagnostic(
        code(config::not_found),
        help("Create an image.config.json or image.config.toml file, or pass --module-path")
    )]
    ConfigNotFound { search_path: Utf8PathBuf },

    #[error("Invalid configuration file: {path}")]
    #[diagnostic(
        code(config::parse_error),
        help("Check image.config.json or image.config.toml for syntax errors")
    )]
    ConfigParseError {
        path: Utf8PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("No modules to pack")]
    #[diagnostic(
        code(create::no_archives),
        help("List module directories under [[archives]] in the config file or pass --module-path")
    )]
    NoArchives,

    #[error("Image file not found: {path}")]
    #[diagnostic(
        code(file::not_found),
        help("Make sure the file exists and the path is correct")
    )]
    ImageNotFound { path: Utf8PathBuf },

    #[error("Module not found in image: {module}")]
    #[diagnostic(
        code(image::module_not_found),
        help("Run `modimage list --file-path <IMAGE> --packages` to see the modules of an image")
    )]
    ModuleNotFound { module: String },

    #[error("Path is not valid UTF-8: {path}")]
    #[diagnostic(code(fs::non_utf8_path))]
    NonUtf8Path { path: String },

    #[error("Image operation failed")]
    #[diagnostic(code(image::operation_failed))]
    Image {
        #[from]
        source: ImageError,
    },

    #[error("IO operation failed")]
    #[diagnostic(code(io::operation_failed))]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn config_not_found(search_path: Utf8PathBuf) -> Self {
        Self::ConfigNotFound { search_path }
    }

    pub fn config_parse_error(path: Utf8PathBuf, source: ImageError) -> Self {
        Self::ConfigParseError { path, source }
    }

    pub fn image_not_found(path: Utf8PathBuf) -> Self {
        Self::ImageNotFound { path }
    }

    pub fn module_not_found(module: impl Into<String>) -> Self {
        Self::ModuleNotFound {
            module: module.into(),
        }
    }
}
