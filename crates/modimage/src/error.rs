//! Error types for image building and reading.
//!
//! All fallible functions in this crate return [`Result<T>`], which uses
//! [`ImageError`] as the error type. External error types (`std::io::Error`,
//! `binrw::Error`, zip and config parse errors) are converted via `From` impls.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ImageError>;

/// Errors that can occur while building or reading an image.
#[derive(Error, Debug)]
pub enum ImageError {
    /// Reading an archive entry or writing/reading the image failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Header encoding or decoding failed.
    #[error("binrw error: {0}")]
    BinRw(#[from] binrw::Error),

    /// A zip backed archive could not be read.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A plugin or config glob pattern is invalid.
    #[error("invalid glob pattern: {0}")]
    GlobPattern(#[from] glob::PatternError),

    /// `image.config.toml` could not be parsed.
    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// `image.config.json` could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A resource path cannot be split into module, parent and name.
    #[error("malformed resource path \"{path}\": {reason}")]
    MalformedPath { path: String, reason: &'static str },

    /// The same logical path was added twice under [`DuplicatePolicy::Fail`](crate::DuplicatePolicy::Fail).
    #[error("duplicate resource \"{0}\"")]
    DuplicateResource(String),

    /// The redirect/offset tables cannot represent the resource set.
    #[error("table overflow: {0}")]
    TableOverflow(String),

    /// The file does not start with the image magic in either byte order.
    #[error("invalid image magic: {0:#010x}")]
    InvalidMagic(u32),

    /// The header carries a major version this reader does not understand.
    #[error("unsupported image version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    /// A string id that was never issued by the string table.
    #[error("string id {0} out of range")]
    StringOutOfRange(u32),

    /// The index region (tables, attributes, strings, directories) is inconsistent.
    #[error("corrupt image index: {0}")]
    CorruptIndex(String),

    /// No resource with the given path exists in the image.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// A content provider produced a different number of bytes than it announced.
    #[error("size mismatch for \"{path}\": expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    /// A compressed resource could not be decompressed to its recorded size.
    #[error("failed to decompress \"{path}\": {reason}")]
    Decompression { path: String, reason: String },

    /// A plugin failed while transforming the resource pool.
    #[error("plugin '{plugin}' failed: {message}")]
    Plugin { plugin: String, message: String },

    /// Content was requested from an archive that has already been closed.
    #[error("archive '{0}' is closed")]
    ArchiveClosed(String),

    /// The build configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ImageError {
    pub(crate) fn malformed(path: impl Into<String>, reason: &'static str) -> Self {
        Self::MalformedPath {
            path: path.into(),
            reason,
        }
    }
}
