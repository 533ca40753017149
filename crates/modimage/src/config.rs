//! Build configuration loaded from `image.config.json` or `image.config.toml`.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::{
    archive::{Archive, ArchiveSet, DirArchive, ZipArchive},
    header::ImageByteOrder,
    options::ImageOptions,
    plugin::{CompressPlugin, ExcludePlugin, OrderResourcesPlugin, PluginStack},
    pool::DuplicatePolicy,
    ImageError, Result,
};

pub const CONFIG_FILE_JSON: &str = "image.config.json";
pub const CONFIG_FILE_TOML: &str = "image.config.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ImageConfig {
    /// Image output path, relative to the config file.
    #[serde(default = "default_output")]
    pub output: Utf8PathBuf,

    #[serde(default)]
    pub byte_order: ImageByteOrder,

    /// What to do when two entries map to the same image path.
    #[serde(default)]
    pub duplicates: DuplicatePolicy,

    #[serde(default)]
    pub deduplicate_content: bool,

    /// Module sources, directories or zip/jmod files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub archives: Vec<ArchiveConfig>,

    #[serde(default)]
    pub plugins: PluginConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArchiveConfig {
    pub path: Utf8PathBuf,

    /// Module name; defaults to the directory name or file stem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PluginConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compress: Option<CompressConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompressConfig {
    #[serde(default = "default_level")]
    pub level: i32,

    /// Only compress matching paths; every resource when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
}

fn default_output() -> Utf8PathBuf {
    Utf8PathBuf::from("modules")
}

fn default_level() -> i32 {
    CompressPlugin::DEFAULT_LEVEL
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            byte_order: ImageByteOrder::default(),
            duplicates: DuplicatePolicy::default(),
            deduplicate_content: false,
            archives: Vec::new(),
            plugins: PluginConfig::default(),
        }
    }
}

impl ImageConfig {
    /// Find the config file in `dir`, preferring JSON over TOML.
    pub fn locate(dir: impl AsRef<Utf8Path>) -> Option<Utf8PathBuf> {
        [CONFIG_FILE_JSON, CONFIG_FILE_TOML]
            .iter()
            .map(|name| dir.as_ref().join(name))
            .find(|path| path.exists())
    }

    /// Load a config file, choosing the format from its extension.
    pub fn from_path(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension() {
            Some("json") => Self::from_json_str(&content)?,
            Some("toml") => Self::from_toml_str(&content)?,
            _ => {
                return Err(ImageError::Config(format!(
                    "{path}: expected {CONFIG_FILE_JSON} or {CONFIG_FILE_TOML}"
                )))
            }
        };
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(compress) = &self.plugins.compress {
            let levels = zstd::compression_level_range();
            if !levels.contains(&compress.level) {
                return Err(ImageError::Config(format!(
                    "compression level {} outside {}..={}",
                    compress.level,
                    levels.start(),
                    levels.end()
                )));
            }
        }
        Ok(())
    }

    pub fn options(&self) -> ImageOptions {
        ImageOptions::new()
            .with_byte_order(self.byte_order)
            .with_duplicate_policy(self.duplicates)
            .with_deduplicate_content(self.deduplicate_content)
    }

    /// Plugins in application order: exclude, order, compress.
    pub fn plugin_stack(&self) -> Result<PluginStack> {
        let mut stack = PluginStack::new();
        if !self.plugins.exclude.is_empty() {
            stack.push(Box::new(ExcludePlugin::new(&self.plugins.exclude)?));
        }
        if !self.plugins.order.is_empty() {
            stack.push(Box::new(OrderResourcesPlugin::new(&self.plugins.order)?));
        }
        if let Some(compress) = &self.plugins.compress {
            stack.push(Box::new(CompressPlugin::new(
                compress.level,
                &compress.include,
            )?));
        }
        Ok(stack)
    }

    /// Open every configured archive. Relative paths are resolved against `base_dir`.
    pub fn open_archives(&self, base_dir: impl AsRef<Utf8Path>) -> Result<ArchiveSet> {
        let mut archives = ArchiveSet::default();
        for archive in &self.archives {
            archives.push(open_archive(
                &base_dir.as_ref().join(&archive.path),
                archive.module.clone(),
            )?);
        }
        Ok(archives)
    }

    /// The output path resolved against `base_dir`.
    pub fn output_path(&self, base_dir: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        base_dir.as_ref().join(&self.output)
    }
}

/// Open a directory as a [`DirArchive`] and anything else as a [`ZipArchive`].
pub fn open_archive(path: &Utf8Path, module: Option<String>) -> Result<Box<dyn Archive>> {
    if path.is_dir() {
        Ok(Box::new(DirArchive::new(path, module)?))
    } else {
        Ok(Box::new(ZipArchive::open(path, module)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml() {
        let config = ImageConfig::from_toml_str(
            r#"
            output = "build/modules"
            byte_order = "big"
            duplicates = "fail"
            deduplicate_content = true

            [[archives]]
            path = "mods/java.base"
            module = "java.base"

            [[archives]]
            path = "mods/java.logging.jmod"

            [plugins]
            exclude = ["/*/META-INF/**"]
            order = ["/java.base/**"]

            [plugins.compress]
            level = 9
            include = ["**/*.class"]
            "#,
        )
        .unwrap();

        assert_eq!(config.output, "build/modules");
        assert_eq!(config.archives.len(), 2);
        assert_eq!(config.archives[0].module.as_deref(), Some("java.base"));
        assert_eq!(config.archives[1].module, None);

        let options = config.options();
        assert_eq!(options.byte_order, ImageByteOrder::Big);
        assert_eq!(options.duplicate_policy, DuplicatePolicy::Fail);
        assert!(options.deduplicate_content);

        let stack = config.plugin_stack().unwrap();
        assert_eq!(
            stack.names().collect::<Vec<_>>(),
            vec!["exclude", "order-resources", "compress"]
        );
    }

    #[test]
    fn test_parse_json_defaults() {
        let config = ImageConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ImageConfig::default());
        assert!(config.plugin_stack().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_level() {
        let result = ImageConfig::from_json_str(r#"{ "plugins": { "compress": { "level": 99 } } }"#);
        assert!(matches!(result, Err(ImageError::Config(_))));
    }

    #[test]
    fn test_invalid_byte_order() {
        assert!(ImageConfig::from_toml_str(r#"byte_order = "middle""#).is_err());
    }

    #[test]
    fn test_locate_prefers_json() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        assert_eq!(ImageConfig::locate(dir), None);

        std::fs::write(dir.join(CONFIG_FILE_TOML), "").unwrap();
        assert_eq!(ImageConfig::locate(dir), Some(dir.join(CONFIG_FILE_TOML)));

        std::fs::write(dir.join(CONFIG_FILE_JSON), "{}").unwrap();
        let located = ImageConfig::locate(dir).unwrap();
        assert_eq!(located, dir.join(CONFIG_FILE_JSON));
        assert_eq!(ImageConfig::from_path(located).unwrap(), ImageConfig::default());
    }
}
