//! Pool transformations applied between reading the archives and indexing.

use glob::Pattern;
use std::fmt::Debug;

use crate::{pool::ResourcePool, ImageError, Result};

mod compress;
mod exclude;
mod order;

pub use compress::CompressPlugin;
pub use exclude::ExcludePlugin;
pub use order::OrderResourcesPlugin;

/// A transformation of the whole resource pool.
pub trait ResourcePlugin: Debug {
    fn name(&self) -> &str;

    /// Consume `pool` and return the transformed pool.
    fn transform(&self, pool: ResourcePool) -> Result<ResourcePool>;
}

/// Plugins applied in order.
#[derive(Debug, Default)]
pub struct PluginStack {
    plugins: Vec<Box<dyn ResourcePlugin>>,
}

impl PluginStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(mut self, plugin: impl ResourcePlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn push(&mut self, plugin: Box<dyn ResourcePlugin>) {
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|plugin| plugin.name())
    }

    /// Run every plugin over the pool.
    pub fn visit_resources(&self, mut pool: ResourcePool) -> Result<ResourcePool> {
        for plugin in &self.plugins {
            let before = pool.len();
            pool = plugin.transform(pool).map_err(|error| match error {
                ImageError::Plugin { .. } => error,
                error => ImageError::Plugin {
                    plugin: plugin.name().to_string(),
                    message: error.to_string(),
                },
            })?;
            tracing::info!(
                "plugin {} done ({} -> {} entries)",
                plugin.name(),
                before,
                pool.len()
            );
        }
        Ok(pool)
    }
}

pub(crate) fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| Pattern::new(pattern).map_err(ImageError::from))
        .collect()
}
