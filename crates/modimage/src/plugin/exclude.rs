use glob::Pattern;

use super::{compile_patterns, ResourcePlugin};
use crate::{pool::ResourcePool, Result};

/// Drops every entry whose path matches one of the patterns.
#[derive(Debug, Clone)]
pub struct ExcludePlugin {
    patterns: Vec<Pattern>,
}

impl ExcludePlugin {
    pub fn new(patterns: &[String]) -> Result<Self> {
        Ok(Self {
            patterns: compile_patterns(patterns)?,
        })
    }
}

impl ResourcePlugin for ExcludePlugin {
    fn name(&self) -> &str {
        "exclude"
    }

    fn transform(&self, mut pool: ResourcePool) -> Result<ResourcePool> {
        pool.retain(|entry| {
            let excluded = self.patterns.iter().any(|p| p.matches(entry.path()));
            if excluded {
                tracing::debug!("excluding {}", entry.path());
            }
            !excluded
        });
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{content::bytes_content, pool::ResourceEntry};

    #[test]
    fn test_exclude() {
        let mut pool = ResourcePool::default();
        for path in ["/m/META-INF/MANIFEST.MF", "/m/a/X.class", "/n/META-INF/LICENSE"] {
            let module = &path[1..2];
            pool.add(ResourceEntry::resource(module, path, bytes_content(vec![])).unwrap())
                .unwrap();
        }

        let plugin = ExcludePlugin::new(&["/*/META-INF/*".to_string()]).unwrap();
        let pool = plugin.transform(pool).unwrap();
        let paths: Vec<_> = pool.entries().map(|e| e.path()).collect();
        assert_eq!(paths, vec!["/m/a/X.class"]);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(ExcludePlugin::new(&["/[".to_string()]).is_err());
    }
}
