use glob::Pattern;
use itertools::Itertools;

use super::{compile_patterns, ResourcePlugin};
use crate::{pool::ResourcePool, Result};

/// Moves entries matching the patterns to the front of the content region.
///
/// Entries matching an earlier pattern come first; unmatched entries keep
/// their relative order at the end.
#[derive(Debug, Clone)]
pub struct OrderResourcesPlugin {
    patterns: Vec<Pattern>,
}

impl OrderResourcesPlugin {
    pub fn new(patterns: &[String]) -> Result<Self> {
        Ok(Self {
            patterns: compile_patterns(patterns)?,
        })
    }

    fn rank(&self, path: &str) -> usize {
        self.patterns
            .iter()
            .position(|pattern| pattern.matches(path))
            .unwrap_or(self.patterns.len())
    }
}

impl ResourcePlugin for OrderResourcesPlugin {
    fn name(&self) -> &str {
        "order-resources"
    }

    fn transform(&self, pool: ResourcePool) -> Result<ResourcePool> {
        let mut ordered = pool.empty_like();
        let entries = pool
            .into_entries()
            .into_iter()
            .sorted_by_key(|entry| self.rank(entry.path()));
        for entry in entries {
            ordered.add(entry)?;
        }
        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{content::bytes_content, pool::ResourceEntry};

    #[test]
    fn test_stable_order() {
        let mut pool = ResourcePool::default();
        for path in ["/m/a/A.class", "/m/b/B.txt", "/m/a/C.class", "/m/c/D.class"] {
            pool.add(ResourceEntry::resource("m", path, bytes_content(vec![])).unwrap())
                .unwrap();
        }

        let plugin =
            OrderResourcesPlugin::new(&["/m/c/*".to_string(), "*.class".to_string()]).unwrap();
        let pool = plugin.transform(pool).unwrap();
        let paths: Vec<_> = pool.entries().map(|e| e.path()).collect();
        assert_eq!(
            paths,
            vec!["/m/c/D.class", "/m/a/A.class", "/m/a/C.class", "/m/b/B.txt"]
        );
    }
}
