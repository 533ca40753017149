//! Logical resource path helpers.
//!
//! Resource paths have the form `/<module>/<package path>/<base>.<ext>`. The only
//! path without a module segment is `/module-info.class`.

use crate::{ImageError, Result};

/// Path of module descriptors, which are stored without a module segment.
pub const MODULE_INFO_PATH: &str = "/module-info.class";

/// Root of the synthetic module directory tree.
pub const MODULES_ROOT: &str = "modules";

/// Root of the synthetic package to module index.
pub const PACKAGES_ROOT: &str = "packages";

/// Split a resource path into `(module, package, resource name)`.
///
/// The package is returned in dotted form (`java.lang`) and is empty for
/// resources in the unnamed package.
///
/// ```
/// let (module, package, name) = modimage::split_path("/java.base/java/lang/String.class").unwrap();
/// assert_eq!((module, package.as_str(), name), ("java.base", "java.lang", "String.class"));
/// ```
pub fn split_path(path: &str) -> Result<(&str, String, &str)> {
    let Some(no_root) = path.strip_prefix('/') else {
        return Err(ImageError::malformed(path, "path must start with '/'"));
    };

    if path == MODULE_INFO_PATH {
        return Ok(("", String::new(), no_root));
    }

    let Some(pkg_start) = no_root.find('/') else {
        return Err(ImageError::malformed(path, "missing module separator"));
    };

    let module = &no_root[..pkg_start];
    if module.is_empty() {
        return Err(ImageError::malformed(path, "empty module name"));
    }

    let rest = &no_root[pkg_start + 1..];
    let name = match rest.rfind('/') {
        Some(pkg_end) => &rest[pkg_end + 1..],
        None => rest,
    };
    if name.is_empty() {
        return Err(ImageError::malformed(path, "empty resource name"));
    }

    Ok((module, to_package(rest), name))
}

/// Convert the directory part of `name` (everything before the last `/`) to a
/// dotted package name. Returns an empty string for the unnamed package.
pub fn to_package(name: &str) -> String {
    match name.rfind('/') {
        Some(index) if index > 0 => name[..index].replace('/', "."),
        _ => String::new(),
    }
}

/// Whether `path` names a class file that belongs to a package, i.e. anything
/// ending in `.class` except module descriptors.
pub fn is_class_resource(path: &str) -> bool {
    path.ends_with(".class") && !path.ends_with("module-info.class")
}

/// The four name components stored in a location's attributes.
///
/// Unlike [`split_path`], the parent is kept in `/` form so the original path can
/// be rebuilt exactly from the components.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceName<'a> {
    pub module: &'a str,
    pub parent: &'a str,
    pub base: &'a str,
    pub extension: &'a str,
}

impl<'a> ResourceName<'a> {
    /// Split any location path, including synthetic directory paths such as
    /// `/modules` or `/packages/java.lang`.
    ///
    /// Fails when the components would not rebuild `path` exactly.
    pub fn parse(path: &'a str) -> Result<Self> {
        if !path.starts_with('/') {
            return Err(ImageError::malformed(path, "path must start with '/'"));
        }
        if path.contains("//") {
            return Err(ImageError::malformed(path, "empty path segment"));
        }

        let mut name = ResourceName::default();
        let mut offset = 1;
        if let Some(index) = path[1..].find('/').map(|i| i + 1) {
            name.module = &path[1..index];
            offset = index + 1;
        }

        if let Some(index) = path.rfind('/').filter(|&i| i > offset) {
            name.parent = &path[offset..index];
            offset = index + 1;
        }

        // A leading or trailing dot belongs to the base name.
        match path.rfind('.').filter(|&i| i > offset && i + 1 < path.len()) {
            Some(index) => {
                name.base = &path[offset..index];
                name.extension = &path[index + 1..];
            }
            None => name.base = &path[offset..],
        }
        if name.base.is_empty() {
            return Err(ImageError::malformed(path, "empty resource name"));
        }

        if name.full_name() != path {
            return Err(ImageError::malformed(path, "path does not round-trip"));
        }

        Ok(name)
    }

    /// Split and validate the path of a real resource.
    ///
    /// On top of [`ResourceName::parse`] this requires a module segment (except
    /// for `/module-info.class`), a non-empty resource name and a module name
    /// that does not collide with the synthetic directory roots.
    pub fn parse_resource(path: &'a str) -> Result<Self> {
        let (module, _, _) = split_path(path)?;
        if module == MODULES_ROOT || module == PACKAGES_ROOT {
            return Err(ImageError::malformed(path, "reserved module name"));
        }
        Self::parse(path)
    }

    /// Rebuild the path these components were parsed from.
    pub fn full_name(&self) -> String {
        join_name(self.module, self.parent, self.base, self.extension)
    }
}

pub(crate) fn join_name(module: &str, parent: &str, base: &str, extension: &str) -> String {
    let mut full = String::with_capacity(
        module.len() + parent.len() + base.len() + extension.len() + 4,
    );
    full.push('/');
    if !module.is_empty() {
        full.push_str(module);
        full.push('/');
    }
    if !parent.is_empty() {
        full.push_str(parent);
        full.push('/');
    }
    full.push_str(base);
    if !extension.is_empty() {
        full.push('.');
        full.push_str(extension);
    }
    full
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path() {
        let (module, package, name) = split_path("/java.base/java/lang/String.class").unwrap();
        assert_eq!(module, "java.base");
        assert_eq!(package, "java.lang");
        assert_eq!(name, "String.class");
    }

    #[test]
    fn test_split_path_unnamed_package() {
        let (module, package, name) = split_path("/mod/README").unwrap();
        assert_eq!((module, package.as_str(), name), ("mod", "", "README"));
    }

    #[test]
    fn test_split_path_module_info() {
        let (module, package, name) = split_path("/module-info.class").unwrap();
        assert_eq!((module, package.as_str(), name), ("", "", "module-info.class"));
    }

    #[test]
    fn test_split_path_malformed() {
        for path in [
            "/java.base",
            "java.base/java/lang/String.class",
            "//java/lang/String.class",
            "/java.base/",
            "/java.base/java/lang/",
            "",
        ] {
            assert!(
                matches!(split_path(path), Err(ImageError::MalformedPath { .. })),
                "{path} should be malformed"
            );
        }
    }

    #[test]
    fn test_is_class_resource() {
        assert!(is_class_resource("/java.base/java/lang/String.class"));
        assert!(!is_class_resource("/module-info.class"));
        assert!(!is_class_resource("/java.base/module-info.class"));
        assert!(!is_class_resource("/java.base/sun/net/www/content-types.properties"));
    }

    #[test]
    fn test_resource_name_components() {
        let name = ResourceName::parse("/java.base/java/lang/String.class").unwrap();
        assert_eq!(name.module, "java.base");
        assert_eq!(name.parent, "java/lang");
        assert_eq!(name.base, "String");
        assert_eq!(name.extension, "class");

        let name = ResourceName::parse("/mod/archive.tar.gz").unwrap();
        assert_eq!((name.parent, name.base, name.extension), ("", "archive.tar", "gz"));

        let name = ResourceName::parse("/mod/a/.hidden").unwrap();
        assert_eq!((name.parent, name.base, name.extension), ("a", ".hidden", ""));

        let name = ResourceName::parse("/mod/a/X.").unwrap();
        assert_eq!((name.parent, name.base, name.extension), ("a", "X.", ""));
        assert_eq!(name.full_name(), "/mod/a/X.");

        let name = ResourceName::parse("/mod/res.d/..x").unwrap();
        assert_eq!((name.parent, name.base, name.extension), ("res.d", ".", "x"));
        assert_eq!(name.full_name(), "/mod/res.d/..x");
    }

    #[test]
    fn test_resource_name_synthetic_paths() {
        let name = ResourceName::parse("/modules").unwrap();
        assert_eq!((name.module, name.base), ("", "modules"));

        let name = ResourceName::parse("/packages/java.lang").unwrap();
        assert_eq!(name.module, "packages");
        assert_eq!(name.full_name(), "/packages/java.lang");

        let name = ResourceName::parse(MODULE_INFO_PATH).unwrap();
        assert_eq!((name.module, name.base, name.extension), ("", "module-info", "class"));
    }

    #[test]
    fn test_resource_name_rejects_non_roundtrip() {
        for path in ["/mod//X.class", "/mod/a/", "relative/X.class"] {
            assert!(ResourceName::parse(path).is_err(), "{path} should fail");
        }
    }

    #[test]
    fn test_parse_resource_reserved_modules() {
        assert!(ResourceName::parse_resource("/modules/a/X.class").is_err());
        assert!(ResourceName::parse_resource("/packages/a/X.class").is_err());
        assert!(ResourceName::parse_resource("/modulesx/a/X.class").is_ok());
        assert!(ResourceName::parse_resource("/no-module.class").is_err());
        assert!(ResourceName::parse_resource(MODULE_INFO_PATH).is_ok());
    }
}
