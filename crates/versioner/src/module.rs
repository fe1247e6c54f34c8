//! Version modules.
//!
//! Packaging hooks stamp the resolved version into a module of the package
//! (by default `<package>/version.py`) so that builds without VCS metadata
//! still know their version.
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};

pub const DEFAULT_VERSION_MODULE: &str = "version";

static VERSION_ASSIGNMENT: Lazy<regex::Regex> = Lazy::new(|| {
    regex::RegexBuilder::new(r#"^version\s*=\s*(?:'(?P<single>[^']*)'|"(?P<double>[^"]*)")"#)
        .multi_line(true)
        .build()
        .unwrap()
});

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to write version module {path:?}")]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Loads the `version` attribute of a version module.
pub trait VersionModuleLoader {
    /// The version exposed by module `<package>.<module>`, if it exists.
    fn load(&self, package: &str, module: &str) -> Option<String>;
}

impl<T> VersionModuleLoader for Box<T>
where
    T: VersionModuleLoader + ?Sized,
{
    fn load(&self, package: &str, module: &str) -> Option<String> {
        (**self).load(package, module)
    }
}

/// Finds nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NoModules;

impl VersionModuleLoader for NoModules {
    fn load(&self, _package: &str, _module: &str) -> Option<String> {
        None
    }
}

/// Version modules as python source files below `root`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceTree {
    pub root: PathBuf,
}

impl SourceTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The file of module `<package>.<module>`, e.g. `natcap/versioner/version.py`.
    #[must_use]
    pub fn module_path(&self, package: &str, module: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(package.split('.'));
        path.extend(module.split('.'));
        path.set_extension("py");
        path
    }
}

impl VersionModuleLoader for SourceTree {
    fn load(&self, package: &str, module: &str) -> Option<String> {
        let path = self.module_path(package, module);
        let source = std::fs::read_to_string(&path).ok()?;
        let version = parse_version_module(&source);
        tracing::debug!(?path, ?version, "loaded version module");
        version
    }
}

/// Extract the `version = '...'` assignment of a version module.
#[must_use]
pub fn parse_version_module(source: &str) -> Option<String> {
    let captures = VERSION_ASSIGNMENT.captures(source)?;
    captures
        .name("single")
        .or_else(|| captures.name("double"))
        .map(|m| m.as_str().to_string())
}

/// Render the contents of a generated version module.
#[must_use]
pub fn render_version_module(version: &str) -> String {
    let escaped = version.replace('\\', "\\\\").replace('\'', "\\'");
    format!("# coding: utf-8\n# file generated by versioner\nversion = '{escaped}'\n")
}

/// Write a version module for `version` to `path`.
///
/// # Errors
/// When the file or its parent directories cannot be written.
pub fn write_version_module(path: &Path, version: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| Error::Write {
            source,
            path: path.to_path_buf(),
        })?;
    }
    std::fs::write(path, render_version_module(version)).map_err(|source| Error::Write {
        source,
        path: path.to_path_buf(),
    })?;
    tracing::info!(?path, version, "wrote version module");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_version_module, write_version_module, SourceTree, VersionModuleLoader};
    use color_eyre::eyre;
    use similar_asserts::assert_eq as sim_assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_module_path() {
        let tree = SourceTree::new("/src");
        sim_assert_eq!(
            tree.module_path("natcap.versioner", "version"),
            PathBuf::from("/src/natcap/versioner/version.py")
        );
        sim_assert_eq!(
            tree.module_path("_foo", "bar"),
            PathBuf::from("/src/_foo/bar.py")
        );
    }

    #[test]
    fn test_parse_version_module() {
        sim_assert_eq!(
            parse_version_module("# comment\nversion = '0.0.1'\n"),
            Some("0.0.1".to_string())
        );
        sim_assert_eq!(
            parse_version_module("version=\"1.2.post3+n2c9e4a1f\""),
            Some("1.2.post3+n2c9e4a1f".to_string())
        );
        sim_assert_eq!(parse_version_module("__version__ = '1'\n"), None);
    }

    #[test]
    fn test_write_then_load() -> eyre::Result<()> {
        crate::tests::init();
        let dir = tempfile::TempDir::new()?;
        let tree = SourceTree::new(dir.path());
        sim_assert_eq!(tree.load("_foo", "version"), None);

        write_version_module(&tree.module_path("_foo", "version"), "0.0.1")?;
        sim_assert_eq!(tree.load("_foo", "version"), Some("0.0.1".to_string()));
        sim_assert_eq!(tree.load("_foo", "bar"), None);
        Ok(())
    }
}
