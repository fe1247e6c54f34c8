//! Release and installed package metadata.
//!
//! Source distributions carry a `PKG-INFO` file, installed packages a
//! `<name>-<version>.dist-info/METADATA` (or `.egg-info/PKG-INFO`) file.
//! Both use the same `Version: <version>` header.
use std::path::{Path, PathBuf};

pub const PKG_INFO: &str = "PKG-INFO";
pub const METADATA: &str = "METADATA";

/// Environment variable listing site-packages directories to search.
pub const SITE_PACKAGES_ENV: &str = "VERSIONER_SITE_PACKAGES";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to read {path:?}")]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("invalid glob pattern")]
    Glob(#[from] glob::PatternError),
}

/// Extract the version from the first line starting with `Version`.
#[must_use]
pub fn read_version_field(contents: &str) -> Option<String> {
    contents
        .lines()
        .find(|line| line.starts_with("Version"))
        .and_then(|line| line.split(": ").nth(1))
        .map(|version| version.trim_end().to_string())
}

fn read_metadata_file(path: &Path) -> Result<Option<String>, Error> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(read_version_field(&contents)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::Io {
            source,
            path: path.to_path_buf(),
        }),
    }
}

/// Read the version from the `PKG-INFO` file in `root`.
///
/// Returns `None` if there is no such file.
///
/// # Errors
/// When the file exists but cannot be read.
pub fn read_pkg_info(root: &Path) -> Result<Option<String>, Error> {
    let path = root.join(PKG_INFO);
    if !path.is_file() {
        return Ok(None);
    }
    let version = read_metadata_file(&path)?;
    tracing::debug!(?path, ?version, "read release metadata");
    Ok(version)
}

/// Looks up versions of installed packages.
pub trait PackageRegistry {
    /// The installed version of `package`, if it is installed.
    fn installed_version(&self, package: &str) -> Option<String>;
}

impl<T> PackageRegistry for Box<T>
where
    T: PackageRegistry + ?Sized,
{
    fn installed_version(&self, package: &str) -> Option<String> {
        (**self).installed_version(package)
    }
}

/// A registry without any installed packages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NoRegistry;

impl PackageRegistry for NoRegistry {
    fn installed_version(&self, _package: &str) -> Option<String> {
        None
    }
}

/// Normalize a distribution name for comparison.
///
/// Lowercase with runs of `-`, `_` and `.` collapsed into a single `_`.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            separator = true;
            continue;
        }
        if separator && !normalized.is_empty() {
            normalized.push('_');
        }
        separator = false;
        normalized.extend(c.to_lowercase());
    }
    normalized
}

/// Installed package metadata in site-packages directories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SitePackages {
    pub dirs: Vec<PathBuf>,
}

impl SitePackages {
    #[must_use]
    pub fn new(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            dirs: dirs.into_iter().collect(),
        }
    }

    /// Site-packages directories listed in [`SITE_PACKAGES_ENV`].
    #[must_use]
    pub fn from_env() -> Self {
        let dirs = std::env::var_os(SITE_PACKAGES_ENV)
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();
        Self { dirs }
    }

    /// Find the installed version of `package`.
    ///
    /// # Errors
    /// When a metadata directory exists but its metadata cannot be read.
    pub fn find(&self, package: &str) -> Result<Option<String>, Error> {
        let wanted = normalize_name(package);
        for dir in &self.dirs {
            for (suffix, file_name) in [(".dist-info", METADATA), (".egg-info", PKG_INFO)] {
                let pattern = format!(
                    "{}/*{suffix}",
                    glob::Pattern::escape(&dir.to_string_lossy())
                );
                for entry in glob::glob(&pattern)? {
                    let entry = match entry {
                        Ok(entry) => entry,
                        Err(err) => {
                            tracing::warn!("skipping {:?}: {err}", err.path());
                            continue;
                        }
                    };
                    let Some(stem) = entry
                        .file_name()
                        .and_then(|name| name.to_str())
                        .and_then(|name| name.strip_suffix(suffix))
                    else {
                        continue;
                    };
                    let (name, dir_version) = match stem.split_once('-') {
                        Some((name, version)) => (name, Some(version)),
                        None => (stem, None),
                    };
                    if normalize_name(name) != wanted {
                        continue;
                    }
                    let version = read_metadata_file(&entry.join(file_name))?
                        .or_else(|| dir_version.map(ToString::to_string));
                    tracing::debug!(package, ?entry, ?version, "found installed metadata");
                    if version.is_some() {
                        return Ok(version);
                    }
                }
            }
        }
        Ok(None)
    }
}

impl PackageRegistry for SitePackages {
    fn installed_version(&self, package: &str) -> Option<String> {
        match self.find(package) {
            Ok(version) => version,
            Err(err) => {
                tracing::warn!("failed to read installed metadata of {package}: {err}");
                None
            }
        }
    }
}
