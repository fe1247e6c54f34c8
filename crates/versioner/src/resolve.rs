//! Resolve the version of a package.
//!
//! Sources are tried in order: the version module of the package, installed
//! package metadata, and finally the version control system.
use crate::{
    logging::{Level, Log, TracingLogger},
    metadata::{self, NoRegistry, PackageRegistry},
    module::{NoModules, VersionModuleLoader, DEFAULT_VERSION_MODULE},
    pep440::{self, Method, Pep440Formatter},
    vcs,
};
use std::path::Path;

/// Returned by [`Resolver::vcs_version`] with [`OnError::Return`] if the VCS fails.
pub const UNKNOWN_VERSION: &str = "UNKNOWN";

/// Environment variable marking the process as a frozen distribution.
pub const FROZEN_ENV: &str = "VERSIONER_FROZEN";

/// Set by the PyInstaller bootloader for the bundled process.
const PYINSTALLER_ENV: &str = "_MEIPASS2";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("version module {module} not found and SCM fallback disallowed")]
    VersionNotFound { module: String },

    #[error(
        "the version module {module} was not found in the frozen distribution, \
        perhaps it needs to be bundled explicitly?"
    )]
    Frozen { module: String },

    #[error("failed to determine version of {root:?} from version control")]
    Vcs {
        #[source]
        source: pep440::Error,
        root: std::path::PathBuf,
    },

    #[error(transparent)]
    Metadata(#[from] metadata::Error),
}

impl Error {
    /// Returns `true` if no source yielded a version.
    #[must_use]
    pub fn is_version_not_found(&self) -> bool {
        matches!(
            self,
            Self::VersionNotFound { .. } | Self::Frozen { .. } | Self::Vcs { .. }
        )
    }
}

/// Whether the version may be derived from version control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScmPolicy {
    Allow,
    Disallow,
    /// Allow, unless the process is a frozen distribution.
    #[default]
    AllowWhenNotFrozen,
}

/// What to do when the version control system fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OnError {
    Raise,
    /// Log the failure and return [`UNKNOWN_VERSION`].
    #[default]
    Return,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value {value:?}, expected one of {expected:?}")]
pub struct InvalidVariant {
    pub value: String,
    pub expected: &'static [&'static str],
}

impl ScmPolicy {
    pub const VARIANTS: &'static [&'static str] = &["allow", "disallow", "allow-when-not-frozen"];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Disallow => "disallow",
            Self::AllowWhenNotFrozen => "allow-when-not-frozen",
        }
    }
}

impl std::fmt::Display for ScmPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScmPolicy {
    type Err = InvalidVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "allow" => Ok(Self::Allow),
            "disallow" => Ok(Self::Disallow),
            "allow-when-not-frozen" => Ok(Self::AllowWhenNotFrozen),
            _ => Err(InvalidVariant {
                value: s.to_string(),
                expected: Self::VARIANTS,
            }),
        }
    }
}

impl OnError {
    pub const VARIANTS: &'static [&'static str] = &["raise", "return"];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raise => "raise",
            Self::Return => "return",
        }
    }
}

impl std::fmt::Display for OnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OnError {
    type Err = InvalidVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raise" => Ok(Self::Raise),
            "return" => Ok(Self::Return),
            _ => Err(InvalidVariant {
                value: s.to_string(),
                expected: Self::VARIANTS,
            }),
        }
    }
}

/// Returns `true` if the process runs from a frozen (bundled) distribution.
#[must_use]
pub fn is_frozen() -> bool {
    let flag = std::env::var(FROZEN_ENV)
        .map(|value| {
            let value = value.trim();
            !value.is_empty() && !matches!(value.to_ascii_lowercase().as_str(), "0" | "false" | "no")
        })
        .unwrap_or(false);
    flag || std::env::var_os(PYINSTALLER_ENV).is_some()
}

/// Resolves versions with injected collaborators.
pub struct Resolver<L = TracingLogger> {
    pub modules: Box<dyn VersionModuleLoader>,
    pub registry: Box<dyn PackageRegistry>,
    pub frozen: bool,
    pub logger: L,
}

impl Default for Resolver<TracingLogger> {
    fn default() -> Self {
        Self {
            modules: Box::new(NoModules),
            registry: Box::new(NoRegistry),
            frozen: is_frozen(),
            logger: TracingLogger::new(Level::Error),
        }
    }
}

impl<L> std::fmt::Debug for Resolver<L>
where
    L: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("frozen", &self.frozen)
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}

impl Resolver<TracingLogger> {
    /// A resolver reading version modules below `root` and installed packages
    /// from [`metadata::SITE_PACKAGES_ENV`].
    pub fn for_source_tree(root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            modules: Box::new(crate::module::SourceTree::new(root)),
            registry: Box::new(metadata::SitePackages::from_env()),
            ..Self::default()
        }
    }
}

impl<L> Resolver<L>
where
    L: Log,
{
    /// Get the version of `package`.
    ///
    /// Version control is only consulted if neither the version module
    /// `<package>.<version_module>` nor installed metadata is found, and
    /// `policy` allows it. A failing version control query yields [`UNKNOWN_VERSION`].
    ///
    /// # Errors
    /// When no version is found and the version control fallback is not allowed.
    pub fn get_version(
        &self,
        package: &str,
        root: &Path,
        version_module: Option<&str>,
        policy: ScmPolicy,
    ) -> Result<String, Error> {
        let version_module = version_module.unwrap_or(DEFAULT_VERSION_MODULE);
        let full_module = format!("{package}.{version_module}");

        if let Some(version) = self.modules.load(package, version_module) {
            self.logger.log(
                Level::Debug,
                &format!("found version {version} in module {full_module}"),
            );
            return Ok(version);
        }

        if let Some(version) = self.registry.installed_version(package) {
            self.logger.log(
                Level::Debug,
                &format!("found installed version {version} of {package}"),
            );
            return Ok(version);
        }

        if policy == ScmPolicy::Disallow {
            return Err(Error::VersionNotFound {
                module: full_module,
            });
        }

        if self.frozen && policy != ScmPolicy::AllowWhenNotFrozen {
            return Err(Error::Frozen {
                module: full_module,
            });
        }

        self.vcs_version(root, OnError::Return)
    }

    /// Get the version from release metadata, or from version control.
    ///
    /// Unlike [`Resolver::get_version`], failing version control queries are errors.
    ///
    /// # Errors
    /// When the release metadata cannot be read or version control fails.
    pub fn parse_version(&self, root: &Path) -> Result<String, Error> {
        if let Some(version) = metadata::read_pkg_info(root)? {
            return Ok(version);
        }
        self.vcs_version(root, OnError::Raise)
    }

    /// Get the post-release PEP440 version from the version control system at `root`.
    ///
    /// # Errors
    /// When version control fails and `on_error` is [`OnError::Raise`].
    pub fn vcs_version(&self, root: &Path, on_error: OnError) -> Result<String, Error> {
        let repo = vcs::open(root);
        let formatter = Pep440Formatter::new(false, Method::Post);
        match formatter.format(&repo) {
            Ok(version) => Ok(version),
            Err(source) => match on_error {
                OnError::Raise => Err(Error::Vcs {
                    source,
                    root: root.to_path_buf(),
                }),
                OnError::Return => {
                    let report = error_chain(&source);
                    tracing::error!(?root, "failed to get version from vcs: {report}");
                    self.logger.log(
                        Level::Error,
                        &format!("failed to get version of {root:?} from vcs: {report}"),
                    );
                    Ok(UNKNOWN_VERSION.to_string())
                }
            },
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut chain = vec![err.to_string()];
    let mut source = err.source();
    while let Some(err) = source {
        chain.push(err.to_string());
        source = err.source();
    }
    chain.join(": ")
}

/// [`Resolver::get_version`] with version modules and installed packages
/// looked up in the source tree at `root` and [`metadata::SITE_PACKAGES_ENV`].
///
/// # Errors
/// See [`Resolver::get_version`].
pub fn get_version(
    package: &str,
    root: &Path,
    version_module: Option<&str>,
    policy: ScmPolicy,
) -> Result<String, Error> {
    Resolver::for_source_tree(root).get_version(package, root, version_module, policy)
}

/// [`Resolver::parse_version`] with the default collaborators.
///
/// # Errors
/// See [`Resolver::parse_version`].
pub fn parse_version(root: &Path) -> Result<String, Error> {
    Resolver::default().parse_version(root)
}

/// [`Resolver::vcs_version`] with the default collaborators.
///
/// # Errors
/// See [`Resolver::vcs_version`].
pub fn vcs_version(root: &Path, on_error: OnError) -> Result<String, Error> {
    Resolver::default().vcs_version(root, on_error)
}
