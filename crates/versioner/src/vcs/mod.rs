pub mod archive;
pub mod git;
pub mod hg;

#[cfg(test)]
pub mod temp;

use std::path::{Path, PathBuf};

/// Sentinel reported as the latest tag of a repository without tags.
pub const NULL_TAG: &str = "null";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{operation} is not supported by this repository")]
    Unsupported { operation: &'static str },

    #[error("could not detect current branch of {path:?}")]
    BranchNotFound { path: PathBuf },

    #[error("command failed: {0}")]
    Command(#[from] crate::command::Error),

    #[error(transparent)]
    Archive(#[from] archive::Error),

    #[error("invalid tag distance {value:?}")]
    InvalidTagDistance {
        #[source]
        source: std::num::ParseIntError,
        value: String,
    },

    #[error("unexpected describe output {0:?}")]
    InvalidDescribe(String),
}

/// The tag distance, latest tag and node of the current revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Describe {
    pub tag_distance: u64,
    pub latest_tag: String,
    pub node: String,
}

impl Describe {
    /// The human readable build id, e.g. `1:0.1 [2c9e4a1f]`.
    #[must_use]
    pub fn build_id(&self) -> String {
        format!("{}:{} [{}]", self.tag_distance, self.latest_tag, self.node)
    }

    #[must_use]
    pub fn is_release(&self) -> bool {
        self.tag_distance == 0
    }
}

/// Queries the state of a repository.
///
/// Implementations override the primitives their backend supports.
/// Every primitive that is not overridden fails with [`Error::Unsupported`].
pub trait RepositoryQuerier {
    /// The path the repository was opened at.
    fn path(&self) -> &Path;

    /// Whether the repository is an exported snapshot without live VCS metadata.
    ///
    /// # Errors
    /// When the backend fails to answer.
    fn is_archive(&self) -> Result<bool, Error> {
        Ok(false)
    }

    /// Number of commits since the latest tag.
    ///
    /// # Errors
    /// When the backend fails to answer or does not support the operation.
    fn tag_distance(&self) -> Result<u64, Error> {
        Err(Error::Unsupported {
            operation: "tag_distance",
        })
    }

    /// The latest tag, or [`NULL_TAG`] if there are no tags.
    ///
    /// # Errors
    /// When the backend fails to answer or does not support the operation.
    fn latest_tag(&self) -> Result<String, Error> {
        Err(Error::Unsupported {
            operation: "latest_tag",
        })
    }

    /// The current branch.
    ///
    /// # Errors
    /// When there is no current branch or the operation is not supported.
    fn branch(&self) -> Result<String, Error> {
        Err(Error::Unsupported {
            operation: "branch",
        })
    }

    /// The short identifier of the current revision.
    ///
    /// # Errors
    /// When the backend fails to answer or does not support the operation.
    fn node(&self) -> Result<String, Error> {
        Err(Error::Unsupported { operation: "node" })
    }

    /// Tag distance, latest tag and node in one pass.
    ///
    /// # Errors
    /// When one of the primitives fails.
    fn describe(&self) -> Result<Describe, Error> {
        Ok(Describe {
            tag_distance: self.tag_distance()?,
            latest_tag: self.latest_tag()?,
            node: self.node()?,
        })
    }

    /// # Errors
    /// When the current revision cannot be described.
    fn build_id(&self) -> Result<String, Error> {
        Ok(self.describe()?.build_id())
    }

    /// The latest tag if the current revision is tagged.
    ///
    /// # Errors
    /// When the current revision cannot be described.
    fn release_version(&self) -> Result<Option<String>, Error> {
        if self.tag_distance()? == 0 {
            Ok(Some(self.latest_tag()?))
        } else {
            Ok(None)
        }
    }

    /// The release version, or the dev build id for untagged revisions.
    ///
    /// # Errors
    /// When the current revision cannot be described.
    fn version(&self) -> Result<String, Error> {
        let describe = self.describe()?;
        if describe.is_release() {
            Ok(describe.latest_tag)
        } else {
            Ok(build_dev_id(&describe.build_id()))
        }
    }

    /// # Errors
    /// When `build_id` is `None` and the current revision cannot be described.
    fn build_dev_id(&self, build_id: Option<&str>) -> Result<String, Error> {
        match build_id {
            Some(build_id) => Ok(build_dev_id(build_id)),
            None => Ok(build_dev_id(&self.build_id()?)),
        }
    }
}

impl<T> RepositoryQuerier for Box<T>
where
    T: RepositoryQuerier + ?Sized,
{
    fn path(&self) -> &Path {
        (**self).path()
    }
    fn is_archive(&self) -> Result<bool, Error> {
        (**self).is_archive()
    }
    fn tag_distance(&self) -> Result<u64, Error> {
        (**self).tag_distance()
    }
    fn latest_tag(&self) -> Result<String, Error> {
        (**self).latest_tag()
    }
    fn branch(&self) -> Result<String, Error> {
        (**self).branch()
    }
    fn node(&self) -> Result<String, Error> {
        (**self).node()
    }
    fn describe(&self) -> Result<Describe, Error> {
        (**self).describe()
    }
}

#[must_use]
pub fn build_dev_id(build_id: &str) -> String {
    format!("dev{build_id}")
}

/// Truncate `value` to at most `len` characters.
pub(crate) fn truncate(value: &str, len: usize) -> &str {
    match value.char_indices().nth(len) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// A querier that supports none of the primitives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnsupportedQuerier {
    path: PathBuf,
}

impl UnsupportedQuerier {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RepositoryQuerier for UnsupportedQuerier {
    fn path(&self) -> &Path {
        &self.path
    }
}

/// The supported version control backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Vcs {
    Git,
    Mercurial,
    MercurialArchive,
}

impl Vcs {
    /// Detect the backend for the repository rooted at `root`.
    ///
    /// Anything that is neither a mercurial archive nor a mercurial repository
    /// is assumed to be git.
    #[must_use]
    pub fn detect(root: &Path) -> Self {
        if archive::is_archive(root) {
            Self::MercurialArchive
        } else if root.join(".hg").exists() {
            Self::Mercurial
        } else {
            Self::Git
        }
    }
}

impl std::fmt::Display for Vcs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Git => write!(f, "git"),
            Self::Mercurial => write!(f, "hg"),
            Self::MercurialArchive => write!(f, "hg archive"),
        }
    }
}

/// Open the repository at `root` with the detected backend.
#[must_use]
pub fn open(root: &Path) -> Box<dyn RepositoryQuerier> {
    let vcs = Vcs::detect(root);
    tracing::debug!(?root, %vcs, "detected vcs");
    match vcs {
        Vcs::Git => Box::new(git::GitRepository::open(root)),
        Vcs::Mercurial => Box::new(hg::MercurialRepository::open(root)),
        Vcs::MercurialArchive => Box::new(archive::MercurialArchive::open(root)),
    }
}
