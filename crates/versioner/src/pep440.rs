//! PEP440 formatting of repository state.
//!
//! A revision that is tagged formats as the tag itself.
//! Any other revision formats as `<tag>.<method><distance>+n<node>`,
//! optionally followed by `-<branch>`.
use crate::vcs::{self, archive::ArchiveMetadata, Describe, RepositoryQuerier};

/// Number of node characters in the local version label.
pub const NODE_LEN: usize = 8;

/// Tags that mean "never tagged" and count as `0.0.0`.
const UNTAGGED: [&str; 2] = [vcs::NULL_TAG, "None"];

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("versioning method {0:?} is not valid, expected one of `post` or `pre`")]
    InvalidMethod(String),
    #[error(transparent)]
    Vcs(#[from] vcs::Error),
}

/// How untagged revisions are formatted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    /// A post-release of the latest tag.
    #[default]
    Post,
    /// A pre-release of the tag following the latest tag.
    Pre,
}

impl Method {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Pre => "pre",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(Self::Post),
            "pre" => Ok(Self::Pre),
            other => Err(Error::InvalidMethod(other.to_string())),
        }
    }
}

/// The repository state that goes into a version string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VersionData {
    pub describe: Describe,
    pub branch: Option<String>,
}

impl VersionData {
    /// Gather the data from `repo`, or from its archive metadata if it is an archive.
    ///
    /// # Errors
    /// When the repository cannot be queried.
    pub fn gather<Q>(repo: &Q, include_branch: bool) -> Result<Self, vcs::Error>
    where
        Q: RepositoryQuerier + ?Sized,
    {
        let (mut describe, branch) = if repo.is_archive()? {
            let metadata = ArchiveMetadata::read(repo.path())?;
            let branch = if include_branch {
                Some(metadata.branch()?.to_string())
            } else {
                None
            };
            (metadata.describe()?, branch)
        } else {
            let branch = if include_branch {
                Some(repo.branch()?)
            } else {
                None
            };
            (repo.describe()?, branch)
        };
        describe.node = vcs::truncate(&describe.node, NODE_LEN).to_string();
        Ok(Self { describe, branch })
    }
}

/// Formats repository state as a PEP440 version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Pep440Formatter {
    /// Append the current branch to the local version label.
    pub branch: bool,
    pub method: Method,
}

impl Pep440Formatter {
    #[must_use]
    pub fn new(branch: bool, method: Method) -> Self {
        Self { branch, method }
    }

    /// # Errors
    /// When the repository cannot be queried.
    pub fn format<Q>(&self, repo: &Q) -> Result<String, Error>
    where
        Q: RepositoryQuerier + ?Sized,
    {
        let data = VersionData::gather(repo, self.branch)?;
        Ok(self.format_data(&data))
    }

    #[must_use]
    pub fn format_data(&self, data: &VersionData) -> String {
        let Describe {
            tag_distance,
            latest_tag,
            node,
        } = &data.describe;

        // at a tag, the version is the tag
        if *tag_distance == 0 {
            return latest_tag.clone();
        }

        let tag = match self.method {
            Method::Post => latest_tag.clone(),
            Method::Pre => increment_tag(latest_tag),
        };
        let mut version = format!("{tag}.{}{tag_distance}+n{node}", self.method);
        if let Some(branch) = &data.branch {
            version.push('-');
            version.push_str(branch);
        }
        version
    }
}

/// Format the version of `repo` with a method given by name.
///
/// # Errors
/// When `method` is neither `post` nor `pre`, or the repository cannot be queried.
pub fn format_version<Q>(repo: &Q, branch: bool, method: &str) -> Result<String, Error>
where
    Q: RepositoryQuerier + ?Sized,
{
    let method = method.parse()?;
    Pep440Formatter::new(branch, method).format(repo)
}

fn parse_components(tag: &str) -> Vec<String> {
    if UNTAGGED.contains(&tag) {
        vec!["0".to_string(); 3]
    } else {
        tag.split('.').map(ToString::to_string).collect()
    }
}

fn bump(component: &str) -> Option<String> {
    component
        .parse::<u64>()
        .ok()
        .and_then(|value| value.checked_add(1))
        .map(|value| value.to_string())
}

/// Increment a tag.
///
/// For `<tag>.dev<rest>` the second to last component of the tag is incremented,
/// the last one is reset to zero, and `.dev<rest>` is kept.
/// A plain tag has its last component incremented.
///
/// Inputs that cannot be incremented are returned unchanged.
#[must_use]
pub fn increment_tag(version: &str) -> String {
    if let Some((tag, dev)) = version.split_once(".dev") {
        let mut components = parse_components(tag);
        let len = components.len();
        if len < 2 {
            return version.to_string();
        }
        let Some(bumped) = bump(&components[len - 2]) else {
            return version.to_string();
        };
        components[len - 2] = bumped;
        components[len - 1] = "0".to_string();
        return format!("{}.dev{dev}", components.join("."));
    }

    let mut components = parse_components(version);
    let Some(last) = components.last_mut() else {
        return version.to_string();
    };
    match bump(last) {
        Some(bumped) => {
            *last = bumped;
            components.join(".")
        }
        None => version.to_string(),
    }
}
