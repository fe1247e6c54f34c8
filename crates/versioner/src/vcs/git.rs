use crate::{
    command::{CommandRunner, ProcessRunner},
    vcs::{Describe, Error, RepositoryQuerier, NULL_TAG},
};
use std::path::{Path, PathBuf};

/// Length of the node reported for git repositories.
pub const SHORT_NODE_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GitRepository<R = ProcessRunner> {
    path: PathBuf,
    runner: R,
}

impl GitRepository<ProcessRunner> {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_runner(path, ProcessRunner)
    }
}

impl<R> GitRepository<R>
where
    R: CommandRunner,
{
    pub fn with_runner(path: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            path: path.into(),
            runner,
        }
    }

    fn git(&self, args: &[&str]) -> Result<String, Error> {
        Ok(self.runner.run(&self.path, "git", args)?)
    }

    /// Number of commits reachable from the current commit.
    fn commit_count(&self) -> Result<u64, Error> {
        let count = self.git(&["rev-list", "HEAD", "--count"])?;
        count
            .trim()
            .parse()
            .map_err(|source| Error::InvalidTagDistance {
                source,
                value: count.clone(),
            })
    }

    /// Returns `true` if no tag is reachable from the current commit.
    fn has_no_reachable_tags(&self) -> bool {
        self.git(&["tag", "--merged", "HEAD"])
            .is_ok_and(|tags| tags.trim().is_empty())
    }

    /// Describe the current revision of a repository without tags.
    fn describe_untagged(&self) -> Result<Describe, Error> {
        Ok(Describe {
            tag_distance: self.commit_count()?,
            latest_tag: NULL_TAG.to_string(),
            node: self.node()?,
        })
    }

    /// Parse `<tag>-<distance>-g<hash>`.
    ///
    /// The tag may contain dashes itself, so the output is split from the right.
    fn parse_describe(&self, output: &str) -> Result<Describe, Error> {
        let invalid = || Error::InvalidDescribe(output.to_string());
        let (rest, _hash) = output.rsplit_once('-').ok_or_else(invalid)?;
        let (latest_tag, distance) = rest.rsplit_once('-').ok_or_else(invalid)?;
        if latest_tag.is_empty() {
            return Err(invalid());
        }
        let tag_distance = distance
            .parse()
            .map_err(|source| Error::InvalidTagDistance {
                source,
                value: distance.to_string(),
            })?;
        Ok(Describe {
            tag_distance,
            latest_tag: latest_tag.to_string(),
            // the describe output only contains an abbreviated hash
            node: self.node()?,
        })
    }
}

impl<R> RepositoryQuerier for GitRepository<R>
where
    R: CommandRunner,
{
    fn path(&self) -> &Path {
        &self.path
    }

    fn branch(&self) -> Result<String, Error> {
        let branches = self.git(&["branch"])?;
        branches
            .lines()
            .find_map(|line| line.strip_prefix("* "))
            .map(|branch| branch.trim().to_string())
            .ok_or_else(|| Error::BranchNotFound {
                path: self.path.clone(),
            })
    }

    /// Describe the current revision.
    ///
    /// Not cached, every call queries the repository again.
    fn describe(&self) -> Result<Describe, Error> {
        let output = match self.git(&["describe", "--tags", "--long"]) {
            Ok(output) => output,
            // the failure message is localized, so check for tags instead
            Err(Error::Command(_)) if self.has_no_reachable_tags() => {
                tracing::debug!(path = ?self.path, "no tags");
                return self.describe_untagged();
            }
            Err(err) => return Err(err),
        };
        let describe = self.parse_describe(&output)?;
        tracing::debug!(?describe, path = ?self.path, "describe");
        Ok(describe)
    }

    fn tag_distance(&self) -> Result<u64, Error> {
        Ok(self.describe()?.tag_distance)
    }

    fn latest_tag(&self) -> Result<String, Error> {
        Ok(self.describe()?.latest_tag)
    }

    fn node(&self) -> Result<String, Error> {
        let hash = self.git(&["rev-parse", "HEAD"])?;
        Ok(super::truncate(hash.trim(), SHORT_NODE_LEN).to_string())
    }

    fn is_archive(&self) -> Result<bool, Error> {
        // archives are a mercurial feature
        Ok(false)
    }
}
