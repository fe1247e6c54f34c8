//! Mercurial archives.
//!
//! `hg archive` writes a `.hg_archival.txt` file into the exported snapshot.
//! It carries the node, branch and latest tag information a live repository
//! would report.
use super::{Describe, RepositoryQuerier};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

pub const ARCHIVE_FILE_NAME: &str = ".hg_archival.txt";

/// Length of a short mercurial node.
pub const SHORT_NODE_LEN: usize = 12;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to read archive metadata {path:?}")]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("invalid archive metadata on line {line_number}: {line:?}")]
    InvalidLine { line_number: usize, line: String },
    #[error("archive metadata is missing {0:?}")]
    MissingKey(&'static str),
    #[error("invalid tag distance {value:?} in archive metadata")]
    InvalidTagDistance {
        #[source]
        source: std::num::ParseIntError,
        value: String,
    },
}

/// Parsed contents of a `.hg_archival.txt` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveMetadata {
    fields: IndexMap<String, String>,
}

impl ArchiveMetadata {
    /// Parse the flat `key: value` document.
    ///
    /// # Errors
    /// When a non-empty line has no `:` separator.
    pub fn parse(contents: &str) -> Result<Self, Error> {
        let mut fields = IndexMap::new();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once(':').ok_or_else(|| Error::InvalidLine {
                line_number: idx + 1,
                line: line.to_string(),
            })?;
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(Self { fields })
    }

    /// Read the archive metadata file inside `dir`.
    ///
    /// # Errors
    /// When the file cannot be read or parsed.
    pub fn read(dir: &Path) -> Result<Self, Error> {
        let path = dir.join(ARCHIVE_FILE_NAME);
        let contents = std::fs::read_to_string(&path).map_err(|source| Error::Io {
            source,
            path: path.clone(),
        })?;
        let metadata = Self::parse(&contents)?;
        tracing::debug!(?path, fields = ?metadata.fields, "read archive metadata");
        Ok(metadata)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    fn required(&self, key: &'static str) -> Result<&str, Error> {
        self.get(key).ok_or(Error::MissingKey(key))
    }

    /// The full node of the archived revision.
    ///
    /// # Errors
    /// When the `node` key is missing.
    pub fn node(&self) -> Result<&str, Error> {
        self.required("node")
    }

    /// # Errors
    /// When the `branch` key is missing.
    pub fn branch(&self) -> Result<&str, Error> {
        self.required("branch")
    }

    /// The latest tag.
    ///
    /// When the archived revision is itself tagged, mercurial writes `tag`
    /// instead of `latesttag`.
    ///
    /// # Errors
    /// When neither `latesttag` nor `tag` is present.
    pub fn latest_tag(&self) -> Result<&str, Error> {
        self.get("latesttag")
            .or_else(|| self.get("tag"))
            .ok_or(Error::MissingKey("latesttag"))
    }

    /// The distance to the latest tag, `0` when the archived revision is tagged.
    ///
    /// # Errors
    /// When `latesttagdistance` is not an integer.
    pub fn tag_distance(&self) -> Result<u64, Error> {
        match self.get("latesttagdistance") {
            None => Ok(0),
            Some(value) => value
                .parse()
                .map_err(|source| Error::InvalidTagDistance {
                    source,
                    value: value.to_string(),
                }),
        }
    }

    /// # Errors
    /// When one of the required fields is missing or invalid.
    pub fn describe(&self) -> Result<Describe, Error> {
        Ok(Describe {
            tag_distance: self.tag_distance()?,
            latest_tag: self.latest_tag()?.to_string(),
            node: self.node()?.to_string(),
        })
    }
}

/// Returns `true` if `dir` contains archive metadata.
#[must_use]
pub fn is_archive(dir: &Path) -> bool {
    dir.join(ARCHIVE_FILE_NAME).is_file()
}

/// An exported mercurial snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MercurialArchive {
    path: PathBuf,
}

impl MercurialArchive {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// # Errors
    /// When the archive metadata cannot be read.
    pub fn metadata(&self) -> Result<ArchiveMetadata, super::Error> {
        Ok(ArchiveMetadata::read(&self.path)?)
    }
}

impl RepositoryQuerier for MercurialArchive {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_archive(&self) -> Result<bool, super::Error> {
        Ok(is_archive(&self.path))
    }

    fn tag_distance(&self) -> Result<u64, super::Error> {
        Ok(self.metadata()?.tag_distance()?)
    }

    fn latest_tag(&self) -> Result<String, super::Error> {
        Ok(self.metadata()?.latest_tag()?.to_string())
    }

    fn branch(&self) -> Result<String, super::Error> {
        Ok(self.metadata()?.branch()?.to_string())
    }

    fn node(&self) -> Result<String, super::Error> {
        Ok(super::truncate(self.metadata()?.node()?, SHORT_NODE_LEN).to_string())
    }

    fn describe(&self) -> Result<Describe, super::Error> {
        let mut describe = self.metadata()?.describe()?;
        describe.node = super::truncate(&describe.node, SHORT_NODE_LEN).to_string();
        Ok(describe)
    }
}

#[cfg(test)]
mod tests {
    use super::{ArchiveMetadata, MercurialArchive, ARCHIVE_FILE_NAME};
    use crate::vcs::RepositoryQuerier;
    use color_eyre::eyre;
    use similar_asserts::assert_eq as sim_assert_eq;

    const NODE: &str = "4c3a1d3b2f7e9a8b6c5d4e3f2a1b0c9d8e7f6a5b";

    fn archive(contents: &str) -> eyre::Result<(tempfile::TempDir, MercurialArchive)> {
        let dir = tempfile::TempDir::new()?;
        std::fs::write(dir.path().join(ARCHIVE_FILE_NAME), contents)?;
        let archive = MercurialArchive::open(dir.path());
        Ok((dir, archive))
    }

    #[test]
    fn test_parse_archive_metadata() -> eyre::Result<()> {
        crate::tests::init();
        let metadata = ArchiveMetadata::parse(&indoc::formatdoc! {"
            repo: 9f2a1d3b2f7e9a8b6c5d4e3f2a1b0c9d8e7f6a5b
            node: {NODE}
            branch: default

            latesttag: 0.1
            latesttagdistance: 3
            changessincelatesttag: 3
        "})?;
        sim_assert_eq!(metadata.node()?, NODE);
        sim_assert_eq!(metadata.branch()?, "default");
        sim_assert_eq!(metadata.latest_tag()?, "0.1");
        sim_assert_eq!(metadata.tag_distance()?, 3);
        sim_assert_eq!(metadata.get("changessincelatesttag"), Some("3"));
        sim_assert_eq!(metadata.get("missing"), None);
        Ok(())
    }

    #[test]
    fn test_archive_at_tag_uses_tag_field() -> eyre::Result<()> {
        crate::tests::init();
        let metadata = ArchiveMetadata::parse(&indoc::formatdoc! {"
            node: {NODE}
            branch: default
            tag: 1.2.0
        "})?;
        sim_assert_eq!(metadata.latest_tag()?, "1.2.0");
        sim_assert_eq!(metadata.tag_distance()?, 0);
        Ok(())
    }

    #[test]
    fn test_invalid_archive_metadata() {
        crate::tests::init();
        let err = ArchiveMetadata::parse("node: abc\nnot a pair\n").unwrap_err();
        assert!(
            matches!(err, super::Error::InvalidLine { line_number: 2, .. }),
            "{err:?}"
        );

        let metadata = ArchiveMetadata::parse("latesttagdistance: three").unwrap();
        assert!(matches!(
            metadata.tag_distance(),
            Err(super::Error::InvalidTagDistance { .. })
        ));
        assert!(matches!(
            metadata.latest_tag(),
            Err(super::Error::MissingKey("latesttag"))
        ));
    }

    #[test]
    fn test_archive_querier() -> eyre::Result<()> {
        crate::tests::init();
        let (_dir, repo) = archive(&indoc::formatdoc! {"
            node: {NODE}
            branch: stable
            latesttag: 0.3
            latesttagdistance: 2
        "})?;
        assert!(repo.is_archive()?);
        sim_assert_eq!(repo.tag_distance()?, 2);
        sim_assert_eq!(repo.latest_tag()?, "0.3");
        sim_assert_eq!(repo.branch()?, "stable");
        sim_assert_eq!(repo.node()?, &NODE[..12]);
        sim_assert_eq!(repo.build_id()?, format!("2:0.3 [{}]", &NODE[..12]));
        sim_assert_eq!(repo.release_version()?, None);
        sim_assert_eq!(repo.version()?, format!("dev2:0.3 [{}]", &NODE[..12]));
        Ok(())
    }

    #[test]
    fn test_archive_querier_without_metadata() -> eyre::Result<()> {
        crate::tests::init();
        let dir = tempfile::TempDir::new()?;
        let repo = MercurialArchive::open(dir.path());
        assert!(!repo.is_archive()?);
        assert!(repo.latest_tag().is_err());
        Ok(())
    }
}
