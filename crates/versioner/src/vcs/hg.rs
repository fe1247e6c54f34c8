use crate::{
    command::{CommandRunner, ProcessRunner},
    vcs::{archive, Describe, Error, RepositoryQuerier},
};
use std::path::{Path, PathBuf};

pub const BUILD_ID_TEMPLATE: &str = "{latesttagdistance}:{latesttag} [{node|short}]";
pub const TAG_DISTANCE_TEMPLATE: &str = "{latesttagdistance}";
pub const LATEST_TAG_TEMPLATE: &str = "{latesttag}";
pub const BRANCH_TEMPLATE: &str = "{branch}";
pub const NODE_TEMPLATE: &str = "{node|short}";

/// A live mercurial repository.
///
/// The log queries run with the repository path as their working directory.
/// Mercurial searches upwards from there, so a path inside a nested
/// subdirectory resolves to the containing repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MercurialRepository<R = ProcessRunner> {
    path: PathBuf,
    runner: R,
}

impl MercurialRepository<ProcessRunner> {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_runner(path, ProcessRunner)
    }
}

impl<R> MercurialRepository<R>
where
    R: CommandRunner,
{
    pub fn with_runner(path: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            path: path.into(),
            runner,
        }
    }

    /// Render `template` for the working directory parent revision.
    fn log_template(&self, template: &str) -> Result<String, Error> {
        let template_flag = format!("--template={template}");
        let output = self.runner.run(
            &self.path,
            "hg",
            &[
                "log",
                "-r",
                ".",
                "--config",
                "ui.report_untrusted=False",
                &template_flag,
            ],
        )?;
        Ok(output)
    }
}

impl<R> RepositoryQuerier for MercurialRepository<R>
where
    R: CommandRunner,
{
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_archive(&self) -> Result<bool, Error> {
        Ok(archive::is_archive(&self.path))
    }

    fn tag_distance(&self) -> Result<u64, Error> {
        let distance = self.log_template(TAG_DISTANCE_TEMPLATE)?;
        distance
            .trim()
            .parse()
            .map_err(|source| Error::InvalidTagDistance {
                source,
                value: distance.clone(),
            })
    }

    fn latest_tag(&self) -> Result<String, Error> {
        self.log_template(LATEST_TAG_TEMPLATE)
    }

    fn branch(&self) -> Result<String, Error> {
        let branch = self.log_template(BRANCH_TEMPLATE)?;
        if branch.is_empty() {
            return Err(Error::BranchNotFound {
                path: self.path.clone(),
            });
        }
        Ok(branch)
    }

    fn node(&self) -> Result<String, Error> {
        self.log_template(NODE_TEMPLATE)
    }

    fn build_id(&self) -> Result<String, Error> {
        self.log_template(BUILD_ID_TEMPLATE)
    }

    fn describe(&self) -> Result<Describe, Error> {
        let describe = Describe {
            tag_distance: self.tag_distance()?,
            latest_tag: self.latest_tag()?,
            node: self.node()?,
        };
        tracing::debug!(?describe, path = ?self.path, "describe");
        Ok(describe)
    }
}

#[cfg(test)]
mod tests {
    use super::MercurialRepository;
    use crate::command::{CommandRunner, Error as CommandError};
    use crate::vcs::{temp, RepositoryQuerier};
    use color_eyre::eyre;
    use similar_asserts::assert_eq as sim_assert_eq;
    use std::path::Path;
    use std::sync::Mutex;

    /// Answers log queries from a fixed table and records the invocations.
    #[derive(Debug, Default)]
    struct FakeRunner {
        calls: Mutex<Vec<(std::path::PathBuf, Vec<String>)>>,
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, dir: &Path, program: &str, args: &[&str]) -> Result<String, CommandError> {
            assert_eq!(program, "hg");
            self.calls.lock().unwrap().push((
                dir.to_path_buf(),
                args.iter().map(ToString::to_string).collect(),
            ));
            let template = args
                .iter()
                .find_map(|arg| arg.strip_prefix("--template="))
                .unwrap_or_default();
            let output = match template {
                super::TAG_DISTANCE_TEMPLATE => "3",
                super::LATEST_TAG_TEMPLATE => "1.4",
                super::BRANCH_TEMPLATE => "default",
                super::NODE_TEMPLATE => "0123456789ab",
                super::BUILD_ID_TEMPLATE => "3:1.4 [0123456789ab]",
                other => panic!("unexpected template {other:?}"),
            };
            Ok(output.to_string())
        }
    }

    #[test]
    fn test_log_queries() -> eyre::Result<()> {
        crate::tests::init();
        let repo = MercurialRepository::with_runner("/repo/nested/dir", FakeRunner::default());
        sim_assert_eq!(repo.tag_distance()?, 3);
        sim_assert_eq!(repo.latest_tag()?, "1.4");
        sim_assert_eq!(repo.branch()?, "default");
        sim_assert_eq!(repo.node()?, "0123456789ab");
        sim_assert_eq!(repo.build_id()?, "3:1.4 [0123456789ab]");
        sim_assert_eq!(repo.version()?, "dev3:1.4 [0123456789ab]");

        let calls = repo.runner.calls.lock().unwrap();
        assert!(calls
            .iter()
            .all(|(dir, _)| dir == Path::new("/repo/nested/dir")));
        sim_assert_eq!(
            calls[0].1,
            vec![
                "log",
                "-r",
                ".",
                "--config",
                "ui.report_untrusted=False",
                "--template={latesttagdistance}",
            ]
        );
        Ok(())
    }

    fn sample_repo() -> eyre::Result<Option<temp::TempRepository>> {
        if !temp::has_binary("hg") {
            return Ok(None);
        }
        Ok(Some(temp::TempRepository::hg_sample()?))
    }

    #[test]
    fn test_sample_repository() -> eyre::Result<()> {
        crate::tests::init();
        let Some(repo) = sample_repo()? else {
            return Ok(());
        };
        let hg = repo.hg();
        sim_assert_eq!(hg.tag_distance()?, 1);
        sim_assert_eq!(hg.branch()?, "default");
        sim_assert_eq!(hg.latest_tag()?, "0.1");
        sim_assert_eq!(hg.node()?.len(), 12);
        assert!(!hg.is_archive()?);
        Ok(())
    }

    #[test]
    fn test_nested_directory() -> eyre::Result<()> {
        crate::tests::init();
        let Some(repo) = sample_repo()? else {
            return Ok(());
        };
        let nested = repo.path().join("a").join("b");
        std::fs::create_dir_all(&nested)?;
        let hg = MercurialRepository::open(&nested);
        sim_assert_eq!(hg.latest_tag()?, "0.1");
        sim_assert_eq!(hg.build_id()?, repo.hg().build_id()?);
        Ok(())
    }

    #[test]
    fn test_archive_parity() -> eyre::Result<()> {
        crate::tests::init();
        let Some(repo) = sample_repo()? else {
            return Ok(());
        };
        let export = tempfile::TempDir::new()?;
        let export_path = export.path().join("snapshot");
        repo.run(
            "hg",
            &["archive", "-r", ".", &export_path.to_string_lossy()],
        )?;
        let archive = crate::vcs::open(&export_path);
        assert!(archive.is_archive()?);

        let live = repo.hg();
        sim_assert_eq!(archive.version()?, live.version()?);
        sim_assert_eq!(archive.release_version()?, live.release_version()?);
        sim_assert_eq!(
            crate::pep440::format_version(&archive, false, "post")?,
            crate::pep440::format_version(&live, false, "post")?,
        );
        Ok(())
    }
}
