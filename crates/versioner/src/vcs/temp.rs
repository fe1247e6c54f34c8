use crate::command::run_command;
use crate::vcs::{git::GitRepository, hg::MercurialRepository};
use color_eyre::eyre;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn random_string_of_length(length: usize) -> String {
    use rand::{distributions::Alphanumeric, Rng};
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Returns `true` if `program` can be executed.
pub fn has_binary(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

/// A throw-away repository that is removed on drop.
pub struct TempRepository {
    dir: TempDir,
    scratch_file: PathBuf,
}

impl TempRepository {
    fn new() -> eyre::Result<Self> {
        let dir = TempDir::with_prefix(random_string_of_length(10))?;
        let scratch_file = dir.path().join("scratchfile");
        Ok(Self { dir, scratch_file })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git(&self) -> GitRepository {
        GitRepository::open(self.path())
    }

    pub fn hg(&self) -> MercurialRepository {
        MercurialRepository::open(self.path())
    }

    /// Run `program` with `args` inside the repository.
    pub fn run(&self, program: &str, args: &[&str]) -> eyre::Result<String> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(self.path());
        let output = run_command(&mut cmd)?;
        Ok(output.stdout)
    }

    fn append(&self, line: &str) -> eyre::Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.scratch_file)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// An empty git repository on branch `master` without commits.
    pub fn init_git() -> eyre::Result<Self> {
        let repo = Self::new()?;
        repo.run("git", &["init", "--quiet"])?;
        repo.run("git", &["symbolic-ref", "HEAD", "refs/heads/master"])?;
        Ok(repo)
    }

    /// Append a line to the scratch file and commit it.
    pub fn commit(&self, message: &str) -> eyre::Result<()> {
        self.append(message)?;
        if self.path().join(".hg").exists() {
            self.run(
                "hg",
                &["commit", "--addremove", "-u", "Example Name <name@example.com>", "-m", message],
            )?;
        } else {
            self.run("git", &["add", "scratchfile"])?;
            self.run(
                "git",
                &[
                    "-c",
                    "user.name=Example Name",
                    "-c",
                    "user.email=name@example.com",
                    "-c",
                    "commit.gpgsign=false",
                    "commit",
                    "--quiet",
                    "-m",
                    message,
                ],
            )?;
        }
        Ok(())
    }

    /// A git repository with four commits, optionally tagged `0.1`, and one more commit.
    pub fn git_sample(tag: bool) -> eyre::Result<Self> {
        let repo = Self::init_git()?;
        for message in ["initial commit", "adding foo", "adding bar", "adding baz"] {
            repo.commit(message)?;
        }
        if tag {
            repo.run("git", &["-c", "tag.gpgsign=false", "tag", "0.1"])?;
        }
        repo.commit("adding example")?;
        Ok(repo)
    }

    /// An empty mercurial repository.
    pub fn init_hg() -> eyre::Result<Self> {
        let repo = Self::new()?;
        repo.run("hg", &["init"])?;
        Ok(repo)
    }

    /// A mercurial repository with four commits and the tag `0.1`.
    ///
    /// Tagging in mercurial creates a commit itself, so the tag distance is 1.
    pub fn hg_sample() -> eyre::Result<Self> {
        let repo = Self::init_hg()?;
        for message in ["initial commit", "adding foo", "adding bar", "adding baz"] {
            repo.commit(message)?;
        }
        repo.run(
            "hg",
            &["tag", "-u", "Example Name <name@example.com>", "0.1"],
        )?;
        Ok(repo)
    }
}
