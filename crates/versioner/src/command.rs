//! Blocking execution of external VCS tools.
//!
//! The working directory is always handed to the child process, the
//! current process' directory is never changed.
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, ExitStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

impl From<std::process::Output> for Output {
    fn from(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into(),
            stderr: String::from_utf8_lossy(&output.stderr).into(),
            status: output.status,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "`{}` failed with code {}:\n\n--- Stdout:\n {}\n--- Stderr:\n {}",
        command,
        output.status.code().unwrap_or(1),
        output.stdout,
        output.stderr
    )]
    Failed { command: String, output: Output },
}

pub fn check_exit_status(cmd: &Command, output: &std::process::Output) -> Result<(), Error> {
    if output.status.success() {
        Ok(())
    } else {
        Err(Error::Failed {
            command: format!("{cmd:?}"),
            output: output.clone().into(),
        })
    }
}

/// Run a command and fail on non-zero exit codes.
pub fn run_command(cmd: &mut Command) -> Result<Output, Error> {
    let output = cmd.output()?;
    check_exit_status(cmd, &output)?;
    Ok(output.into())
}

/// Executes VCS tool invocations against a working directory.
pub trait CommandRunner {
    /// Run `program` with `args` in `dir` and return its trimmed standard output.
    ///
    /// # Errors
    /// When the program cannot be spawned or exits unsuccessfully.
    fn run(&self, dir: &Path, program: &str, args: &[&str]) -> Result<String, Error>;
}

/// Runs commands as child processes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProcessRunner;

impl ProcessRunner {
    fn command<A>(dir: &Path, program: &str, args: &[A]) -> Command
    where
        A: AsRef<OsStr>,
    {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(dir);
        cmd
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, dir: &Path, program: &str, args: &[&str]) -> Result<String, Error> {
        let mut cmd = Self::command(dir, program, args);
        tracing::debug!(?dir, program, ?args, "run");
        let output = run_command(&mut cmd)?;
        Ok(output.stdout.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandRunner, ProcessRunner};
    use color_eyre::eyre;
    use similar_asserts::assert_eq as sim_assert_eq;

    #[test]
    fn test_missing_binary_is_io_error() {
        crate::tests::init();
        let dir = std::env::temp_dir();
        let err = ProcessRunner
            .run(&dir, "versioner-definitely-not-a-binary", &["--version"])
            .unwrap_err();
        assert!(matches!(err, super::Error::Io(_)), "{err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn test_output_is_trimmed() -> eyre::Result<()> {
        crate::tests::init();
        let dir = std::env::temp_dir();
        let output = ProcessRunner.run(&dir, "sh", &["-c", "printf 'hello\\n\\n'"])?;
        sim_assert_eq!(output, "hello");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_command_keeps_output() -> eyre::Result<()> {
        crate::tests::init();
        let dir = std::env::temp_dir();
        let err = ProcessRunner
            .run(&dir, "sh", &["-c", "echo oops >&2; exit 3"])
            .unwrap_err();
        match err {
            super::Error::Failed { output, .. } => {
                sim_assert_eq!(output.stderr.trim(), "oops");
                sim_assert_eq!(output.status.code(), Some(3));
            }
            other => panic!("unexpected error {other:?}"),
        }

        let output = ProcessRunner.run(&dir, "sh", &["-c", "echo out; echo noise >&2"])?;
        sim_assert_eq!(output, "out");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_in_given_directory() -> eyre::Result<()> {
        crate::tests::init();
        let dir = tempfile::TempDir::new()?;
        let cwd = std::env::current_dir()?;
        let output = ProcessRunner.run(dir.path(), "pwd", &[])?;
        sim_assert_eq!(
            std::path::PathBuf::from(output).canonicalize()?,
            dir.path().canonicalize()?
        );
        sim_assert_eq!(std::env::current_dir()?, cwd);
        Ok(())
    }
}
