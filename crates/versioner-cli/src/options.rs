use clap::Parser;
use std::path::PathBuf;
use versioner::{Method, OnError, ScmPolicy};

/// Logging flags to `#[command(flatten)]` into your CLI
#[derive(clap::Args, Debug, Clone, Copy, Default)]
pub struct Verbosity {
    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity",
        long_help = None,
    )]
    pub verbose: u8,

    #[arg(
        long,
        short = 'q',
        action = clap::ArgAction::Count,
        global = true,
        help = "Decrease logging verbosity",
        long_help = None,
        conflicts_with = "verbose",
    )]
    pub quiet: u8,
}

impl Verbosity {
    /// Messages of the resolver are shown up to this level.
    ///
    /// Errors are shown by default, `-q` silences them.
    pub fn level(&self) -> versioner::Level {
        if self.quiet > 0 {
            versioner::Level::Off
        } else {
            versioner::Level::from(self.verbose.saturating_add(1))
        }
    }
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct GetOptions {
    #[arg(help = "package to get the version of", env = "VERSIONER_PACKAGE")]
    pub package: Option<String>,

    #[arg(
        long = "version-module",
        help = "module of the package that stores the version",
        env = "VERSIONER_VERSION_MODULE"
    )]
    pub version_module: Option<String>,

    #[arg(
        long = "scm",
        help = "fall back to version control (allow, disallow, allow-when-not-frozen)",
        env = "VERSIONER_SCM"
    )]
    pub scm: Option<ScmPolicy>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct VcsOptions {
    #[arg(
        long = "on-error",
        help = "raise or return UNKNOWN when version control fails",
        env = "VERSIONER_ON_ERROR"
    )]
    pub on_error: Option<OnError>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct Pep440Options {
    #[arg(
        long = "method",
        help = "format untagged revisions as post or pre release",
        env = "VERSIONER_METHOD"
    )]
    pub method: Option<Method>,

    #[arg(
        long = "branch",
        help = "append the current branch to the local version label",
        env = "VERSIONER_BRANCH",
        action = clap::ArgAction::SetTrue,
    )]
    pub branch: Option<bool>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct StampOptions {
    #[arg(
        long = "write-to",
        help = "path of the version module to write",
        env = "VERSIONER_WRITE_TO"
    )]
    pub write_to: Option<PathBuf>,

    #[arg(
        short = 'n',
        long = "dry-run",
        help = "print the version module instead of writing it",
        env = "VERSIONER_DRY_RUN",
        action = clap::ArgAction::SetTrue,
    )]
    pub dry_run: Option<bool>,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Get the version of a package, falling back to version control
    Get(GetOptions),
    /// Get the version from release metadata or version control
    Parse,
    /// Get the post release version from version control
    Vcs(VcsOptions),
    /// Format the version control state as a PEP440 version
    Pep440(Pep440Options),
    /// Show the raw version control state
    Info,
    /// Write the version into a version module
    Stamp(StampOptions),
}

#[derive(Parser, Debug, Clone)]
#[clap(
    name = "versioner",
    version = option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"),
    about = "derive PEP440 versions from git and mercurial repositories",
    author = "romnn <contact@romnn.com>",
)]
pub struct Options {
    #[clap(
        long = "dir",
        help = "repository directory to run versioner in",
        env = "VERSIONER_DIR",
        global = true
    )]
    pub dir: Option<PathBuf>,

    #[arg(
        long = "color",
        env = "VERSIONER_COLOR",
        help = "enable or disable color",
        global = true
    )]
    pub color_choice: Option<termcolor::ColorChoice>,

    #[command(flatten)]
    pub verbosity: Verbosity,

    #[arg(
        long = "log",
        env = "VERSIONER_LOG_LEVEL",
        aliases = ["log-level"],
        help = "Log level. When using a more sophisticated logging setup using RUST_LOG environment variable, this option is overwritten.",
        global = true
    )]
    pub log_level: Option<tracing::metadata::Level>,

    #[arg(
        long = "log-format",
        env = "VERSIONER_LOG_FORMAT",
        help = "log format (json, compact or pretty)",
        global = true
    )]
    pub log_format: Option<crate::logging::LogFormat>,

    #[clap(subcommand)]
    pub command: Command,
}

#[cfg(test)]
mod tests {
    use super::{Command, Options};
    use clap::Parser;
    use versioner::{Level, Method, ScmPolicy};

    #[test]
    fn parse_get_command() {
        let options = Options::try_parse_from([
            "versioner",
            "--dir",
            "/tmp/repo",
            "-vv",
            "get",
            "natcap.versioner",
            "--scm",
            "disallow",
        ])
        .unwrap();
        assert_eq!(options.verbosity.level(), Level::Info);
        match options.command {
            Command::Get(get) => {
                assert_eq!(get.package.as_deref(), Some("natcap.versioner"));
                assert_eq!(get.scm, Some(ScmPolicy::Disallow));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parse_pep440_command() {
        let options =
            Options::try_parse_from(["versioner", "pep440", "--method", "pre", "--branch", "-q"])
                .unwrap();
        assert_eq!(options.verbosity.level(), Level::Off);
        match options.command {
            Command::Pep440(pep440) => {
                assert_eq!(pep440.method, Some(Method::Pre));
                assert_eq!(pep440.branch, Some(true));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Options::try_parse_from(["versioner", "pep440", "--method", "dev"]).is_err());
    }
}
