use color_eyre::eyre;
use termcolor::ColorChoice;
use tracing::metadata::Level;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Compact,
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = eyre::Report;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "compact" | "pretty-compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            other => Err(eyre::eyre!("unknown log format: {other:?}")),
        }
    }
}

/// Whether to use colored output for `color_choice`.
pub fn use_color(color_choice: ColorChoice) -> bool {
    match color_choice {
        ColorChoice::Always | ColorChoice::AlwaysAnsi => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            use std::io::IsTerminal;
            std::io::stderr().is_terminal()
        }
    }
}

/// Filter from a `RUST_LOG` directive, or events of this crate up to `log_level`.
///
/// An invalid directive is reported and ignored.
fn env_filter(directive: Option<&str>, log_level: Option<Level>) -> eyre::Result<EnvFilter> {
    if let Some(directive) = directive {
        match EnvFilter::try_new(directive) {
            Ok(filter) => return Ok(filter),
            Err(err) => eprintln!("ignoring invalid log filter {directive:?}: {err}"),
        }
    }
    let level = log_level.unwrap_or(Level::WARN);
    let directive = format!("off,versioner={}", level.as_str().to_ascii_lowercase());
    Ok(EnvFilter::try_new(directive)?)
}

/// Install the global tracing subscriber.
///
/// Events are written to stderr, stdout only carries the version.
/// Returns whether colors are used.
///
/// # Errors
/// If the global tracing subscriber cannot be installed.
pub fn setup(
    log_level: Option<Level>,
    log_format: Option<LogFormat>,
    color_choice: ColorChoice,
) -> eyre::Result<bool> {
    let use_color = use_color(color_choice);
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = env_filter(rust_log.as_deref(), log_level)?;

    let fmt = tracing_subscriber::fmt::layer()
        .without_time()
        .with_writer(std::io::stderr);
    let layer = match log_format.unwrap_or_default() {
        LogFormat::Json => fmt.json().boxed(),
        LogFormat::Compact => fmt.compact().with_ansi(use_color).boxed(),
        LogFormat::Pretty => fmt.pretty().with_ansi(use_color).boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(layer).with(filter);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(use_color)
}

#[cfg(test)]
mod tests {
    use super::{env_filter, LogFormat};
    use tracing::metadata::Level;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn parse_log_format() {
        assert_eq!("JSON".parse::<LogFormat>().ok(), Some(LogFormat::Json));
        assert_eq!(
            "pretty-compact".parse::<LogFormat>().ok(),
            Some(LogFormat::Compact)
        );
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn filter_defaults_to_warnings() {
        let filter = env_filter(None, None).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));

        let filter = env_filter(None, Some(Level::DEBUG)).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn filter_from_rust_log() {
        let filter = env_filter(Some("trace"), Some(Level::ERROR)).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));

        let filter = env_filter(Some("versioner=loud"), Some(Level::INFO)).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }
}
