use colored::Colorize;
use versioner::Level;

/// Prints resolver messages to stderr.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Logger {
    level: Level,
}

impl Logger {
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

impl versioner::Log for Logger {
    fn log(&self, level: Level, message: &str) {
        if level == Level::Off || level > self.level {
            return;
        }
        let prefix = match level {
            Level::Off => return,
            Level::Error => "error:".red().bold(),
            Level::Warn => "warning:".yellow().bold(),
            Level::Info => "info:".green(),
            Level::Debug => "debug:".dimmed(),
        };
        eprintln!("{prefix} {message}");
    }
}
