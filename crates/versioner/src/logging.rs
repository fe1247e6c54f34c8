//! Injected logging for the version resolution chain.
//!
//! Resolution does not talk to a global logger with a fixed threshold.
//! Callers hand in a [`Log`] implementation, which defaults to errors only.

/// Severity of a log message.
///
/// Lower values are more severe, a logger with threshold `Warn` also emits `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    /// No logs will be emitted.
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl Default for Level {
    fn default() -> Self {
        Self::Error
    }
}

impl From<u8> for Level {
    fn from(value: u8) -> Self {
        match value {
            0 => Level::Off,
            1 => Level::Error,
            2 => Level::Warn,
            3 => Level::Info,
            _ => Level::Debug,
        }
    }
}

/// Abstraction for logger implementations.
pub trait Log {
    /// Log a message if `level` is within the configured threshold.
    fn log(&self, level: Level, message: &str);
}

impl<T> Log for &T
where
    T: Log + ?Sized,
{
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message);
    }
}

/// A no-op logger implementation.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoOpLogger {}

impl Log for NoOpLogger {
    fn log(&self, _: Level, _: &str) {}
}

/// A `tracing` based logger implementation.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TracingLogger {
    /// The maximum level.
    ///
    /// Only messages with lower or equal level will be logged.
    level: Level,
}

impl TracingLogger {
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }
}

impl Log for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        if level == Level::Off || level > self.level {
            return;
        }
        match level {
            Level::Off => {}
            Level::Error => tracing::error!("{message}"),
            Level::Warn => tracing::warn!("{message}"),
            Level::Info => tracing::info!("{message}"),
            Level::Debug => tracing::debug!("{message}"),
        }
    }
}
