#![forbid(unsafe_code)]

pub mod command;
pub mod config;
pub mod diagnostics;
pub mod logging;
pub mod metadata;
pub mod module;
pub mod pep440;
pub mod platform;
pub mod resolve;
pub mod vcs;

pub use logging::{Level, Log, NoOpLogger, TracingLogger};
pub use pep440::{format_version, increment_tag, Method, Pep440Formatter};
pub use resolve::{
    get_version, is_frozen, parse_version, vcs_version, OnError, Resolver, ScmPolicy,
    UNKNOWN_VERSION,
};
pub use vcs::{RepositoryQuerier, Vcs};

#[cfg(test)]
pub mod tests {
    static INIT: std::sync::Once = std::sync::Once::new();

    /// Initialize test
    ///
    /// This ensures `color_eyre` is setup once.
    pub(crate) fn init() {
        INIT.call_once(|| {
            color_eyre::install().ok();
        });
    }
}
