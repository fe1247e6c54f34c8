//! Rendering of configuration errors with source spans.
use codespan_reporting::{diagnostic::Diagnostic, files, term};
use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock};

/// Identifier for a source file registered with a [`Printer`].
pub type FileId = usize;
/// A byte-offset span in a source file.
pub type Span = std::ops::Range<usize>;

/// Convert an item into a sequence of diagnostics associated with a file.
pub trait ToDiagnostics {
    /// Generate diagnostics for this item, tagged with `file_id`.
    fn to_diagnostics<F: Copy + PartialEq>(&self, file_id: F) -> Vec<Diagnostic<F>>;
}

/// A diagnostics printer that buffers messages for later emission.
pub type BufferedPrinter = Printer<term::termcolor::Buffer>;
/// A diagnostics printer that writes formatted messages to stderr.
pub type StderrPrinter = Printer<term::termcolor::StandardStream>;

/// Tracks source files and emits formatted diagnostics to a writer.
pub struct Printer<W> {
    writer: Mutex<W>,
    diagnostic_config: term::Config,
    files: RwLock<files::SimpleFiles<String, String>>,
}

impl<W> std::fmt::Debug for Printer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Printer").finish_non_exhaustive()
    }
}

fn diagnostic_config() -> term::Config {
    term::Config {
        styles: term::Styles::with_blue(term::termcolor::Color::Blue),
        ..term::Config::default()
    }
}

impl Default for Printer<term::termcolor::StandardStream> {
    fn default() -> Self {
        Self::stderr(None)
    }
}

impl Default for Printer<term::termcolor::Buffer> {
    fn default() -> Self {
        Self::buffered()
    }
}

impl Printer<term::termcolor::Buffer> {
    #[must_use]
    pub fn buffered() -> Self {
        Self {
            writer: Mutex::new(term::termcolor::Buffer::no_color()),
            diagnostic_config: diagnostic_config(),
            files: RwLock::new(files::SimpleFiles::new()),
        }
    }

    /// The diagnostics written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        let writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(writer.as_slice()).to_string()
    }
}

impl Printer<term::termcolor::StandardStream> {
    #[must_use]
    pub fn stderr(color_choice: Option<term::termcolor::ColorChoice>) -> Self {
        let color_choice = color_choice.unwrap_or(term::termcolor::ColorChoice::Auto);
        Self {
            writer: Mutex::new(term::termcolor::StandardStream::stderr(color_choice)),
            diagnostic_config: diagnostic_config(),
            files: RwLock::new(files::SimpleFiles::new()),
        }
    }
}

impl<W> Printer<W> {
    pub fn add_source_file(&self, path: &Path, source: String) -> FileId {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        files.add(path.to_string_lossy().to_string(), source)
    }
}

impl<W> Printer<W>
where
    W: term::termcolor::WriteColor,
{
    /// # Errors
    /// When the file of a label is unknown or writing fails.
    pub fn emit(&self, diagnostic: &Diagnostic<FileId>) -> Result<(), files::Error> {
        term::emit(
            &mut *self.writer.lock().unwrap_or_else(PoisonError::into_inner),
            &self.diagnostic_config,
            &*self.files.read().unwrap_or_else(PoisonError::into_inner),
            diagnostic,
        )
    }
}
