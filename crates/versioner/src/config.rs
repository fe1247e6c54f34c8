//! The `[tool.versioner]` table of `pyproject.toml`.
use crate::{
    diagnostics::{FileId, Printer, Span, ToDiagnostics},
    pep440::Method,
    resolve::{OnError, ScmPolicy},
};
use std::path::{Path, PathBuf};
use toml_span as toml;

pub const PYPROJECT_TOML: &str = "pyproject.toml";

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("{message}")]
    UnexpectedType {
        message: String,
        expected: Vec<ValueKind>,
        found: ValueKind,
        span: Span,
    },
    #[error("{message}")]
    InvalidValue {
        message: String,
        expected: &'static [&'static str],
        found: String,
        span: Span,
    },
    #[error("{source}")]
    Toml {
        #[source]
        source: toml_span::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to read {path:?}")]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("invalid config {path:?}")]
    Parse {
        #[source]
        source: ParseError,
        path: PathBuf,
    },
}

mod diagnostics {
    use crate::diagnostics::ToDiagnostics;
    use codespan_reporting::diagnostic::{Diagnostic, Label};

    impl ToDiagnostics for super::ParseError {
        fn to_diagnostics<F: Copy + PartialEq>(&self, file_id: F) -> Vec<Diagnostic<F>> {
            match self {
                Self::UnexpectedType {
                    expected,
                    found,
                    span,
                    ..
                } => {
                    let expected = expected
                        .iter()
                        .map(|ty| format!("`{ty:?}`"))
                        .collect::<Vec<_>>()
                        .join(", or ");
                    let diagnostic = Diagnostic::error()
                        .with_message(self.to_string())
                        .with_labels(vec![Label::primary(file_id, span.clone())
                            .with_message(format!("expected {expected}"))])
                        .with_notes(vec![unindent::unindent(&format!(
                            "
                        expected type {expected}
                           found type `{found:?}`
                        "
                        ))]);
                    vec![diagnostic]
                }
                Self::InvalidValue {
                    message,
                    expected,
                    found,
                    span,
                } => {
                    let expected = expected
                        .iter()
                        .map(|value| format!("`{value}`"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    vec![Diagnostic::error()
                        .with_message(message.to_string())
                        .with_labels(vec![Label::primary(file_id, span.clone())
                            .with_message(format!("found `{found}`"))])
                        .with_notes(vec![format!("expected one of {expected}")])]
                }
                Self::Toml { source } => {
                    vec![source.to_diagnostic(file_id)]
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Table,
}

impl<'de> From<&toml_span::Value<'de>> for ValueKind {
    fn from(value: &toml_span::Value<'de>) -> Self {
        use toml_span::value::ValueInner;
        match value.as_ref() {
            ValueInner::String(..) => ValueKind::String,
            ValueInner::Integer(..) => ValueKind::Integer,
            ValueInner::Float(..) => ValueKind::Float,
            ValueInner::Boolean(..) => ValueKind::Boolean,
            ValueInner::Array(..) => ValueKind::Array,
            ValueInner::Table(..) => ValueKind::Table,
        }
    }
}

#[inline]
pub fn as_str<'de>(value: &'de toml::Value<'de>) -> Result<&'de str, ParseError> {
    value.as_str().ok_or_else(|| ParseError::UnexpectedType {
        message: "expected a string".to_string(),
        expected: vec![ValueKind::String],
        found: value.into(),
        span: value.span.into(),
    })
}

#[inline]
pub fn as_string<'de>(value: &'de toml::Value<'de>) -> Result<String, ParseError> {
    as_str(value).map(ToString::to_string)
}

#[inline]
pub fn as_path<'de>(value: &'de toml::Value<'de>) -> Result<PathBuf, ParseError> {
    as_str(value).map(PathBuf::from)
}

#[inline]
pub fn as_bool<'de>(value: &'de toml::Value<'de>) -> Result<bool, ParseError> {
    value.as_bool().ok_or_else(|| ParseError::UnexpectedType {
        message: "expected a boolean".to_string(),
        expected: vec![ValueKind::Boolean],
        found: value.into(),
        span: value.span.into(),
    })
}

fn as_variant<'de, T>(
    value: &'de toml::Value<'de>,
    key: &str,
    expected: &'static [&'static str],
) -> Result<T, ParseError>
where
    T: std::str::FromStr,
{
    let found = as_str(value)?;
    found.parse().map_err(|_| ParseError::InvalidValue {
        message: format!("invalid value for `{key}`"),
        expected,
        found: found.to_string(),
        span: value.span.into(),
    })
}

/// Settings of the `[tool.versioner]` table.
///
/// Every setting is optional, command line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Config {
    /// Name of the package, e.g. `natcap.versioner`.
    pub package: Option<String>,
    /// Root of the repository, relative to the config file.
    pub root: Option<PathBuf>,
    /// Name of the version module within the package.
    pub version_module: Option<String>,
    pub scm: Option<ScmPolicy>,
    pub method: Option<Method>,
    /// Append the branch to the local version label.
    pub branch: Option<bool>,
    pub on_error: Option<OnError>,
    /// Where to write the generated version module.
    pub write_to: Option<PathBuf>,
}

impl Config {
    /// Parse the `[tool.versioner]` table of a parsed `pyproject.toml`.
    ///
    /// Returns `None` if there is no such table.
    ///
    /// # Errors
    /// When a setting has the wrong type or an unknown value.
    pub fn from_pyproject_value(config: &toml::Value) -> Result<Option<Self>, ParseError> {
        let Some(config) = config
            .as_table()
            .and_then(|table| table.get("tool"))
            .and_then(|tool| tool.as_table())
            .and_then(|tool| tool.get("versioner"))
        else {
            return Ok(None);
        };

        let table = config
            .as_table()
            .ok_or_else(|| ParseError::UnexpectedType {
                message: "versioner config must be a table".to_string(),
                expected: vec![ValueKind::Table],
                found: config.into(),
                span: config.span.into(),
            })?;

        let package = table.get("package").map(as_string).transpose()?;
        let root = table.get("root").map(as_path).transpose()?;
        let version_module = table.get("version-module").map(as_string).transpose()?;
        let scm = table
            .get("scm")
            .map(|value| as_variant(value, "scm", ScmPolicy::VARIANTS))
            .transpose()?;
        let method = table
            .get("method")
            .map(|value| as_variant(value, "method", &["post", "pre"]))
            .transpose()?;
        let branch = table.get("branch").map(as_bool).transpose()?;
        let on_error = table
            .get("on-error")
            .map(|value| as_variant(value, "on-error", OnError::VARIANTS))
            .transpose()?;
        let write_to = table.get("write-to").map(as_path).transpose()?;

        Ok(Some(Self {
            package,
            root,
            version_module,
            scm,
            method,
            branch,
            on_error,
            write_to,
        }))
    }

    /// # Errors
    /// When the document is not valid TOML or the table is invalid.
    pub fn from_pyproject_toml(config: &str) -> Result<Option<Self>, ParseError> {
        let config = toml_span::parse(config).map_err(|source| ParseError::Toml { source })?;
        Self::from_pyproject_value(&config)
    }
}

/// Read the config from `pyproject.toml` in `dir`.
///
/// Parse errors are emitted to `printer` before they are returned.
///
/// # Errors
/// When the file exists but cannot be read or parsed.
pub fn find_config<W>(dir: &Path, printer: &Printer<W>) -> Result<Option<(PathBuf, Config)>, Error>
where
    W: codespan_reporting::term::termcolor::WriteColor,
{
    let path = dir.join(PYPROJECT_TOML);
    if !path.is_file() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path).map_err(|source| Error::Io {
        source,
        path: path.clone(),
    })?;
    let file_id: FileId = printer.add_source_file(&path, contents.clone());
    match Config::from_pyproject_toml(&contents) {
        Ok(config) => {
            tracing::debug!(?path, ?config, "read config");
            Ok(config.map(|config| (path, config)))
        }
        Err(source) => {
            for diagnostic in source.to_diagnostics(file_id) {
                if let Err(err) = printer.emit(&diagnostic) {
                    tracing::warn!("failed to emit diagnostic: {err}");
                }
            }
            Err(Error::Parse { source, path })
        }
    }
}
