//! Centralized error handling for the tourism pipeline.
//!
//! Every component returns [`Result`], whose error is the closed taxonomy
//! [`PipelineError`]. The variant says *what kind* of failure happened; the
//! message says *where*. Stage failures are wrapped once more by the
//! orchestrator so the log names the stage that failed:
//!
//! ```
//! use tourism::error::PipelineError;
//!
//! let err = PipelineError::stage(
//!     "data_ingestion",
//!     PipelineError::Download("bucket not reachable".to_owned()),
//! );
//! assert_eq!(
//!     err.to_string(),
//!     "data_ingestion stage failed: Download error: bucket not reachable"
//! );
//! ```
//!
//! ## Context Extension Trait
//!
//! [`ResultExt`] adds `.context()` to any `Result` whose error converts into
//! [`PipelineError`]. The variant is preserved, only the message is prefixed:
//!
//! ```no_run
//! use tourism::error::ResultExt as _;
//!
//! fn read_raw() -> tourism::error::Result<String> {
//!     std::fs::read_to_string("raw.csv").context("Failed to read raw data")
//! }
//! ```

use std::fmt;

/// Main error type for pipeline operations.
#[derive(Debug)]
pub enum PipelineError {
    /// Missing or malformed config/schema key, unreadable config file
    Config(String),

    /// Object storage transfer failure
    Download(String),

    /// Filesystem read/write failure
    Io {
        context: String,
        source: std::io::Error,
    },

    /// Expected column absent or of the wrong type
    SchemaMismatch(String),

    /// Persisting or loading an artifact failed
    Serialization(String),

    /// Dataframe or numeric processing failure
    DataProcessing(String),

    /// A pipeline stage failed; carries the originating cause
    Stage {
        stage: String,
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Wrap an error with the name of the stage it came from.
    pub fn stage(stage: impl Into<String>, source: Self) -> Self {
        Self::Stage {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// Prefix the message with `msg`, keeping the variant.
    #[must_use]
    pub fn with_prefix(self, msg: &str) -> Self {
        match self {
            Self::Config(m) => Self::Config(format!("{msg}: {m}")),
            Self::Download(m) => Self::Download(format!("{msg}: {m}")),
            Self::Io { context, source } => Self::Io {
                context: if context.is_empty() {
                    msg.to_owned()
                } else {
                    format!("{msg}: {context}")
                },
                source,
            },
            Self::SchemaMismatch(m) => Self::SchemaMismatch(format!("{msg}: {m}")),
            Self::Serialization(m) => Self::Serialization(format!("{msg}: {m}")),
            Self::DataProcessing(m) => Self::DataProcessing(format!("{msg}: {m}")),
            Self::Stage { stage, source } => Self::Stage {
                stage,
                source: Box::new(source.with_prefix(msg)),
            },
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Download(msg) => write!(f, "Download error: {msg}"),
            Self::Io { context, source } if context.is_empty() => write!(f, "I/O error: {source}"),
            Self::Io { context, source } => write!(f, "I/O error: {context}: {source}"),
            Self::SchemaMismatch(msg) => write!(f, "Schema mismatch: {msg}"),
            Self::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Stage { stage, source } => write!(f, "{stage} stage failed: {source}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Stage { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            context: String::new(),
            source: err,
        }
    }
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        match err {
            polars::error::PolarsError::ColumnNotFound(msg) => {
                Self::SchemaMismatch(format!("column not found: {msg}"))
            }
            other => Self::DataProcessing(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {err}"))
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(format!("YAML error: {err}"))
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        Self::Download(err.to_string())
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<PipelineError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_prefix(&msg.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_prefix(&f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = PipelineError::SchemaMismatch("column 'Age' not found".to_owned());
        assert_eq!(err.to_string(), "Schema mismatch: column 'Age' not found");
    }

    #[test]
    fn test_context_keeps_variant() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file.txt",
        ));

        let err = result.context("Failed to read file").unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
        assert_eq!(err.to_string(), "I/O error: Failed to read file: file.txt");
        assert!(err.source().is_some(), "io cause should be preserved");
    }

    #[test]
    fn test_stage_wraps_cause() {
        let inner = PipelineError::Config("missing key 'target_column'".to_owned());
        let err = PipelineError::stage("data_transformation", inner);

        let source = err.source().expect("stage error carries its cause");
        assert!(source.to_string().contains("target_column"));
        assert!(err.to_string().starts_with("data_transformation stage failed"));
    }

    #[test]
    fn test_context_on_stage_prefixes_inner() {
        let err = PipelineError::stage("ingestion", PipelineError::Download("timeout".to_owned()));
        let err = err.with_prefix("run 1");
        assert_eq!(
            err.to_string(),
            "ingestion stage failed: Download error: run 1: timeout"
        );
    }
}
