//! Error types for the pressgrid state files.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for state file operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while reading or writing state files.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("site already registered: {0}")]
    DuplicateDomain(String),

    #[error("site not found: {0}")]
    NotFound(String),

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl StateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StateError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        StateError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
