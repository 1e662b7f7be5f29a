//! Error types for provisioning workflows.

use std::path::PathBuf;

use thiserror::Error;

use crate::host::ToolError;

pub type ProvisionResult<T> = Result<T, ProvisionError>;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Host is not fit to provision on (privilege, RAM, disk, OS, network).
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error(transparent)]
    InvalidDomain(#[from] press_core::DomainError),

    #[error("missing required input: {0}")]
    MissingInput(&'static str),

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("site already exists: {0} (remove it first to replace it)")]
    DuplicateSite(String),

    #[error("site not found: {0}")]
    SiteNotFound(String),

    /// Leftovers of an earlier, incomplete provisioning run.
    #[error("stale state for {domain} at {path} from an incomplete run; reset it or cancel")]
    StaleSite { domain: String, path: PathBuf },

    #[error("{action} failed: {source}")]
    Tool {
        action: String,
        #[source]
        source: ToolError,
    },

    #[error(transparent)]
    State(#[from] press_state::StateError),

    #[error(transparent)]
    Render(#[from] press_render::RenderError),

    #[error(transparent)]
    Probe(#[from] press_core::ProbeError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(String),
}

impl ProvisionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProvisionError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Attach the workflow step to a tool failure.
pub(crate) trait ToolContext<T> {
    fn step(self, action: impl Into<String>) -> ProvisionResult<T>;
}

impl<T> ToolContext<T> for Result<T, ToolError> {
    fn step(self, action: impl Into<String>) -> ProvisionResult<T> {
        self.map_err(|source| ProvisionError::Tool {
            action: action.into(),
            source,
        })
    }
}
