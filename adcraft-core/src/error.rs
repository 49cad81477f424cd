//! Error taxonomy shared by every engine entry point.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    /// Render, storage, upstream and IO failures may succeed on a later attempt.
    /// The engine never retries them itself.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Render(_) | Self::Storage(_) | Self::Upstream(_) | Self::Io(_)
        )
    }

    /// Short machine-readable tag used by the CLI's JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::PreconditionFailed(_) => "precondition_failed",
            Self::Configuration(_) => "configuration",
            Self::Validation(_) => "validation",
            Self::InvalidState(_) => "invalid_state",
            Self::Conflict(_) => "conflict",
            Self::Render(_) => "render",
            Self::Storage(_) => "storage",
            Self::Upstream(_) => "upstream",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }
}
