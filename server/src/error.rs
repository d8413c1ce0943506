//! Error types for the question search server.

use question_index::SearchError;
use thiserror::Error;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Request body too large (limit {limit} bytes)")]
    PayloadTooLarge { limit: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// HTTP status for this error when it ends a request.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidParameter { .. } => 400,
            ServerError::PayloadTooLarge { .. } => 413,
            ServerError::Search(e) if e.is_upstream() => 502,
            _ => 500,
        }
    }

    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ServerError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Task(err.to_string())
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
