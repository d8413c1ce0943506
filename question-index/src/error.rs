//! Error types for question-index

use thiserror::Error;

/// Errors that can occur while loading, embedding or searching questions
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Vector index API returned a non-success status
    #[error("Index API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Dataset parsing error (csv)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Download answered with a non-success status
    #[error("Failed to download {url}: HTTP {status}")]
    Download { url: String, status: u16 },

    /// Model loading error
    #[error("Model error: {0}")]
    Model(String),

    /// Embedding generation error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector length does not match the index
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Dataset content error
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Vector index error
    #[error("Index error: {0}")]
    Index(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl SearchError {
    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create an embedding error
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create a dataset error
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    /// Create an index error
    pub fn index(msg: impl Into<String>) -> Self {
        Self::Index(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether the failure came from a remote collaborator (index API, HTTP, model)
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Api { .. }
                | Self::Download { .. }
                | Self::Index(_)
                | Self::Embedding(_)
                | Self::Model(_)
        )
    }
}

/// Result type for question-index operations
pub type Result<T> = std::result::Result<T, SearchError>;
