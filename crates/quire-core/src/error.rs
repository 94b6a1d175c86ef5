//! Error types for quire.

use thiserror::Error;

/// Result type alias using quire's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for quire operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Paper not found
    #[error("Paper not found: {0}")]
    PaperNotFound(uuid::Uuid),

    /// Source file unreadable or corrupt
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Embedding model missing or misconfigured
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// Search requested before embeddings were computed
    #[error("Paper not indexed: {0}")]
    NotIndexed(uuid::Uuid),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Lost a claim race on the job queue
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
