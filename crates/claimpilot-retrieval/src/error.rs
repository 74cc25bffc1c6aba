//! Error types for the retrieval crate.

use claimpilot_llm::LlmError;
use thiserror::Error;

/// Errors that can occur while indexing or querying policy sections.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Database connection or operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The embedder failed to produce a vector.
    #[error("Embedding error: {0}")]
    Embedding(#[from] LlmError),

    /// A vector's size does not match the index.
    #[error("Embedding dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Invalid data or state.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A blocking task or lock failed.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;
