//! Error types for Ragdesk.
//!
//! This module defines a unified error enum that covers every failure category
//! of the retrieval pipeline: configuration, I/O, the embedding and generation
//! collaborators, vector store persistence, and serialization.

use thiserror::Error;

/// Unified error type for Ragdesk.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding collaborator unreachable or returned a malformed response
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Generative collaborator failed during completion or streaming
    #[error("Generation error: {0}")]
    Generation(String),

    /// The persisted vector store could not be decoded
    #[error("Corrupt vector store: {0}")]
    PersistenceCorruption(String),

    /// Query and record embeddings disagree on length
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Knowledge base errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
