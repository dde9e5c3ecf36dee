//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Batch service error
    #[error("{0}")]
    Batch(#[from] folio_batch::BatchError),

    /// Database error
    #[error("Storage error: {0}")]
    Store(#[from] folio_store::StoreError),

    /// Extraction adapter could not be built
    #[error("Extractor error: {0}")]
    Extractor(#[from] folio_extract::ExtractError),

    /// Walking the source directory failed
    #[error("Import error: {0}")]
    Walk(#[from] walkdir::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The session ran but ended in `failed`
    #[error("Session {session_id} failed: {message}")]
    SessionFailed {
        /// Session id
        session_id: String,
        /// Fatal error recorded in the checkpoint
        message: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
