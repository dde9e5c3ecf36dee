//! Error types for batch operations

use folio_domain::SessionId;
use folio_store::CheckpointError;
use thiserror::Error;

/// Errors that can occur while starting, running or inspecting sessions
#[derive(Error, Debug)]
pub enum BatchError {
    /// Another session holds the guard
    #[error("A batch session is already running: {session_id}")]
    Busy {
        /// Session currently running
        session_id: SessionId,
    },

    /// Stop requested while nothing runs
    #[error("No batch session is running")]
    NotRunning,

    /// No checkpoint exists for the session
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Caller supplied an unusable parameter
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Session is still running
    #[error("Session is not terminated: {0}")]
    NotTerminal(String),

    /// Document store error
    #[error("Storage error: {0}")]
    Store(String),

    /// Checkpoint could not be read or written
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// Progress log could not be read or written
    #[error("Progress log error: {0}")]
    Log(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}

impl BatchError {
    /// Wrap a store error
    pub(crate) fn store(e: impl std::fmt::Display) -> Self {
        BatchError::Store(e.to_string())
    }
}
