//! Configuration for batch sessions

use crate::BatchError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Largest batch size accepted from a caller
pub const MAX_BATCH_SIZE: usize = 500;

/// Configuration for the batch scheduler and its trigger surface
///
/// # Examples
///
/// ```
/// use folio_batch::BatchConfig;
///
/// let config = BatchConfig::default();
/// assert_eq!(config.batch_size, 10);
/// assert_eq!(config.commit_interval, 10);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Documents fetched per batch when the caller does not say otherwise
    /// Default: 10
    pub batch_size: usize,

    /// Commit after this many documents within a batch
    /// A commit always happens at batch end as well.
    /// Default: 10
    pub commit_interval: usize,

    /// Directory holding one `session_<id>` folder per session
    /// Default: `batch_processing_logs`
    pub data_dir: PathBuf,

    /// Log lines included in a session report
    /// Default: 20
    pub recent_log_lines: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            commit_interval: 10,
            data_dir: PathBuf::from("batch_processing_logs"),
            recent_log_lines: 20,
        }
    }
}

impl BatchConfig {
    /// Default configuration writing checkpoints below `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Check that the values can drive a session
    pub fn validate(&self) -> Result<(), BatchError> {
        validate_batch_size(self.batch_size).map_err(BatchError::Config)?;
        if self.commit_interval == 0 {
            return Err(BatchError::Config("commit_interval must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Check a batch size against the accepted range
pub(crate) fn validate_batch_size(batch_size: usize) -> Result<(), String> {
    if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
        return Err(format!(
            "batch size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, batch_size
        ));
    }
    Ok(())
}
