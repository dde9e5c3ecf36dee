//! Adapter selection from configuration
//!
//! ```toml
//! [extractor]
//! kind = "http"
//! endpoint = "http://localhost:9000"
//! max_retries = 3
//! timeout_secs = 300
//! ```
//!
//! or
//!
//! ```toml
//! [extractor]
//! kind = "local"
//! root = "/srv/documents"
//! ```

use crate::http::DEFAULT_MAX_RETRIES;
use crate::{ExtractError, ExtractionAdapter, HttpAdapter, LocalFileAdapter};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Which extraction adapter to build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExtractorConfig {
    /// Read files below a local directory
    Local {
        /// Root directory of the file store
        root: PathBuf,
    },

    /// Call a remote extraction service
    Http {
        /// Service base URL
        endpoint: String,
        /// Attempts per file
        #[serde(default = "default_max_retries")]
        max_retries: u32,
        /// Per-request timeout; unlimited when absent
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig::Local {
            root: PathBuf::from("documents"),
        }
    }
}

impl ExtractorConfig {
    /// Build the configured adapter
    pub fn build(&self) -> Result<Arc<dyn ExtractionAdapter>, ExtractError> {
        match self {
            ExtractorConfig::Local { root } => Ok(Arc::new(LocalFileAdapter::new(root.clone()))),
            ExtractorConfig::Http {
                endpoint,
                max_retries,
                timeout_secs,
            } => {
                let adapter = match timeout_secs {
                    Some(secs) => {
                        HttpAdapter::with_timeout(endpoint.clone(), Duration::from_secs(*secs))?
                    }
                    None => HttpAdapter::new(endpoint.clone())?,
                };
                Ok(Arc::new(adapter.with_max_retries(*max_retries)))
            }
        }
    }
}
