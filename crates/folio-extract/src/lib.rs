//! Folio Extraction Adapters
//!
//! The batch scheduler never extracts text itself. It hands each document's
//! external file id to an [`ExtractionAdapter`] and classifies what comes
//! back. "No text found" is a normal result (`text: None`); an `Err` is
//! reserved for adapter-level failures such as an unreachable service.
//!
//! # Adapters
//!
//! - [`MockAdapter`]: scripted, deterministic results for tests
//! - [`LocalFileAdapter`]: reads text files from a local directory tree
//! - [`HttpAdapter`]: calls a remote extraction service
//!
//! # Examples
//!
//! ```
//! use folio_extract::{ExtractionAdapter, MockAdapter};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut adapter = MockAdapter::new("default text", "plain_text");
//!     adapter.add_error("broken", "Access denied");
//!
//!     let ok = adapter.extract("anything").await.unwrap();
//!     assert_eq!(ok.text.as_deref(), Some("default text"));
//!     assert!(adapter.extract("broken").await.is_err());
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod http;
pub mod local;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub use config::ExtractorConfig;
pub use http::HttpAdapter;
pub use local::LocalFileAdapter;

/// Errors that can occur during extraction
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Response could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The file does not exist in the file store
    #[error("File not found: {0}")]
    NotFound(String),

    /// The file id cannot be served by this adapter
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The service refused the request
    #[error("Rejected with HTTP {status}: {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Local I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Adapter could not be constructed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic error
    #[error("Extraction error: {0}")]
    Other(String),
}

impl ExtractError {
    /// Underlying message without the category prefix
    ///
    /// This is what gets persisted as a failure reason, so the stored
    /// text reads the same whatever the adapter's error category was.
    pub fn message(&self) -> String {
        match self {
            Self::Communication(m)
            | Self::InvalidResponse(m)
            | Self::InvalidRequest(m)
            | Self::Configuration(m)
            | Self::Other(m) => m.clone(),
            Self::NotFound(id) => format!("File not found: {}", id),
            Self::Rejected { status, message } => format!("HTTP {}: {}", status, message),
            Self::Io(e) => e.to_string(),
        }
    }
}

/// Result of one extraction call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Extracted text, if any was found
    pub text: Option<String>,

    /// Label of the method that produced the text (e.g. `improved_pdfpig`)
    pub method: Option<String>,
}

impl Extraction {
    /// Text found by `method`
    pub fn found(text: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            method: Some(method.into()),
        }
    }

    /// Nothing found
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the result carries non-blank text
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// Trait for turning an external file into text
#[async_trait]
pub trait ExtractionAdapter: Send + Sync {
    /// Short adapter name for logs
    fn name(&self) -> &str;

    /// Extract text from the file identified by `external_file_id`
    async fn extract(&self, external_file_id: &str) -> Result<Extraction, ExtractError>;
}

#[derive(Debug, Clone)]
enum MockResponse {
    Found { text: String, method: String },
    Empty,
    Error(String),
}

/// Mock adapter for deterministic testing
///
/// Returns pre-configured results without touching any file store. Clones
/// share responses and the call log.
#[derive(Debug, Clone)]
pub struct MockAdapter {
    default_response: MockResponse,
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockAdapter {
    /// Adapter returning `text` via `method` for every file not configured otherwise
    pub fn new(text: impl Into<String>, method: impl Into<String>) -> Self {
        Self::with_default(MockResponse::Found {
            text: text.into(),
            method: method.into(),
        })
    }

    /// Adapter returning no text unless configured otherwise
    pub fn empty() -> Self {
        Self::with_default(MockResponse::Empty)
    }

    fn with_default(default_response: MockResponse) -> Self {
        Self {
            default_response,
            responses: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return `text` via `method` for one file
    pub fn add_text(
        &mut self,
        file_id: impl Into<String>,
        text: impl Into<String>,
        method: impl Into<String>,
    ) {
        lock(&self.responses).insert(
            file_id.into(),
            MockResponse::Found {
                text: text.into(),
                method: method.into(),
            },
        );
    }

    /// Return no text for one file
    pub fn add_empty(&mut self, file_id: impl Into<String>) {
        lock(&self.responses).insert(file_id.into(), MockResponse::Empty);
    }

    /// Fail with `message` for one file
    pub fn add_error(&mut self, file_id: impl Into<String>, message: impl Into<String>) {
        lock(&self.responses).insert(file_id.into(), MockResponse::Error(message.into()));
    }

    /// Number of extract calls so far
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// File ids passed to extract, in call order
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Forget recorded calls
    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new("Default mock text", "plain_text")
    }
}

#[async_trait]
impl ExtractionAdapter for MockAdapter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn extract(&self, external_file_id: &str) -> Result<Extraction, ExtractError> {
        lock(&self.calls).push(external_file_id.to_string());

        let response = lock(&self.responses)
            .get(external_file_id)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone());

        match response {
            MockResponse::Found { text, method } => Ok(Extraction::found(text, method)),
            MockResponse::Empty => Ok(Extraction::empty()),
            MockResponse::Error(message) => Err(ExtractError::Other(message)),
        }
    }
}
