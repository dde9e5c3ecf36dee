//! Remote extraction service adapter
//!
//! Sends `POST {endpoint}/extract` with `{"fileId": "..."}` and expects
//! `{"text": "...", "method": "..."}` back; both fields may be null.
//!
//! # Features
//!
//! - Retry with exponential backoff on network errors and 5xx responses
//! - 404 maps to [`ExtractError::NotFound`], other 4xx are not retried
//! - Optional client timeout (none by default)
//!
//! # Examples
//!
//! ```no_run
//! use folio_extract::HttpAdapter;
//!
//! let adapter = HttpAdapter::new("http://localhost:9000")
//!     .unwrap()
//!     .with_max_retries(5);
//! ```

use crate::{ExtractError, Extraction, ExtractionAdapter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of attempts per file
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay before the second attempt; doubles after each further failure
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Adapter calling a remote extraction service
#[derive(Debug, Clone)]
pub struct HttpAdapter {
    endpoint: String,
    client: reqwest::Client,
    max_retries: u32,
    backoff: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractRequest<'a> {
    file_id: &'a str,
}

#[derive(Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    method: Option<String>,
}

impl HttpAdapter {
    /// Create an adapter for `endpoint` without a request timeout
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ExtractError> {
        Self::build(endpoint.into(), None)
    }

    /// Create an adapter whose requests give up after `timeout`
    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ExtractError> {
        Self::build(endpoint.into(), Some(timeout))
    }

    fn build(endpoint: String, timeout: Option<Duration>) -> Result<Self, ExtractError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ExtractError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_BACKOFF,
        })
    }

    /// Set the maximum number of attempts (at least one is always made)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the initial retry delay
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Service endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn attempt(&self, url: &str, file_id: &str) -> Result<Extraction, Attempt> {
        let response = self
            .client
            .post(url)
            .json(&ExtractRequest { file_id })
            .send()
            .await
            .map_err(|e| {
                Attempt::Retry(ExtractError::Communication(format!("Request failed: {}", e)))
            })?;

        let status = response.status();
        if status.is_success() {
            let body = response.json::<ExtractResponse>().await.map_err(|e| {
                let message = format!("Failed to parse response: {}", e);
                Attempt::Fatal(ExtractError::InvalidResponse(message))
            })?;
            return Ok(Extraction {
                text: body.text,
                method: body.method,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Attempt::Fatal(ExtractError::NotFound(file_id.to_string())));
        }

        let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let message = format!("HTTP {}: {}", status, message);
            Err(Attempt::Retry(ExtractError::Communication(message)))
        } else {
            Err(Attempt::Fatal(ExtractError::Rejected {
                status: status.as_u16(),
                message,
            }))
        }
    }
}

enum Attempt {
    Retry(ExtractError),
    Fatal(ExtractError),
}

#[async_trait]
impl ExtractionAdapter for HttpAdapter {
    fn name(&self) -> &str {
        "http"
    }

    async fn extract(&self, external_file_id: &str) -> Result<Extraction, ExtractError> {
        let url = format!("{}/extract", self.endpoint);
        let mut attempts = 0;

        loop {
            let error = match self.attempt(&url, external_file_id).await {
                Ok(extraction) => return Ok(extraction),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retry(e)) => e,
            };

            attempts += 1;
            if attempts >= self.max_retries {
                return Err(error);
            }

            // 1x, 2x, 4x, ... the base delay
            let delay = self.backoff * 2u32.saturating_pow(attempts - 1);
            tracing::debug!(
                "Extraction of {} failed ({}), retrying in {:?}",
                external_file_id,
                error,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}
