//! Folio Batch
//!
//! Resumable batch text extraction: a background session that repeatedly
//! fetches pending documents, extracts their text through an
//! [`ExtractionAdapter`](folio_extract::ExtractionAdapter), commits results in
//! sub-batches and checkpoints its progress.
//!
//! # Overview
//!
//! - **Session guard**: at most one session runs per process ([`SessionGuard`])
//! - **Scheduler**: the fetch/extract/commit loop ([`BatchScheduler`])
//! - **Outcome classification**: success, no text, adapter error, and the
//!   reprocessing comparison ([`DocumentOutcome`])
//! - **Trigger surface**: start, stop, status, list, resume ([`BatchService`])
//!
//! # Session lifecycle
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `initialized` | Guard acquired, first checkpoint written |
//! | `processing` | Loop running |
//! | `completed` | A fetch returned no documents |
//! | `stopped` | Stop observed at a batch boundary |
//! | `failed` | Fetch, commit or checkpoint failed, or the loop panicked |
//! | `resumed` | Operator marked a terminated session as resumed |
//!
//! Resuming is implicit: a new session re-queries by extraction state, so
//! whatever a stopped or failed session left pending is picked up next time.
//!
//! # Usage
//!
//! ```no_run
//! use folio_batch::{BatchConfig, BatchService, StartRequest};
//! use folio_extract::LocalFileAdapter;
//! use folio_store::SqliteStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::new("folio.db")?;
//!     let adapter = Arc::new(LocalFileAdapter::new("/srv/documents"));
//!     let service = BatchService::new(store, adapter, BatchConfig::default())?;
//!
//!     let started = service.start(StartRequest::default())?;
//!     println!("Session {} logging to {}", started.session_id, started.log_path.display());
//!
//!     service.wait().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [batch]
//! batch_size = 10
//! commit_interval = 10
//! data_dir = "batch_processing_logs"
//! recent_log_lines = 20
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod events;
mod guard;
mod outcome;
mod scheduler;
mod service;

#[cfg(test)]
mod test_support;

pub use config::{BatchConfig, MAX_BATCH_SIZE};
pub use error::BatchError;
pub use events::ProgressEvent;
pub use guard::{GuardStatus, SessionGuard, SessionLease, StopSignal};
pub use outcome::{DocumentOutcome, UNKNOWN_METHOD};
pub use scheduler::BatchScheduler;
pub use service::{BatchService, Overview, SessionReport, StartRequest, StartedSession};
