//! Folio Domain Layer
//!
//! Core model for the resumable batch text-extraction pipeline. This crate
//! has no infrastructure dependencies; it defines the value objects, the
//! pure decision logic, and the trait boundary the storage layer implements.
//!
//! ## Key Concepts
//!
//! - **Document**: a file known to the system, plus its extraction state
//! - **ExtractionState**: `Pending`, `ReprocessPending`, `Succeeded` or `Failed`,
//!   parsed once from its compact stored form
//! - **Session**: one run of the batch scheduler with cumulative counters
//! - **Reprocessing verdict**: whether a fresh extraction replaces stored text
//!
//! ## Architecture
//!
//! - Pure business logic only (`uuid` is the single external crate)
//! - Storage and extraction implementations live in other crates
//! - [`traits::DocumentStore`] is the seam to the storage layer

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod extraction;
pub mod reprocess;
pub mod session;
pub mod traits;

// Re-exports for convenience
pub use document::{
    Document, DocumentId, DocumentMutation, NewDocument, HAS_TEXT_TAG, HAS_TEXT_TAG_CATEGORY,
};
pub use extraction::{
    normalize_method, ExtractionState, MethodQuality, StateParseError, MAX_FAILURE_REASON_CHARS,
    UNKNOWN_METHOD,
};
pub use reprocess::{decide, ReprocessReason, ReprocessVerdict};
pub use session::{Session, SessionCounters, SessionId, SessionStatus, SessionTally};
pub use traits::{DocumentStore, ExtractionOverview, MimeTypeStats, ReprocessCriteria};
