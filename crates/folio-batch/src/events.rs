//! Progress log messages
//!
//! Every line the scheduler writes to a session's progress log is one
//! [`ProgressEvent`]; the `Display` impl is the on-disk wording.

use folio_domain::{DocumentId, ReprocessReason, SessionId, SessionStatus};
use std::fmt;

/// One progress log entry
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Session began
    SessionStarted {
        /// Session id
        session_id: SessionId,
    },

    /// Parameters of the run
    RunParameters {
        /// Documents per batch
        batch_size: usize,
        /// Documents per sub-batch commit
        commit_interval: usize,
        /// MIME type filter
        mime_type_filter: Option<String>,
        /// Selectable documents at start
        pending: u64,
        /// All documents matching the filter
        total: u64,
    },

    /// A batch was fetched
    BatchStarted {
        /// Batch number, from 1
        number: u64,
        /// Documents in the batch
        size: usize,
        /// MIME type filter
        mime_type_filter: Option<String>,
    },

    /// Text extracted and stored
    Extracted {
        /// Document
        id: DocumentId,
        /// Document name
        name: String,
        /// Characters extracted
        length: usize,
        /// Method label
        method: String,
    },

    /// The adapter found no text
    NoText {
        /// Document
        id: DocumentId,
        /// Document name
        name: String,
    },

    /// The adapter failed
    Error {
        /// Document
        id: DocumentId,
        /// Document name
        name: String,
        /// Error text
        message: String,
    },

    /// Reprocessing replaced the stored text
    ReprocessUpgraded {
        /// Document
        id: DocumentId,
        /// Document name
        name: String,
        /// Length of the replaced text
        prior_length: usize,
        /// Length of the new text
        new_length: usize,
        /// Method of the new text
        method: String,
        /// Deciding rule
        reason: ReprocessReason,
    },

    /// Reprocessing kept the stored text
    ReprocessKept {
        /// Document
        id: DocumentId,
        /// Document name
        name: String,
        /// Length of the kept text
        prior_length: usize,
        /// Length of the rejected text
        new_length: usize,
        /// Deciding rule
        reason: ReprocessReason,
    },

    /// Reprocessing produced nothing usable; stored text kept
    ReprocessFailed {
        /// Document
        id: DocumentId,
        /// Document name
        name: String,
        /// What went wrong
        message: String,
    },

    /// Sub-batch commit inside a batch
    PartialCommit {
        /// Documents of the batch committed so far
        processed: usize,
        /// Documents in the batch
        batch_size: usize,
    },

    /// Final commit of a batch
    BatchCommitted {
        /// Batch number
        number: u64,
        /// Successes in the batch
        success: u64,
        /// Failures in the batch
        errors: u64,
    },

    /// Documents still selectable after a batch
    Remaining {
        /// Count
        count: u64,
    },

    /// Nothing left to fetch
    NoMoreDocuments,

    /// Stop flag seen at a batch boundary
    StopObserved,

    /// Fatal error ending the session
    Fatal {
        /// Error text
        message: String,
    },

    /// Session reached its end status
    SessionEnded {
        /// End status
        status: SessionStatus,
    },

    /// Final counters
    Summary {
        /// Documents committed
        processed: u64,
        /// Successes
        success: u64,
        /// Failures
        errors: u64,
    },

    /// Operator marked the session resumed
    SessionResumed {
        /// Session id
        session_id: SessionId,
    },
}

fn filter_label(filter: &Option<String>) -> &str {
    filter.as_deref().unwrap_or("all types")
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionStarted { session_id } => write!(f, "SESSION STARTED: {}", session_id),
            Self::RunParameters {
                batch_size,
                commit_interval,
                mime_type_filter,
                pending,
                total,
            } => write!(
                f,
                "Parameters: batch size {}, commit every {}, MIME filter {}; \
                 {} of {} documents pending",
                batch_size,
                commit_interval,
                filter_label(mime_type_filter),
                pending,
                total
            ),
            Self::BatchStarted {
                number,
                size,
                mime_type_filter,
            } => write!(
                f,
                "--- Batch {}: {} documents ({}) ---",
                number,
                size,
                filter_label(mime_type_filter)
            ),
            Self::Extracted {
                id,
                name,
                length,
                method,
            } => write!(f, "SUCCESS: Doc {} ({}) - {} chars via {}", id, name, length, method),
            Self::NoText { id, name } => {
                write!(f, "FAILED: Doc {} ({}) - No text extracted", id, name)
            }
            Self::Error { id, name, message } => {
                write!(f, "ERROR: Doc {} ({}) - {}", id, name, message)
            }
            Self::ReprocessUpgraded {
                id,
                name,
                prior_length,
                new_length,
                method,
                reason,
            } => write!(
                f,
                "REPROCESS UPGRADED: Doc {} ({}) - {} -> {} chars via {} ({})",
                id, name, prior_length, new_length, method, reason
            ),
            Self::ReprocessKept {
                id,
                name,
                prior_length,
                new_length,
                reason,
            } => write!(
                f,
                "REPROCESS KEPT: Doc {} ({}) - kept {} chars over {} ({})",
                id, name, prior_length, new_length, reason
            ),
            Self::ReprocessFailed { id, name, message } => {
                write!(
                    f,
                    "REPROCESS FAILED: Doc {} ({}) - {}; existing text kept",
                    id, name, message
                )
            }
            Self::PartialCommit { processed, batch_size } => {
                write!(f, "Progress saved ({}/{})", processed, batch_size)
            }
            Self::BatchCommitted { number, success, errors } => write!(
                f,
                "Batch {} committed: {} succeeded, {} failed",
                number, success, errors
            ),
            Self::Remaining { count } => write!(f, "Remaining unprocessed documents: {}", count),
            Self::NoMoreDocuments => f.write_str("No more documents to process"),
            Self::StopObserved => f.write_str("Stop requested, ending session"),
            Self::Fatal { message } => write!(f, "FATAL ERROR: {}", message),
            Self::SessionEnded { status } => {
                write!(f, "SESSION ENDED: {}", status.as_str().to_uppercase())
            }
            Self::Summary {
                processed,
                success,
                errors,
            } => write!(
                f,
                "Summary: {} processed, {} succeeded, {} failed",
                processed, success, errors
            ),
            Self::SessionResumed { session_id } => write!(f, "SESSION RESUMED: {}", session_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lines() {
        let event = ProgressEvent::Extracted {
            id: DocumentId::new(17),
            name: "report.pdf".to_string(),
            length: 5120,
            method: "improved_pdfpig".to_string(),
        };
        assert_eq!(
            event.to_string(),
            "SUCCESS: Doc 17 (report.pdf) - 5120 chars via improved_pdfpig"
        );

        let event = ProgressEvent::NoText {
            id: DocumentId::new(3),
            name: "scan.tiff".to_string(),
        };
        assert_eq!(event.to_string(), "FAILED: Doc 3 (scan.tiff) - No text extracted");
    }

    #[test]
    fn test_batch_lines() {
        let event = ProgressEvent::BatchStarted {
            number: 2,
            size: 10,
            mime_type_filter: Some("application/pdf".to_string()),
        };
        assert_eq!(event.to_string(), "--- Batch 2: 10 documents (application/pdf) ---");

        let event = ProgressEvent::PartialCommit {
            processed: 10,
            batch_size: 25,
        };
        assert_eq!(event.to_string(), "Progress saved (10/25)");
        assert_eq!(
            ProgressEvent::Remaining { count: 5 }.to_string(),
            "Remaining unprocessed documents: 5"
        );
    }

    #[test]
    fn test_session_end_line() {
        let event = ProgressEvent::SessionEnded {
            status: SessionStatus::Stopped,
        };
        assert_eq!(event.to_string(), "SESSION ENDED: STOPPED");
    }
}
