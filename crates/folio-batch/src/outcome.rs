//! Per-document outcome classification
//!
//! Turns one adapter result into the write to commit, the tally to count and
//! the line to log. Nothing here touches the store.

use crate::events::ProgressEvent;
use folio_domain::{
    decide, normalize_method, Document, DocumentId, DocumentMutation, ExtractionState,
    ReprocessVerdict, SessionTally,
};
use folio_extract::{ExtractError, Extraction};

pub use folio_domain::UNKNOWN_METHOD;

/// What happened to one document
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOutcome {
    /// First extraction produced text
    Extracted {
        /// Document
        id: DocumentId,
        /// Document name
        name: String,
        /// Extracted text
        text: String,
        /// Method label
        method: String,
    },

    /// First extraction produced no text
    NoText {
        /// Document
        id: DocumentId,
        /// Document name
        name: String,
    },

    /// First extraction failed in the adapter
    Error {
        /// Document
        id: DocumentId,
        /// Document name
        name: String,
        /// Error text
        message: String,
    },

    /// Reprocessing: new text replaces the stored text
    Upgraded {
        /// Document
        id: DocumentId,
        /// Document name
        name: String,
        /// New text
        text: String,
        /// Method of the new text
        method: String,
        /// Length of the replaced text
        prior_length: usize,
        /// Comparison result
        verdict: ReprocessVerdict,
    },

    /// Reprocessing: stored text wins the comparison
    Kept {
        /// Document
        id: DocumentId,
        /// Document name
        name: String,
        /// Method of the stored text
        prior_method: String,
        /// Length of the stored text
        prior_length: usize,
        /// Comparison result
        verdict: ReprocessVerdict,
    },

    /// Reprocessing: adapter failed or found nothing; stored text kept
    ReprocessFailed {
        /// Document
        id: DocumentId,
        /// Document name
        name: String,
        /// Method of the stored text
        prior_method: String,
        /// What went wrong
        message: String,
    },
}

impl DocumentOutcome {
    /// Classify the adapter result for `doc`
    pub fn classify(doc: &Document, result: Result<Extraction, ExtractError>) -> Self {
        let id = doc.id;
        let name = doc.name.clone();

        let found = match result {
            Ok(extraction) if extraction.has_text() => Ok(extraction),
            Ok(_) => Err(None),
            Err(e) => Err(Some(e.message())),
        };

        match (&doc.extraction_state, found) {
            (
                ExtractionState::ReprocessPending {
                    prior_length,
                    prior_method,
                },
                Ok(extraction),
            ) => {
                let text = extraction.text.unwrap_or_default();
                let method = method_label(extraction.method);
                let verdict = decide(*prior_length, prior_method, &text, &method);
                if verdict.use_new {
                    Self::Upgraded {
                        id,
                        name,
                        text,
                        method,
                        prior_length: *prior_length,
                        verdict,
                    }
                } else {
                    Self::Kept {
                        id,
                        name,
                        prior_method: prior_method.clone(),
                        prior_length: *prior_length,
                        verdict,
                    }
                }
            }
            (ExtractionState::ReprocessPending { prior_method, .. }, Err(message)) => {
                Self::ReprocessFailed {
                    id,
                    name,
                    prior_method: prior_method.clone(),
                    message: message.unwrap_or_else(|| "No text extracted".to_string()),
                }
            }
            (_, Ok(extraction)) => Self::Extracted {
                id,
                name,
                text: extraction.text.unwrap_or_default(),
                method: method_label(extraction.method),
            },
            (_, Err(None)) => Self::NoText { id, name },
            (_, Err(Some(message))) => Self::Error { id, name, message },
        }
    }

    /// Whether the document counts as a success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Extracted { .. } | Self::Upgraded { .. } | Self::Kept { .. })
    }

    /// Add this outcome to `tally`
    pub fn count(&self, tally: &mut SessionTally) {
        if self.is_success() {
            tally.success += 1;
        } else {
            tally.errors += 1;
        }
    }

    /// Progress log line for this outcome
    pub fn event(&self) -> ProgressEvent {
        match self {
            Self::Extracted { id, name, text, method } => ProgressEvent::Extracted {
                id: *id,
                name: name.clone(),
                length: text.chars().count(),
                method: method.clone(),
            },
            Self::NoText { id, name } => ProgressEvent::NoText {
                id: *id,
                name: name.clone(),
            },
            Self::Error { id, name, message } => ProgressEvent::Error {
                id: *id,
                name: name.clone(),
                message: message.clone(),
            },
            Self::Upgraded {
                id,
                name,
                method,
                prior_length,
                verdict,
                ..
            } => ProgressEvent::ReprocessUpgraded {
                id: *id,
                name: name.clone(),
                prior_length: *prior_length,
                new_length: verdict.new_length,
                method: method.clone(),
                reason: verdict.reason,
            },
            Self::Kept {
                id,
                name,
                prior_length,
                verdict,
                ..
            } => ProgressEvent::ReprocessKept {
                id: *id,
                name: name.clone(),
                prior_length: *prior_length,
                new_length: verdict.new_length,
                reason: verdict.reason,
            },
            Self::ReprocessFailed { id, name, message, .. } => ProgressEvent::ReprocessFailed {
                id: *id,
                name: name.clone(),
                message: message.clone(),
            },
        }
    }

    /// The store write for this outcome; the text moves into the mutation
    pub fn into_mutation(self) -> DocumentMutation {
        match self {
            Self::Extracted { id, text, method, .. } | Self::Upgraded { id, text, method, .. } => {
                DocumentMutation::succeeded(id, text, method)
            }
            Self::NoText { id, .. } => DocumentMutation {
                document_id: id,
                text: None,
                state: ExtractionState::no_text(),
                mark_has_text: false,
            },
            Self::Error { id, message, .. } => DocumentMutation::failed(id, message),
            Self::Kept { id, prior_method, .. }
            | Self::ReprocessFailed { id, prior_method, .. } => {
                DocumentMutation::rechecked(id, prior_method)
            }
        }
    }
}

/// Adapter labels are untrusted; reserved state forms must never reach the store
fn method_label(method: Option<String>) -> String {
    normalize_method(method.as_deref().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_domain::{ReprocessReason, MAX_FAILURE_REASON_CHARS};

    fn pending_doc() -> Document {
        Document {
            id: DocumentId::new(1),
            external_file_id: "f1".to_string(),
            name: "one.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            extracted_text: None,
            extraction_state: ExtractionState::Pending,
        }
    }

    fn reprocess_doc(prior_length: usize, prior_method: &str) -> Document {
        Document {
            extracted_text: Some("y".repeat(prior_length)),
            extraction_state: ExtractionState::ReprocessPending {
                prior_length,
                prior_method: prior_method.to_string(),
            },
            ..pending_doc()
        }
    }

    #[test]
    fn test_success_stores_text_and_tags() {
        let outcome =
            DocumentOutcome::classify(&pending_doc(), Ok(Extraction::found("hello", "plain_text")));
        assert!(outcome.is_success());

        let mutation = outcome.into_mutation();
        assert_eq!(mutation.text.as_deref(), Some("hello"));
        assert_eq!(
            mutation.state,
            ExtractionState::Succeeded {
                method: "plain_text".to_string(),
                rechecked: false
            }
        );
        assert!(mutation.mark_has_text);
    }

    #[test]
    fn test_missing_method_is_unknown() {
        let extraction = Extraction {
            text: Some("hello".to_string()),
            method: None,
        };
        let mutation = DocumentOutcome::classify(&pending_doc(), Ok(extraction)).into_mutation();
        assert_eq!(
            mutation.state,
            ExtractionState::Succeeded {
                method: UNKNOWN_METHOD.to_string(),
                rechecked: false
            }
        );
    }

    #[test]
    fn test_empty_and_blank_results_fail() {
        for extraction in [
            Extraction::empty(),
            Extraction::found("   \n", "basic"),
        ] {
            let outcome = DocumentOutcome::classify(&pending_doc(), Ok(extraction));
            assert!(matches!(outcome, DocumentOutcome::NoText { .. }));
            assert!(!outcome.is_success());

            let mutation = outcome.into_mutation();
            assert_eq!(mutation.state, ExtractionState::no_text());
            assert!(mutation.text.is_none());
            assert!(!mutation.mark_has_text);
        }
    }

    #[test]
    fn test_adapter_error_truncated() {
        let long = "x".repeat(250);
        let outcome = DocumentOutcome::classify(&pending_doc(), Err(ExtractError::Other(long)));
        let mut tally = SessionTally::default();
        outcome.count(&mut tally);
        assert_eq!(tally, SessionTally { success: 0, errors: 1 });

        match outcome.into_mutation().state {
            ExtractionState::Failed { reason } => {
                assert_eq!(reason.chars().count(), MAX_FAILURE_REASON_CHARS);
                assert!(reason.chars().all(|c| c == 'x'));
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_error_reason_has_no_category_prefix() {
        let err = ExtractError::Communication("connection reset".to_string());
        let outcome = DocumentOutcome::classify(&pending_doc(), Err(err));
        assert_eq!(
            outcome.event().to_string(),
            "ERROR: Doc 1 (one.pdf) - connection reset"
        );
        assert_eq!(
            outcome.into_mutation().state,
            ExtractionState::failed("connection reset")
        );
    }

    #[test]
    fn test_reserved_method_labels_are_neutralized() {
        for label in [
            "REPROCESS|3|x",
            "REPROCESS|oops",
            "RECHECKED|basic",
            "error: boom",
            "extraction_failed",
        ] {
            let outcome =
                DocumentOutcome::classify(&pending_doc(), Ok(Extraction::found("hello", label)));
            let state = outcome.into_mutation().state;
            assert!(
                matches!(state, ExtractionState::Succeeded { rechecked: false, .. }),
                "label {:?} produced {:?}",
                label,
                state
            );
            assert!(!state.is_selectable());
            assert_eq!(ExtractionState::decode(state.encode().as_deref()), Ok(state.clone()));
        }

        let outcome = DocumentOutcome::classify(
            &pending_doc(),
            Ok(Extraction::found("hello", "REPROCESS|3|x")),
        );
        assert_eq!(
            outcome.into_mutation().state,
            ExtractionState::Succeeded {
                method: "REPROCESS_3_x".to_string(),
                rechecked: false
            }
        );
    }

    #[test]
    fn test_reprocess_upgrade() {
        let doc = reprocess_doc(100, "basic");
        let found = Extraction::found("x".repeat(130), "improved_pdfpig");
        let outcome = DocumentOutcome::classify(&doc, Ok(found));
        assert!(matches!(
            outcome,
            DocumentOutcome::Upgraded { ref verdict, .. }
                if verdict.reason == ReprocessReason::NewTextLonger
        ));

        let mutation = outcome.into_mutation();
        assert_eq!(mutation.text.as_ref().map(|t| t.len()), Some(130));
        assert_eq!(
            mutation.state,
            ExtractionState::Succeeded {
                method: "improved_pdfpig".to_string(),
                rechecked: false
            }
        );
    }

    #[test]
    fn test_reprocess_keeps_prior() {
        let doc = reprocess_doc(100, "basic");
        let outcome =
            DocumentOutcome::classify(&doc, Ok(Extraction::found("x".repeat(40), "basic")));
        assert!(outcome.is_success());
        assert!(matches!(
            outcome.event(),
            ProgressEvent::ReprocessKept {
                reason: ReprocessReason::NewTooShort,
                new_length: 40,
                ..
            }
        ));

        let mutation = outcome.into_mutation();
        assert!(mutation.text.is_none());
        assert_eq!(
            mutation.state,
            ExtractionState::Succeeded {
                method: "basic".to_string(),
                rechecked: true
            }
        );
    }

    #[test]
    fn test_reprocess_failure_keeps_prior_and_counts_error() {
        let doc = reprocess_doc(100, "basic");
        for result in [Ok(Extraction::empty()), Err(ExtractError::Other("timeout".to_string()))] {
            let outcome = DocumentOutcome::classify(&doc, result);
            assert!(matches!(outcome, DocumentOutcome::ReprocessFailed { .. }));
            assert!(!outcome.is_success());
            assert!(outcome.event().to_string().starts_with("REPROCESS FAILED: Doc 1 (one.pdf)"));

            let mutation = outcome.into_mutation();
            assert!(mutation.text.is_none());
            assert_eq!(
                mutation.state,
                ExtractionState::Succeeded {
                    method: "basic".to_string(),
                    rechecked: true
                }
            );
        }
    }
}
