//! Document module - the unit of work for the extraction pipeline

use crate::extraction::ExtractionState;
use std::fmt;

/// Tag attached to every document that holds extracted text
pub const HAS_TEXT_TAG: &str = "Has Text";

/// Category of [`HAS_TEXT_TAG`]
pub const HAS_TEXT_TAG_CATEGORY: &str = "Extraction";

/// Stable internal identifier of a document (store row id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(i64);

impl DocumentId {
    /// Wrap a raw store identifier
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw value
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A document as seen by the batch scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Internal identifier
    pub id: DocumentId,

    /// Identifier in the external file store, handed to the extraction adapter
    pub external_file_id: String,

    /// Display name
    pub name: String,

    /// MIME type reported by the file store
    pub mime_type: String,

    /// Text stored by a previous successful extraction
    pub extracted_text: Option<String>,

    /// Current extraction state
    pub extraction_state: ExtractionState,
}

impl Document {
    /// Whether the batch scheduler should pick this document up
    pub fn is_selectable(&self) -> bool {
        self.extraction_state.is_selectable()
    }
}

/// A document registration, before the store assigns an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    /// Identifier in the external file store
    pub external_file_id: String,

    /// Display name
    pub name: String,

    /// MIME type
    pub mime_type: String,
}

/// One pending write produced by processing a document
///
/// Mutations are buffered by the scheduler and applied together in a
/// single store commit.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMutation {
    /// Target document
    pub document_id: DocumentId,

    /// Replacement text; `None` leaves the stored text untouched
    pub text: Option<String>,

    /// New extraction state
    pub state: ExtractionState,

    /// Insert the [`HAS_TEXT_TAG`] tag if the document does not carry it yet
    pub mark_has_text: bool,
}

impl DocumentMutation {
    /// Mutation recording a failed attempt; stored text is left alone
    pub fn failed(document_id: DocumentId, reason: impl Into<String>) -> Self {
        Self {
            document_id,
            text: None,
            state: ExtractionState::failed(reason),
            mark_has_text: false,
        }
    }

    /// Mutation storing freshly extracted text
    pub fn succeeded(document_id: DocumentId, text: String, method: impl Into<String>) -> Self {
        Self {
            document_id,
            text: Some(text),
            state: ExtractionState::Succeeded {
                method: method.into(),
                rechecked: false,
            },
            mark_has_text: true,
        }
    }

    /// Mutation that keeps stored text and marks it as rechecked
    pub fn rechecked(document_id: DocumentId, prior_method: impl Into<String>) -> Self {
        Self {
            document_id,
            text: None,
            state: ExtractionState::Succeeded {
                method: prior_method.into(),
                rechecked: true,
            },
            mark_has_text: true,
        }
    }
}
