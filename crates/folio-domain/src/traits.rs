//! Trait definitions for external interactions
//!
//! These traits define the boundary between the pipeline and its storage.
//! Infrastructure implementations live in other crates.

use crate::{Document, DocumentMutation};

/// Trait for the document store the batch scheduler works against
///
/// Implemented by the infrastructure layer (folio-store)
pub trait DocumentStore {
    /// Error type for store operations
    type Error;

    /// Fetch up to `limit` documents in `Pending` or `ReprocessPending` state
    ///
    /// Results are ordered by document id so repeated calls make progress
    /// deterministically.
    fn fetch_pending(
        &self,
        limit: usize,
        mime_type: Option<&str>,
    ) -> Result<Vec<Document>, Self::Error>;

    /// Apply all mutations atomically
    fn commit(&self, mutations: &[DocumentMutation]) -> Result<(), Self::Error>;

    /// Count all documents, optionally restricted to one MIME type
    fn count_documents(&self, mime_type: Option<&str>) -> Result<u64, Self::Error>;

    /// Count documents still selectable by the scheduler
    fn count_pending(&self, mime_type: Option<&str>) -> Result<u64, Self::Error>;

    /// Per-MIME-type extraction statistics
    fn extraction_overview(&self) -> Result<ExtractionOverview, Self::Error>;

    /// Move matching `Succeeded` documents to `ReprocessPending`
    ///
    /// Returns how many documents were flagged.
    fn flag_for_reprocess(&self, criteria: &ReprocessCriteria) -> Result<u64, Self::Error>;
}

/// Selection criteria for [`DocumentStore::flag_for_reprocess`]
#[derive(Debug, Clone, Default)]
pub struct ReprocessCriteria {
    /// Only documents extracted with exactly this method label
    pub method: Option<String>,

    /// Only documents of this MIME type
    pub mime_type: Option<String>,

    /// Also flag documents already rechecked by an earlier comparison
    pub include_rechecked: bool,

    /// Maximum documents to flag
    pub limit: Option<usize>,
}

/// Extraction statistics for one MIME type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeTypeStats {
    /// MIME type
    pub mime_type: String,
    /// Documents of this type
    pub total: u64,
    /// Documents holding extracted text
    pub extracted: u64,
    /// Documents never attempted
    pub not_attempted: u64,
    /// Documents flagged for reprocessing
    pub reprocess_pending: u64,
    /// Documents attempted without text
    pub failed: u64,
}

impl MimeTypeStats {
    /// Share of documents with text, in percent (0 when empty)
    pub fn percentage(&self) -> f64 {
        percentage(self.extracted, self.total)
    }
}

/// Store-wide extraction statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionOverview {
    /// Per MIME type, ordered by descending total
    pub by_mime_type: Vec<MimeTypeStats>,
}

impl ExtractionOverview {
    /// Sum over all MIME types
    pub fn totals(&self) -> MimeTypeStats {
        self.by_mime_type.iter().fold(
            MimeTypeStats {
                mime_type: "all".to_string(),
                ..Default::default()
            },
            |mut acc, s| {
                acc.total += s.total;
                acc.extracted += s.extracted;
                acc.not_attempted += s.not_attempted;
                acc.reprocess_pending += s.reprocess_pending;
                acc.failed += s.failed;
                acc
            },
        )
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        ((part as f64 / whole as f64) * 10_000.0).round() / 100.0
    }
}
