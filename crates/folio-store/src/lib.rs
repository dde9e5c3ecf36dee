//! Folio Storage Layer
//!
//! Durable state for the extraction pipeline:
//!
//! - [`SqliteStore`]: documents and tags in SQLite, implementing
//!   [`DocumentStore`]
//! - [`CheckpointStore`]: one JSON checkpoint per session, replaced atomically
//! - [`ProgressLog`]: append-only, timestamped text log per session
//!
//! # Examples
//!
//! ```no_run
//! use folio_domain::traits::DocumentStore;
//! use folio_store::SqliteStore;
//!
//! let store = SqliteStore::new("folio.db").unwrap();
//! let pending = store.fetch_pending(10, None).unwrap();
//! println!("{} documents waiting", pending.len());
//! ```

#![warn(missing_docs)]

pub mod checkpoint;
pub mod progress_log;

pub use checkpoint::{CheckpointError, CheckpointRecord, CheckpointStore};
pub use progress_log::ProgressLog;

use folio_domain::session::unix_now;
use folio_domain::traits::{DocumentStore, ExtractionOverview, MimeTypeStats, ReprocessCriteria};
use folio_domain::{
    Document, DocumentId, DocumentMutation, ExtractionState, NewDocument, HAS_TEXT_TAG,
    HAS_TEXT_TAG_CATEGORY, UNKNOWN_METHOD,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Document not found
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Another thread panicked while holding the connection
    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

/// Rows the scheduler selects: never attempted, or flagged for reprocessing.
/// GLOB keeps the prefix match case-sensitive, matching the state decoder.
const SELECTABLE_PREDICATE: &str = "(extraction_state IS NULL OR trim(extraction_state) = '' \
     OR extraction_state GLOB 'REPROCESS|*')";

const DOCUMENT_COLUMNS: &str =
    "id, external_file_id, name, mime_type, extracted_text, extraction_state";

const UPDATE_STATE_SQL: &str =
    "UPDATE documents SET extraction_state = ?1, updated_at = ?2 WHERE id = ?3";

const REPLACE_TEXT_SQL: &str = "UPDATE documents SET extracted_text = ?1, extraction_state = ?2, \
     updated_at = ?3 WHERE id = ?4";

/// SQLite-based implementation of [`DocumentStore`]
///
/// The connection sits behind `Arc<Mutex<_>>`, so clones share one database
/// and status queries can run while the scheduler holds its own clone.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database at `path`
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Register a document in `Pending` state
    ///
    /// Returns `None` if a document with the same external id already exists.
    pub fn insert_document(&self, doc: &NewDocument) -> Result<Option<DocumentId>, StoreError> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO documents (external_file_id, name, mime_type) \
             VALUES (?1, ?2, ?3)",
            params![&doc.external_file_id, &doc.name, &doc.mime_type],
        )?;

        if inserted == 0 {
            return Ok(None);
        }
        Ok(Some(DocumentId::new(conn.last_insert_rowid())))
    }

    /// Get a document by id
    pub fn get_document(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS);
        let row = conn
            .query_row(&sql, params![id.value()], StoredRow::read)
            .optional()?;
        let Some(row) = row else {
            return Ok(None);
        };

        let state = ExtractionState::decode(row.state.as_deref())
            .map_err(|e| StoreError::InvalidData(format!("document {}: {}", id, e)))?;
        Ok(Some(row.into_document(state)))
    }

    /// Overwrite a document's text and state outside of a batch session
    pub fn set_extraction(
        &self,
        id: DocumentId,
        text: Option<&str>,
        state: &ExtractionState,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            REPLACE_TEXT_SQL,
            params![text, state.encode(), unix_now() as i64, id.value()],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Tag names attached to a document
    pub fn tags(&self, id: DocumentId) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT tag_name FROM document_tags WHERE document_id = ?1 ORDER BY tag_name",
        )?;
        let tags = stmt
            .query_map(params![id.value()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(tags)
    }
}

/// A documents row with its state still in stored form
struct StoredRow {
    id: i64,
    external_file_id: String,
    name: String,
    mime_type: String,
    extracted_text: Option<String>,
    state: Option<String>,
}

impl StoredRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            external_file_id: row.get(1)?,
            name: row.get(2)?,
            mime_type: row.get(3)?,
            extracted_text: row.get(4)?,
            state: row.get(5)?,
        })
    }

    fn into_document(self, extraction_state: ExtractionState) -> Document {
        Document {
            id: DocumentId::new(self.id),
            external_file_id: self.external_file_id,
            name: self.name,
            mime_type: self.mime_type,
            extracted_text: self.extracted_text,
            extraction_state,
        }
    }

    /// State written over a selectable row whose stored state cannot be
    /// decoded. The result is never selectable; any stored text is kept.
    fn quarantine_state(&self) -> ExtractionState {
        let has_text = self.extracted_text.as_deref().is_some_and(|t| !t.trim().is_empty());
        if has_text {
            ExtractionState::Succeeded {
                method: UNKNOWN_METHOD.to_string(),
                rechecked: true,
            }
        } else {
            ExtractionState::failed(format!(
                "Unreadable extraction state: {}",
                self.state.as_deref().unwrap_or_default()
            ))
        }
    }
}

impl DocumentStore for SqliteStore {
    type Error = StoreError;

    /// Selectable rows whose state does not decode (such as `REPROCESS|oops`)
    /// are rewritten out of selection and the query runs again, so one bad
    /// row never blocks the rest.
    fn fetch_pending(
        &self,
        limit: usize,
        mime_type: Option<&str>,
    ) -> Result<Vec<Document>, Self::Error> {
        let mut sql = format!(
            "SELECT {} FROM documents WHERE {}",
            DOCUMENT_COLUMNS, SELECTABLE_PREDICATE
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(mime) = mime_type {
            sql.push_str(" AND mime_type = ?");
            params.push(Box::new(mime.to_string()));
        }

        sql.push_str(" ORDER BY id LIMIT ?");
        params.push(Box::new(limit as i64));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        loop {
            let rows = stmt
                .query_map(&param_refs[..], StoredRow::read)?
                .collect::<Result<Vec<_>, _>>()?;

            let mut docs = Vec::with_capacity(rows.len());
            let mut unreadable = Vec::new();
            for row in rows {
                match ExtractionState::decode(row.state.as_deref()) {
                    Ok(state) => docs.push(row.into_document(state)),
                    Err(e) => unreadable.push((row, e)),
                }
            }

            if unreadable.is_empty() {
                return Ok(docs);
            }

            let now = unix_now() as i64;
            for (row, e) in unreadable {
                let replacement = row.quarantine_state();
                tracing::warn!(
                    "Document {} has unreadable state ({}); marking it {}",
                    row.id,
                    e,
                    replacement.kind()
                );
                conn.execute(UPDATE_STATE_SQL, params![replacement.encode(), now, row.id])?;
            }
        }
    }

    fn commit(&self, mutations: &[DocumentMutation]) -> Result<(), Self::Error> {
        if mutations.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = unix_now() as i64;
        {
            let mut replace_text = tx.prepare_cached(REPLACE_TEXT_SQL)?;
            let mut update_state = tx.prepare_cached(UPDATE_STATE_SQL)?;
            let mut tag = tx.prepare_cached(
                "INSERT INTO document_tags (document_id, tag_name, tag_category)
                 SELECT ?1, ?2, ?3
                 WHERE NOT EXISTS (
                     SELECT 1 FROM document_tags WHERE document_id = ?1 AND tag_name = ?2
                 )",
            )?;

            for mutation in mutations {
                let id = mutation.document_id.value();
                let state = mutation.state.encode();

                match &mutation.text {
                    Some(text) => replace_text.execute(params![text, state, now, id])?,
                    None => update_state.execute(params![state, now, id])?,
                };

                if mutation.mark_has_text {
                    tag.execute(params![id, HAS_TEXT_TAG, HAS_TEXT_TAG_CATEGORY])?;
                }
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn count_documents(&self, mime_type: Option<&str>) -> Result<u64, Self::Error> {
        let conn = self.lock()?;
        let count: i64 = match mime_type {
            Some(mime) => conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE mime_type = ?1",
                params![mime],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    fn count_pending(&self, mime_type: Option<&str>) -> Result<u64, Self::Error> {
        let conn = self.lock()?;
        let sql = format!("SELECT COUNT(*) FROM documents WHERE {}", SELECTABLE_PREDICATE);
        let count: i64 = match mime_type {
            Some(mime) => conn.query_row(
                &format!("{} AND mime_type = ?1", sql),
                params![mime],
                |row| row.get(0),
            )?,
            None => conn.query_row(&sql, [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    fn extraction_overview(&self) -> Result<ExtractionOverview, Self::Error> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT mime_type,
                    COUNT(*),
                    SUM(CASE WHEN extracted_text IS NOT NULL AND extracted_text != ''
                             THEN 1 ELSE 0 END),
                    SUM(CASE WHEN extraction_state IS NULL OR trim(extraction_state) = ''
                             THEN 1 ELSE 0 END),
                    SUM(CASE WHEN extraction_state GLOB 'REPROCESS|*' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN extraction_state IS NOT NULL AND trim(extraction_state) != ''
                              AND extraction_state NOT GLOB 'REPROCESS|*'
                              AND (extracted_text IS NULL OR extracted_text = '') THEN 1 ELSE 0 END)
             FROM documents
             GROUP BY mime_type
             ORDER BY COUNT(*) DESC, mime_type",
        )?;

        let by_mime_type = stmt
            .query_map([], |row| {
                Ok(MimeTypeStats {
                    mime_type: row.get(0)?,
                    total: row.get::<_, i64>(1)? as u64,
                    extracted: row.get::<_, i64>(2)? as u64,
                    not_attempted: row.get::<_, i64>(3)? as u64,
                    reprocess_pending: row.get::<_, i64>(4)? as u64,
                    failed: row.get::<_, i64>(5)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ExtractionOverview { by_mime_type })
    }

    fn flag_for_reprocess(&self, criteria: &ReprocessCriteria) -> Result<u64, Self::Error> {
        let mut sql = String::from(
            "SELECT id, length(extracted_text), extraction_state FROM documents
             WHERE extracted_text IS NOT NULL AND extracted_text != ''
               AND extraction_state IS NOT NULL AND trim(extraction_state) != ''
               AND extraction_state NOT GLOB 'REPROCESS|*'",
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(mime) = &criteria.mime_type {
            sql.push_str(" AND mime_type = ?");
            params.push(Box::new(mime.clone()));
        }
        sql.push_str(" ORDER BY id");

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut flagged = 0u64;
        {
            let mut stmt = tx.prepare(&sql)?;
            let param_refs: Vec<&dyn rusqlite::ToSql> =
                params.iter().map(|p| p.as_ref()).collect();
            let candidates = stmt
                .query_map(&param_refs[..], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut update = tx.prepare(UPDATE_STATE_SQL)?;
            let now = unix_now() as i64;

            for (id, length, raw_state) in candidates {
                if criteria.limit.is_some_and(|limit| flagged as usize >= limit) {
                    break;
                }

                let (method, rechecked) = match ExtractionState::decode(Some(&raw_state)) {
                    Ok(ExtractionState::Succeeded { method, rechecked }) => (method, rechecked),
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!("Skipping document {} with unreadable state: {}", id, e);
                        continue;
                    }
                };

                if rechecked && !criteria.include_rechecked {
                    continue;
                }
                if criteria.method.as_ref().is_some_and(|m| *m != method) {
                    continue;
                }

                let state = ExtractionState::ReprocessPending {
                    prior_length: length.max(0) as usize,
                    prior_method: method,
                };
                update.execute(params![state.encode(), now, id])?;
                flagged += 1;
            }
        }
        tx.commit()?;

        Ok(flagged)
    }
}
