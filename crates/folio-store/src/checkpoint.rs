//! Session checkpoints
//!
//! Each session owns a directory under the checkpoint root:
//!
//! ```text
//! <root>/session_<id>/checkpoint.json
//! <root>/session_<id>/batch_log.txt
//! ```
//!
//! The checkpoint is rewritten after every commit point. Writes go to a
//! temporary file that is synced and then renamed over the old checkpoint,
//! so a reader never sees a partially written record.

use crate::progress_log::ProgressLog;
use chrono::{DateTime, Utc};
use folio_domain::{Session, SessionCounters, SessionId, SessionStatus};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SESSION_DIR_PREFIX: &str = "session_";
const CHECKPOINT_FILE: &str = "checkpoint.json";
const CHECKPOINT_TMP_FILE: &str = "checkpoint.json.tmp";
const LOG_FILE: &str = "batch_log.txt";

/// Errors that can occur while reading or writing checkpoints
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// Filesystem error
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record content is not a valid session
    #[error("Invalid checkpoint: {0}")]
    InvalidData(String),
}

/// Durable projection of a [`Session`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRecord {
    /// Session identifier
    pub session_id: String,
    /// Session status name
    pub status: String,
    /// When the session was created
    pub start_time: DateTime<Utc>,
    /// When the last batch commit happened
    #[serde(default)]
    pub last_batch_time: Option<DateTime<Utc>>,
    /// When the session ended
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// When the session was marked resumed
    #[serde(default)]
    pub resume_time: Option<DateTime<Utc>>,
    /// Documents known at session start
    pub total_documents: u64,
    /// Documents committed by this session
    pub processed_in_session: u64,
    /// Committed successes
    pub success_count: u64,
    /// Committed failures
    pub error_count: u64,
    /// Current batch number
    pub current_batch: u64,
    /// Batch size of the run
    pub batch_size: usize,
    /// MIME type filter of the run
    #[serde(default)]
    pub mime_type_filter: Option<String>,
    /// Fatal error text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn to_datetime(secs: u64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs as i64, 0).unwrap_or_default()
}

fn to_secs(dt: &DateTime<Utc>) -> u64 {
    dt.timestamp().max(0) as u64
}

impl From<&Session> for CheckpointRecord {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.to_string(),
            status: session.status.as_str().to_string(),
            start_time: to_datetime(session.started_at),
            last_batch_time: session.last_batch_at.map(to_datetime),
            end_time: session.ended_at.map(to_datetime),
            resume_time: session.resumed_at.map(to_datetime),
            total_documents: session.counters.total_documents,
            processed_in_session: session.counters.processed_in_session,
            success_count: session.counters.success_count,
            error_count: session.counters.error_count,
            current_batch: session.counters.current_batch_number,
            batch_size: session.batch_size,
            mime_type_filter: session.mime_type_filter.clone(),
            error: session.error.clone(),
        }
    }
}

impl CheckpointRecord {
    /// Rebuild the session this record was taken from
    pub fn to_session(&self) -> Result<Session, CheckpointError> {
        let id = SessionId::parse(&self.session_id).map_err(CheckpointError::InvalidData)?;
        let status = SessionStatus::parse(&self.status).ok_or_else(|| {
            CheckpointError::InvalidData(format!("unknown status '{}'", self.status))
        })?;

        Ok(Session {
            id,
            status,
            counters: SessionCounters {
                total_documents: self.total_documents,
                processed_in_session: self.processed_in_session,
                success_count: self.success_count,
                error_count: self.error_count,
                current_batch_number: self.current_batch,
            },
            batch_size: self.batch_size,
            mime_type_filter: self.mime_type_filter.clone(),
            started_at: to_secs(&self.start_time),
            last_batch_at: self.last_batch_time.as_ref().map(to_secs),
            ended_at: self.end_time.as_ref().map(to_secs),
            resumed_at: self.resume_time.as_ref().map(to_secs),
            error: self.error.clone(),
        })
    }
}

/// File-backed store of session checkpoints
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    /// Create a store rooted at `root`; directories are created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one session's files
    pub fn session_dir(&self, id: &SessionId) -> PathBuf {
        self.root.join(format!("{}{}", SESSION_DIR_PREFIX, id))
    }

    /// Path of a session's progress log
    pub fn log_path(&self, id: &SessionId) -> PathBuf {
        self.session_dir(id).join(LOG_FILE)
    }

    /// Progress log of a session
    pub fn progress_log(&self, id: &SessionId) -> ProgressLog {
        ProgressLog::new(self.log_path(id))
    }

    /// Write the checkpoint of `session`, replacing any previous one
    pub fn save(&self, session: &Session) -> Result<CheckpointRecord, CheckpointError> {
        let record = CheckpointRecord::from(session);
        let dir = self.session_dir(&session.id);
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_vec_pretty(&record)?;
        let tmp_path = dir.join(CHECKPOINT_TMP_FILE);
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, dir.join(CHECKPOINT_FILE))?;

        Ok(record)
    }

    /// Read the checkpoint of a session, if one exists
    pub fn load(&self, id: &SessionId) -> Result<Option<CheckpointRecord>, CheckpointError> {
        let path = self.session_dir(id).join(CHECKPOINT_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// All readable checkpoints, newest start time first
    ///
    /// Directories without a checkpoint and files that fail to parse are
    /// skipped with a warning.
    pub fn list(&self) -> Result<Vec<CheckpointRecord>, CheckpointError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(SESSION_DIR_PREFIX) || !entry.path().is_dir() {
                continue;
            }

            let path = entry.path().join(CHECKPOINT_FILE);
            let parsed = fs::read(&path).map_err(CheckpointError::from).and_then(|bytes| {
                serde_json::from_slice::<CheckpointRecord>(&bytes).map_err(CheckpointError::from)
            });
            match parsed {
                Ok(record) => records.push(record),
                Err(CheckpointError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Skipping unreadable checkpoint {}: {}", path.display(), e)
                }
            }
        }

        records.sort_by(|a, b| {
            b.start_time
                .cmp(&a.start_time)
                .then_with(|| b.session_id.cmp(&a.session_id))
        });
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_domain::SessionTally;
    use tempfile::TempDir;

    fn session(started_at: u64) -> Session {
        Session::new(SessionId::new(), 10, Some("application/pdf".to_string()), 25, started_at)
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());

        let mut s = session(1_700_000_000);
        s.begin_processing().unwrap();
        s.record_commit(SessionTally { success: 8, errors: 2 }, 1_700_000_060);

        store.save(&s).unwrap();
        let record = store.load(&s.id).unwrap().unwrap();

        assert_eq!(record.status, "processing");
        assert_eq!(record.processed_in_session, 10);
        assert_eq!(record.to_session().unwrap(), s);
    }

    #[test]
    fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());

        let mut s = session(1_700_000_000);
        store.save(&s).unwrap();
        s.begin_processing().unwrap();
        s.finish(SessionStatus::Completed, 1_700_000_100).unwrap();
        store.save(&s).unwrap();

        let record = store.load(&s.id).unwrap().unwrap();
        assert_eq!(record.status, "completed");
        assert!(record.end_time.is_some());
        assert!(!store.session_dir(&s.id).join(CHECKPOINT_TMP_FILE).exists());
    }

    #[test]
    fn test_load_missing() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());
        assert!(store.load(&SessionId::new()).unwrap().is_none());
    }

    #[test]
    fn test_camel_case_fields() {
        let record = CheckpointRecord::from(&session(1_700_000_000));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"sessionId\""));
        assert!(json.contains("\"processedInSession\""));
        assert!(json.contains("\"mimeTypeFilter\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_list_sorted_and_skips_malformed() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());

        let older = session(1_700_000_000);
        let newer = session(1_700_000_500);
        store.save(&older).unwrap();
        store.save(&newer).unwrap();

        let broken = dir.path().join("session_broken");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join(CHECKPOINT_FILE), "{ not json").unwrap();
        fs::create_dir_all(dir.path().join("session_empty")).unwrap();
        fs::create_dir_all(dir.path().join("unrelated")).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].session_id, newer.id.to_string());
        assert_eq!(listed[1].session_id, older.id.to_string());
    }

    #[test]
    fn test_list_missing_root() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("nope"));
        assert!(store.list().unwrap().is_empty());
    }
}
