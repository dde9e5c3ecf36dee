//! Trigger surface
//!
//! [`BatchService`] is what the HTTP server and the CLI talk to: start and
//! stop sessions, inspect checkpoints, mark sessions resumed, and flag
//! documents for reprocessing.

use crate::config::validate_batch_size;
use crate::events::ProgressEvent;
use crate::guard::{GuardStatus, SessionGuard, SessionLease};
use crate::scheduler::{note, BatchScheduler};
use crate::{BatchConfig, BatchError};
use folio_domain::session::unix_now;
use folio_domain::{DocumentStore, ExtractionOverview, ReprocessCriteria, Session, SessionId};
use folio_extract::ExtractionAdapter;
use folio_store::{CheckpointRecord, CheckpointStore};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;

/// Parameters of a new session
#[derive(Debug, Clone, Default)]
pub struct StartRequest {
    /// Documents per batch; the configured default when absent
    pub batch_size: Option<usize>,
    /// Only process documents of this MIME type
    pub mime_type_filter: Option<String>,
}

/// A session that was just started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedSession {
    /// New session id
    pub session_id: SessionId,
    /// Progress log of the session
    pub log_path: PathBuf,
}

/// Checkpoint plus the tail of the progress log
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Latest checkpoint
    pub checkpoint: CheckpointRecord,
    /// Last log lines, oldest first
    pub recent_log: Vec<String>,
}

/// Guard state plus store-wide extraction statistics
#[derive(Debug, Clone)]
pub struct Overview {
    /// Guard state
    pub guard: GuardStatus,
    /// Per-MIME-type statistics
    pub extraction: ExtractionOverview,
}

/// Entry point for starting and inspecting batch sessions
pub struct BatchService<S> {
    store: S,
    adapter: Arc<dyn ExtractionAdapter>,
    checkpoints: CheckpointStore,
    config: BatchConfig,
    guard: Arc<SessionGuard>,
}

impl<S> BatchService<S>
where
    S: DocumentStore + Clone + Send + Sync + 'static,
    S::Error: Display,
{
    /// Create a service; fails on an invalid configuration
    pub fn new(
        store: S,
        adapter: Arc<dyn ExtractionAdapter>,
        config: BatchConfig,
    ) -> Result<Self, BatchError> {
        config.validate()?;
        Ok(Self {
            store,
            adapter,
            checkpoints: CheckpointStore::new(config.data_dir.clone()),
            config,
            guard: Arc::new(SessionGuard::new()),
        })
    }

    /// Document store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Active configuration
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Checkpoint store
    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Session guard
    pub fn guard(&self) -> &Arc<SessionGuard> {
        &self.guard
    }

    /// Start a session in the background and return its id at once
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// [`BatchError::Busy`] if a session is running, [`BatchError::InvalidRequest`]
    /// for a batch size outside `1..=500`, or a store/checkpoint error while
    /// creating the session. Nothing is left running on error.
    pub fn start(&self, request: StartRequest) -> Result<StartedSession, BatchError> {
        let batch_size = request.batch_size.unwrap_or(self.config.batch_size);
        validate_batch_size(batch_size).map_err(BatchError::InvalidRequest)?;
        let filter = request
            .mime_type_filter
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let lease = self.guard.try_start()?;
        let id = lease.id().clone();

        let total = self.store.count_documents(filter.as_deref()).map_err(BatchError::store)?;
        let session = Session::new(id.clone(), batch_size, filter, total, unix_now());
        self.checkpoints.save(&session)?;

        let scheduler = BatchScheduler::new(
            self.store.clone(),
            Arc::clone(&self.adapter),
            self.checkpoints.clone(),
            self.config.commit_interval,
        );
        let handle = tokio::spawn(supervise(scheduler, session, lease));
        self.guard.attach(&id, handle);

        Ok(StartedSession {
            log_path: self.checkpoints.log_path(&id),
            session_id: id,
        })
    }

    /// Request the running session to stop at its next batch boundary
    pub fn stop(&self) -> Result<SessionId, BatchError> {
        self.guard.stop()
    }

    /// Guard state
    pub fn guard_status(&self) -> GuardStatus {
        self.guard.status()
    }

    /// Wait for the running session's task to finish, if one is attached
    pub async fn wait(&self) -> Result<(), BatchError> {
        if let Some(handle) = self.guard.take_handle() {
            handle.await.map_err(|e| BatchError::Worker(e.to_string()))?;
        }
        Ok(())
    }

    /// Checkpoint and recent log lines of one session
    pub fn session_report(&self, session_id: &str) -> Result<SessionReport, BatchError> {
        let id = parse_session_id(session_id)?;
        let checkpoint = self
            .checkpoints
            .load(&id)?
            .ok_or_else(|| BatchError::SessionNotFound(session_id.to_string()))?;
        let recent_log = self.checkpoints.progress_log(&id).tail(self.config.recent_log_lines)?;
        Ok(SessionReport { checkpoint, recent_log })
    }

    /// All sessions, newest first
    pub fn list_sessions(&self) -> Result<Vec<CheckpointRecord>, BatchError> {
        Ok(self.checkpoints.list()?)
    }

    /// Mark a terminated session as resumed
    ///
    /// Work resumes by starting a new session, which picks up whatever is
    /// still pending; this only records the operator's intent.
    pub fn resume(&self, session_id: &str) -> Result<CheckpointRecord, BatchError> {
        let id = parse_session_id(session_id)?;
        if self.guard.status().session_id.as_ref() == Some(&id) {
            return Err(BatchError::NotTerminal(session_id.to_string()));
        }

        let record = self
            .checkpoints
            .load(&id)?
            .ok_or_else(|| BatchError::SessionNotFound(session_id.to_string()))?;
        let mut session = record.to_session()?;
        session.mark_resumed(unix_now()).map_err(BatchError::NotTerminal)?;

        let record = self.checkpoints.save(&session)?;
        self.checkpoints
            .progress_log(&id)
            .append(ProgressEvent::SessionResumed {
                session_id: id.clone(),
            })?;
        tracing::info!("Session {} marked resumed", id);
        Ok(record)
    }

    /// Guard state and extraction statistics
    pub fn overview(&self) -> Result<Overview, BatchError> {
        Ok(Overview {
            guard: self.guard.status(),
            extraction: self.store.extraction_overview().map_err(BatchError::store)?,
        })
    }

    /// Move matching documents to `ReprocessPending`; returns how many moved
    pub fn flag_for_reprocess(&self, criteria: &ReprocessCriteria) -> Result<u64, BatchError> {
        if criteria.limit == Some(0) {
            return Err(BatchError::InvalidRequest("limit must be at least 1".to_string()));
        }
        let flagged = self.store.flag_for_reprocess(criteria).map_err(BatchError::store)?;
        tracing::info!("Flagged {} documents for reprocessing", flagged);
        Ok(flagged)
    }
}

fn parse_session_id(session_id: &str) -> Result<SessionId, BatchError> {
    SessionId::parse(session_id).map_err(BatchError::InvalidRequest)
}

/// Own the lease while the scheduler runs; a panicking scheduler still ends as `Failed`
async fn supervise<S>(scheduler: BatchScheduler<S>, session: Session, lease: SessionLease)
where
    S: DocumentStore + Send + Sync + 'static,
    S::Error: Display,
{
    let stop = lease.stop_signal();
    let checkpoints = scheduler.checkpoints().clone();
    let fallback = session.clone();

    let worker = tokio::spawn(async move { scheduler.run(session, &stop).await });
    if let Err(e) = worker.await {
        let message = if e.is_panic() {
            "scheduler panicked".to_string()
        } else {
            format!("scheduler task ended abnormally: {}", e)
        };
        tracing::error!("Batch session {}: {}", lease.id(), message);
        record_crash(&checkpoints, fallback, &message);
    }

    drop(lease);
}

/// Mark the last checkpointed state of a crashed session as `Failed`
fn record_crash(checkpoints: &CheckpointStore, fallback: Session, message: &str) {
    let mut session = match checkpoints.load(&fallback.id).map(|r| r.map(|r| r.to_session())) {
        Ok(Some(Ok(session))) => session,
        _ => fallback,
    };
    if session.status.is_terminal() {
        return;
    }

    let log = checkpoints.progress_log(&session.id);
    note(
        &log,
        ProgressEvent::Fatal {
            message: message.to_string(),
        },
    );
    if let Err(e) = session.fail(message, unix_now()) {
        tracing::error!("{}", e);
    }
    if let Err(e) = checkpoints.save(&session) {
        tracing::error!("Failed to write checkpoint for crashed session {}: {}", session.id, e);
    }
    note(&log, ProgressEvent::SessionEnded { status: session.status });
}
