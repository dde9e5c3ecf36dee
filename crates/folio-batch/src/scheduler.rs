//! The batch loop
//!
//! Fetch, extract, classify, commit, checkpoint; repeat until nothing is
//! pending, a stop is requested, or the store fails.

use crate::events::ProgressEvent;
use crate::guard::StopSignal;
use crate::outcome::DocumentOutcome;
use crate::BatchError;
use folio_domain::session::unix_now;
use folio_domain::{
    Document, DocumentMutation, DocumentStore, Session, SessionStatus, SessionTally,
};
use folio_extract::ExtractionAdapter;
use folio_store::{CheckpointStore, ProgressLog};
use std::fmt::Display;
use std::sync::Arc;

/// Runs one session against a document store
pub struct BatchScheduler<S> {
    store: S,
    adapter: Arc<dyn ExtractionAdapter>,
    checkpoints: CheckpointStore,
    commit_interval: usize,
}

impl<S> BatchScheduler<S>
where
    S: DocumentStore,
    S::Error: Display,
{
    /// Create a scheduler; `commit_interval` is clamped to at least 1
    pub fn new(
        store: S,
        adapter: Arc<dyn ExtractionAdapter>,
        checkpoints: CheckpointStore,
        commit_interval: usize,
    ) -> Self {
        Self {
            store,
            adapter,
            checkpoints,
            commit_interval: commit_interval.max(1),
        }
    }

    /// Checkpoint store the scheduler writes to
    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Run `session` to a terminal status and return it
    ///
    /// Store and checkpoint failures end the session as `Failed`; they are
    /// recorded in the returned session, the checkpoint and the progress log
    /// rather than returned.
    pub async fn run(&self, mut session: Session, stop: &StopSignal) -> Session {
        let log = self.checkpoints.progress_log(&session.id);
        note(
            &log,
            ProgressEvent::SessionStarted {
                session_id: session.id.clone(),
            },
        );
        tracing::info!(
            "Batch session {} started (batch size {}, filter {:?})",
            session.id,
            session.batch_size,
            session.mime_type_filter
        );

        let ended = match self.process(&mut session, stop, &log).await {
            Ok(status) => session.finish(status, unix_now()),
            Err(e) => {
                tracing::error!("Batch session {} failed: {:?}", session.id, e);
                note(&log, ProgressEvent::Fatal { message: e.to_string() });
                session.fail(e.to_string(), unix_now())
            }
        };
        if let Err(e) = ended {
            tracing::error!("Could not end session {}: {}", session.id, e);
        }

        if let Err(e) = self.checkpoints.save(&session) {
            tracing::error!("Failed to write final checkpoint for {}: {}", session.id, e);
        }
        note(&log, ProgressEvent::SessionEnded { status: session.status });
        note(
            &log,
            ProgressEvent::Summary {
                processed: session.counters.processed_in_session,
                success: session.counters.success_count,
                errors: session.counters.error_count,
            },
        );
        tracing::info!(
            "Batch session {} ended as {}: {} processed, {} succeeded, {} failed",
            session.id,
            session.status,
            session.counters.processed_in_session,
            session.counters.success_count,
            session.counters.error_count
        );

        session
    }

    async fn process(
        &self,
        session: &mut Session,
        stop: &StopSignal,
        log: &ProgressLog,
    ) -> Result<SessionStatus, BatchError> {
        session.begin_processing().map_err(BatchError::InvalidRequest)?;
        self.checkpoints.save(session)?;

        let filter = session.mime_type_filter.clone();
        let pending = self.store.count_pending(filter.as_deref()).map_err(BatchError::store)?;
        note(
            log,
            ProgressEvent::RunParameters {
                batch_size: session.batch_size,
                commit_interval: self.commit_interval,
                mime_type_filter: filter.clone(),
                pending,
                total: session.counters.total_documents,
            },
        );

        loop {
            if stop.is_requested() {
                note(log, ProgressEvent::StopObserved);
                return Ok(SessionStatus::Stopped);
            }

            let batch = self
                .store
                .fetch_pending(session.batch_size, filter.as_deref())
                .map_err(BatchError::store)?;
            if batch.is_empty() {
                note(log, ProgressEvent::NoMoreDocuments);
                return Ok(SessionStatus::Completed);
            }

            session.counters.current_batch_number += 1;
            let number = session.counters.current_batch_number;
            tracing::info!("Processing batch {} ({} documents)", number, batch.len());
            note(
                log,
                ProgressEvent::BatchStarted {
                    number,
                    size: batch.len(),
                    mime_type_filter: filter.clone(),
                },
            );

            let batch_tally = self.process_batch(session, batch, log).await?;
            note(
                log,
                ProgressEvent::BatchCommitted {
                    number,
                    success: batch_tally.success,
                    errors: batch_tally.errors,
                },
            );

            match self.store.count_pending(filter.as_deref()) {
                Ok(count) => note(log, ProgressEvent::Remaining { count }),
                Err(e) => tracing::warn!("Could not count remaining documents: {}", e),
            }
        }
    }

    /// Process one fetched batch; returns the tally of the whole batch
    async fn process_batch(
        &self,
        session: &mut Session,
        batch: Vec<Document>,
        log: &ProgressLog,
    ) -> Result<SessionTally, BatchError> {
        let size = batch.len();
        let mut mutations: Vec<DocumentMutation> =
            Vec::with_capacity(self.commit_interval.min(size));
        let mut uncommitted = SessionTally::default();
        let mut batch_tally = SessionTally::default();

        for (index, doc) in batch.into_iter().enumerate() {
            let result = self.adapter.extract(&doc.external_file_id).await;
            let outcome = DocumentOutcome::classify(&doc, result);
            tracing::debug!("Document {} ({}): {:?}", doc.id, doc.name, outcome.event());

            note(log, outcome.event());
            outcome.count(&mut uncommitted);
            outcome.count(&mut batch_tally);
            mutations.push(outcome.into_mutation());

            let done = index + 1;
            if done % self.commit_interval == 0 && done < size {
                self.commit(session, &mut mutations, &mut uncommitted)?;
                note(
                    log,
                    ProgressEvent::PartialCommit {
                        processed: done,
                        batch_size: size,
                    },
                );
            }
        }

        self.commit(session, &mut mutations, &mut uncommitted)?;
        Ok(batch_tally)
    }

    /// Write buffered mutations, fold the tally into the counters, checkpoint
    fn commit(
        &self,
        session: &mut Session,
        mutations: &mut Vec<DocumentMutation>,
        tally: &mut SessionTally,
    ) -> Result<(), BatchError> {
        self.store.commit(mutations).map_err(BatchError::store)?;
        session.record_commit(std::mem::take(tally), unix_now());
        mutations.clear();
        self.checkpoints.save(session)?;
        Ok(())
    }
}

/// Append to the progress log; a failed append is logged and otherwise ignored
pub(crate) fn note(log: &ProgressLog, event: ProgressEvent) {
    if let Err(e) = log.append(&event) {
        tracing::warn!("Failed to append to {}: {}", log.path().display(), e);
    }
}
