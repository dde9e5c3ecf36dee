//! Single-session guard
//!
//! At most one batch session runs per process. [`SessionGuard::try_start`]
//! hands out a [`SessionLease`]; dropping the lease releases the guard, so
//! release happens exactly once whichever way the owning task ends.

use crate::BatchError;
use folio_domain::SessionId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

/// Cooperative stop flag shared between the guard and the scheduler
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Fresh, unset signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the scheduler to stop at the next batch boundary
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Snapshot of the guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardStatus {
    /// A session holds the guard
    pub is_running: bool,
    /// Id of that session
    pub session_id: Option<SessionId>,
    /// Stop was requested for that session
    pub stop_requested: bool,
}

#[derive(Debug)]
struct ActiveRun {
    id: SessionId,
    stop: StopSignal,
    handle: Option<JoinHandle<()>>,
}

/// Owner of the "one session at a time" rule
#[derive(Debug, Default)]
pub struct SessionGuard {
    active: Mutex<Option<ActiveRun>>,
}

impl SessionGuard {
    /// Create an idle guard
    pub fn new() -> Self {
        Self::default()
    }

    // Holders never leave the slot half-updated, so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim the guard for a new session
    ///
    /// # Errors
    ///
    /// [`BatchError::Busy`] with the running session's id if the guard is held.
    pub fn try_start(self: &Arc<Self>) -> Result<SessionLease, BatchError> {
        let mut active = self.lock();
        if let Some(run) = active.as_ref() {
            return Err(BatchError::Busy {
                session_id: run.id.clone(),
            });
        }

        let id = SessionId::new();
        let stop = StopSignal::new();
        *active = Some(ActiveRun {
            id: id.clone(),
            stop: stop.clone(),
            handle: None,
        });

        Ok(SessionLease {
            guard: Arc::clone(self),
            id,
            stop,
        })
    }

    /// Request the running session to stop; returns its id
    pub fn stop(&self) -> Result<SessionId, BatchError> {
        let active = self.lock();
        let run = active.as_ref().ok_or(BatchError::NotRunning)?;
        run.stop.request();
        tracing::info!("Stop requested for session {}", run.id);
        Ok(run.id.clone())
    }

    /// Current guard state
    pub fn status(&self) -> GuardStatus {
        match self.lock().as_ref() {
            Some(run) => GuardStatus {
                is_running: true,
                session_id: Some(run.id.clone()),
                stop_requested: run.stop.is_requested(),
            },
            None => GuardStatus {
                is_running: false,
                session_id: None,
                stop_requested: false,
            },
        }
    }

    /// Keep the worker handle of session `id`
    ///
    /// Returns `false` (and drops the handle) if that session already released the guard.
    pub fn attach(&self, id: &SessionId, handle: JoinHandle<()>) -> bool {
        match self.lock().as_mut() {
            Some(run) if run.id == *id => {
                run.handle = Some(handle);
                true
            }
            _ => false,
        }
    }

    /// Take the worker handle of the running session, if it is still attached
    pub fn take_handle(&self) -> Option<JoinHandle<()>> {
        self.lock().as_mut().and_then(|run| run.handle.take())
    }

    fn release(&self, id: &SessionId) {
        let mut active = self.lock();
        if active.as_ref().is_some_and(|run| run.id == *id) {
            *active = None;
            tracing::debug!("Session guard released by {}", id);
        }
    }
}

/// Proof of holding the guard; releases it on drop
#[derive(Debug)]
pub struct SessionLease {
    guard: Arc<SessionGuard>,
    id: SessionId,
    stop: StopSignal,
}

impl SessionLease {
    /// Session the lease was issued for
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Stop flag of the session
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.guard.release(&self.id);
    }
}
