//! Session module - one run of the batch scheduler

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as Unix seconds
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Opaque identifier of a batch session
///
/// Generated from a UUIDv7 in simple (unhyphenated) form, so identifiers
/// sort by creation time and are safe to embed in file paths.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh session id
    ///
    /// # Examples
    ///
    /// ```
    /// use folio_domain::SessionId;
    ///
    /// let id = SessionId::new();
    /// assert_eq!(id.as_str().len(), 32);
    /// assert_eq!(SessionId::parse(id.as_str()).unwrap(), id);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().simple().to_string())
    }

    /// Parse a session id supplied from outside
    ///
    /// Only ASCII alphanumerics, `-` and `_` are accepted, up to 64 characters.
    pub fn parse(s: &str) -> Result<Self, String> {
        if s.is_empty() || s.len() > 64 {
            return Err(format!("Invalid session id length: {}", s.len()));
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(format!("Invalid session id: {}", s));
        }
        Ok(Self(s.to_string()))
    }

    /// Borrow the id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Created, loop not yet started
    Initialized,

    /// Loop running
    Processing,

    /// No pending documents remained
    Completed,

    /// Stop request observed at a batch boundary
    Stopped,

    /// Fatal error ended the loop
    Failed,

    /// Terminated session marked as resumed by an operator
    Resumed,
}

impl SessionStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Initialized => "initialized",
            SessionStatus::Processing => "processing",
            SessionStatus::Completed => "completed",
            SessionStatus::Stopped => "stopped",
            SessionStatus::Failed => "failed",
            SessionStatus::Resumed => "resumed",
        }
    }

    /// Parse a status from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "initialized" => Some(SessionStatus::Initialized),
            "processing" => Some(SessionStatus::Processing),
            "completed" => Some(SessionStatus::Completed),
            "stopped" => Some(SessionStatus::Stopped),
            "failed" => Some(SessionStatus::Failed),
            "resumed" => Some(SessionStatus::Resumed),
            _ => None,
        }
    }

    /// The loop has ended for this session
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed
                | SessionStatus::Stopped
                | SessionStatus::Failed
                | SessionStatus::Resumed
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid session status: {}", s))
    }
}

/// Outcomes gathered since the last commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTally {
    /// Documents that ended in a success state
    pub success: u64,
    /// Documents whose attempt failed
    pub errors: u64,
}

impl SessionTally {
    /// Number of documents in the tally
    pub fn total(&self) -> u64 {
        self.success + self.errors
    }

    /// Nothing recorded
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Cumulative counters of a session
///
/// Counters only grow, and `processed_in_session` always equals
/// `success_count + error_count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounters {
    /// Documents known to the store (matching the filter) at session start
    pub total_documents: u64,

    /// Documents committed by this session
    pub processed_in_session: u64,

    /// Committed successes
    pub success_count: u64,

    /// Committed failures
    pub error_count: u64,

    /// Number of the batch currently (or last) processed, starting at 1
    pub current_batch_number: u64,
}

impl SessionCounters {
    /// Fold a committed tally into the counters
    pub fn apply(&mut self, tally: SessionTally) {
        self.success_count += tally.success;
        self.error_count += tally.errors;
        self.processed_in_session += tally.total();
    }
}

/// A batch session and its durable progress
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Identifier
    pub id: SessionId,

    /// Lifecycle status
    pub status: SessionStatus,

    /// Cumulative counters
    pub counters: SessionCounters,

    /// Maximum documents fetched per batch
    pub batch_size: usize,

    /// Restrict the run to one MIME type
    pub mime_type_filter: Option<String>,

    /// Unix seconds when the session was created
    pub started_at: u64,

    /// Unix seconds of the last batch commit
    pub last_batch_at: Option<u64>,

    /// Unix seconds when the session became terminal
    pub ended_at: Option<u64>,

    /// Unix seconds of the resume marker
    pub resumed_at: Option<u64>,

    /// Fatal error text when the session failed
    pub error: Option<String>,
}

impl Session {
    /// Create a new session in `Initialized` status
    pub fn new(
        id: SessionId,
        batch_size: usize,
        mime_type_filter: Option<String>,
        total_documents: u64,
        started_at: u64,
    ) -> Self {
        Self {
            id,
            status: SessionStatus::Initialized,
            counters: SessionCounters {
                total_documents,
                ..Default::default()
            },
            batch_size,
            mime_type_filter,
            started_at,
            last_batch_at: None,
            ended_at: None,
            resumed_at: None,
            error: None,
        }
    }

    /// Move to `Processing`
    pub fn begin_processing(&mut self) -> Result<(), String> {
        if self.status != SessionStatus::Initialized {
            return Err(format!("Cannot start processing from {}", self.status));
        }
        self.status = SessionStatus::Processing;
        Ok(())
    }

    /// Record a successful commit of `tally`
    pub fn record_commit(&mut self, tally: SessionTally, now: u64) {
        self.counters.apply(tally);
        self.last_batch_at = Some(now);
    }

    /// Enter a terminal status; allowed exactly once
    pub fn finish(&mut self, status: SessionStatus, now: u64) -> Result<(), String> {
        if self.status.is_terminal() {
            return Err(format!("Session {} already ended as {}", self.id, self.status));
        }
        if !matches!(
            status,
            SessionStatus::Completed | SessionStatus::Stopped | SessionStatus::Failed
        ) {
            return Err(format!("{} is not an end status", status));
        }
        self.status = status;
        self.ended_at = Some(now);
        Ok(())
    }

    /// End the session as `Failed` with the given error text
    pub fn fail(&mut self, error: impl Into<String>, now: u64) -> Result<(), String> {
        self.finish(SessionStatus::Failed, now)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Set the resume marker on a terminated session
    pub fn mark_resumed(&mut self, now: u64) -> Result<(), String> {
        if !self.status.is_terminal() {
            return Err(format!("Session {} is still {}", self.id, self.status));
        }
        self.status = SessionStatus::Resumed;
        self.resumed_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(SessionId::new(), 10, None, 25, 1_000)
    }

    #[test]
    fn test_session_id_format() {
        let id = SessionId::new();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_session_id_chronological() {
        let a = SessionId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = SessionId::new();
        assert!(a < b);
    }

    #[test]
    fn test_session_id_rejects_paths() {
        assert!(SessionId::parse("../etc").is_err());
        assert!(SessionId::parse("a/b").is_err());
        assert!(SessionId::parse("").is_err());
        assert!(SessionId::parse("abc123de").is_ok());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            SessionStatus::Initialized,
            SessionStatus::Processing,
            SessionStatus::Completed,
            SessionStatus::Stopped,
            SessionStatus::Failed,
            SessionStatus::Resumed,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
        assert!("running".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn test_counters_invariant() {
        let mut s = session();
        s.record_commit(SessionTally { success: 7, errors: 3 }, 1_010);
        s.record_commit(SessionTally { success: 4, errors: 1 }, 1_020);

        let c = s.counters;
        assert_eq!(c.processed_in_session, 15);
        assert_eq!(c.processed_in_session, c.success_count + c.error_count);
        assert_eq!(s.last_batch_at, Some(1_020));
    }

    #[test]
    fn test_finish_exactly_once() {
        let mut s = session();
        s.begin_processing().unwrap();
        s.finish(SessionStatus::Completed, 2_000).unwrap();
        assert_eq!(s.ended_at, Some(2_000));

        assert!(s.finish(SessionStatus::Stopped, 2_001).is_err());
        assert_eq!(s.status, SessionStatus::Completed);
    }

    #[test]
    fn test_finish_rejects_non_terminal() {
        let mut s = session();
        assert!(s.finish(SessionStatus::Processing, 2_000).is_err());
    }

    #[test]
    fn test_fail_records_error() {
        let mut s = session();
        s.begin_processing().unwrap();
        s.fail("disk full", 3_000).unwrap();
        assert_eq!(s.status, SessionStatus::Failed);
        assert_eq!(s.error.as_deref(), Some("disk full"));
    }

    #[test]
    fn test_resume_requires_terminal() {
        let mut s = session();
        assert!(s.mark_resumed(5).is_err());

        s.begin_processing().unwrap();
        s.finish(SessionStatus::Stopped, 10).unwrap();
        s.mark_resumed(20).unwrap();
        assert_eq!(s.status, SessionStatus::Resumed);
        assert_eq!(s.resumed_at, Some(20));
    }
}
