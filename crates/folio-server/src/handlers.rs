//! HTTP request handlers for the batch trigger surface.
//!
//! | Method | Path | Action |
//! |--------|------|--------|
//! | GET | `/health` | Liveness |
//! | GET | `/batch/status` | Guard state |
//! | POST | `/batch/start` | Start a session |
//! | POST | `/batch/stop` | Request a stop |
//! | GET | `/batch/overview` | Guard state plus extraction statistics |
//! | GET | `/sessions` | All checkpoints, newest first |
//! | GET | `/sessions/:id` | Checkpoint plus recent log lines |
//! | POST | `/sessions/:id/resume` | Mark a terminated session resumed |
//! | POST | `/documents/reprocess` | Flag documents for reprocessing |

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use folio_batch::{BatchError, BatchService, GuardStatus, StartRequest};
use folio_domain::{MimeTypeStats, ReprocessCriteria};
use folio_store::{CheckpointRecord, SqliteStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Batch trigger surface
    pub service: Arc<BatchService<SqliteStore>>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// A batch session is running
    pub session_running: bool,
}

/// Body of `POST /batch/start`; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBatchRequest {
    /// Documents per batch
    #[serde(default)]
    pub batch_size: Option<usize>,
    /// Only process documents of this MIME type
    #[serde(default)]
    pub mime_type_filter: Option<String>,
}

/// Response of `POST /batch/start`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBatchResponse {
    /// New session id
    pub session_id: String,
    /// Progress log of the session
    pub log_file: String,
    /// Human-readable message
    pub message: String,
}

/// Response of `POST /batch/stop`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopBatchResponse {
    /// Session asked to stop
    pub session_id: String,
    /// Human-readable message
    pub message: String,
}

/// Guard state
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatusResponse {
    /// A session holds the guard
    pub is_running: bool,
    /// Id of that session
    pub current_session_id: Option<String>,
    /// Stop was requested
    pub stop_requested: bool,
}

impl From<GuardStatus> for BatchStatusResponse {
    fn from(status: GuardStatus) -> Self {
        Self {
            is_running: status.is_running,
            current_session_id: status.session_id.map(|id| id.to_string()),
            stop_requested: status.stop_requested,
        }
    }
}

/// Extraction statistics of one MIME type
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MimeTypeStatsResponse {
    /// MIME type, or `all` for the totals row
    pub mime_type: String,
    /// Documents
    pub total: u64,
    /// Documents with text
    pub extracted: u64,
    /// Documents never attempted
    pub not_attempted: u64,
    /// Documents flagged for reprocessing
    pub reprocess_pending: u64,
    /// Documents attempted without text
    pub failed: u64,
    /// Share of documents with text, in percent
    pub percentage: f64,
}

impl From<&MimeTypeStats> for MimeTypeStatsResponse {
    fn from(stats: &MimeTypeStats) -> Self {
        Self {
            mime_type: stats.mime_type.clone(),
            total: stats.total,
            extracted: stats.extracted,
            not_attempted: stats.not_attempted,
            reprocess_pending: stats.reprocess_pending,
            failed: stats.failed,
            percentage: stats.percentage(),
        }
    }
}

/// Response of `GET /batch/overview`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    /// Guard state
    #[serde(flatten)]
    pub status: BatchStatusResponse,
    /// Per-MIME-type statistics
    pub by_mime_type: Vec<MimeTypeStatsResponse>,
    /// Sum over all MIME types
    pub totals: MimeTypeStatsResponse,
}

/// Response of `GET /sessions`
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionListResponse {
    /// Checkpoints, newest first
    pub sessions: Vec<CheckpointRecord>,
}

/// Response of `GET /sessions/:id`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReportResponse {
    /// Latest checkpoint
    #[serde(flatten)]
    pub checkpoint: CheckpointRecord,
    /// Last progress log lines, oldest first
    pub recent_log: Vec<String>,
}

/// Body of `POST /documents/reprocess`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReprocessRequest {
    /// Only documents extracted with this method label
    #[serde(default)]
    pub method: Option<String>,
    /// Only documents of this MIME type
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Include documents already rechecked
    #[serde(default)]
    pub include_rechecked: bool,
    /// Maximum documents to flag
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Response of `POST /documents/reprocess`
#[derive(Debug, Serialize, Deserialize)]
pub struct ReprocessResponse {
    /// Documents moved to reprocess-pending
    pub flagged: u64,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Error from the batch service
    Batch(BatchError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let AppError::Batch(e) = self;
        let status = match &e {
            BatchError::Busy { .. } | BatchError::NotRunning | BatchError::NotTerminal(_) => {
                StatusCode::CONFLICT
            }
            BatchError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            BatchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", e);
        }

        let body = Json(ErrorResponse { error: e.to_string() });
        (status, body).into_response()
    }
}

impl From<BatchError> for AppError {
    fn from(e: BatchError) -> Self {
        AppError::Batch(e)
    }
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        session_running: state.service.guard_status().is_running,
    })
}

/// GET /batch/status
async fn batch_status(State(state): State<AppState>) -> Json<BatchStatusResponse> {
    Json(state.service.guard_status().into())
}

/// POST /batch/start - returns as soon as the session is spawned
async fn start_batch(
    State(state): State<AppState>,
    body: Option<Json<StartBatchRequest>>,
) -> Result<Json<StartBatchResponse>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let started = state.service.start(StartRequest {
        batch_size: request.batch_size,
        mime_type_filter: request.mime_type_filter,
    })?;

    Ok(Json(StartBatchResponse {
        message: format!("Batch session {} started", started.session_id),
        session_id: started.session_id.to_string(),
        log_file: started.log_path.display().to_string(),
    }))
}

/// POST /batch/stop
async fn stop_batch(State(state): State<AppState>) -> Result<Json<StopBatchResponse>, AppError> {
    let session_id = state.service.stop()?;
    Ok(Json(StopBatchResponse {
        message: "Stop requested; the session ends after the current batch".to_string(),
        session_id: session_id.to_string(),
    }))
}

/// GET /batch/overview
async fn overview(State(state): State<AppState>) -> Result<Json<OverviewResponse>, AppError> {
    let overview = state.service.overview()?;
    Ok(Json(OverviewResponse {
        status: overview.guard.into(),
        by_mime_type: overview.extraction.by_mime_type.iter().map(Into::into).collect(),
        totals: (&overview.extraction.totals()).into(),
    }))
}

/// GET /sessions
async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<SessionListResponse>, AppError> {
    Ok(Json(SessionListResponse {
        sessions: state.service.list_sessions()?,
    }))
}

/// GET /sessions/:id
async fn session_report(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionReportResponse>, AppError> {
    let report = state.service.session_report(&session_id)?;
    Ok(Json(SessionReportResponse {
        checkpoint: report.checkpoint,
        recent_log: report.recent_log,
    }))
}

/// POST /sessions/:id/resume
async fn resume_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<CheckpointRecord>, AppError> {
    Ok(Json(state.service.resume(&session_id)?))
}

/// POST /documents/reprocess
async fn flag_for_reprocess(
    State(state): State<AppState>,
    Json(request): Json<ReprocessRequest>,
) -> Result<Json<ReprocessResponse>, AppError> {
    let criteria = ReprocessCriteria {
        method: request.method,
        mime_type: request.mime_type,
        include_rechecked: request.include_rechecked,
        limit: request.limit,
    };
    let flagged = state.service.flag_for_reprocess(&criteria)?;
    Ok(Json(ReprocessResponse { flagged }))
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/health", get(health_check))
        .route("/batch/status", get(batch_status))
        .route("/batch/start", post(start_batch))
        .route("/batch/stop", post(stop_batch))
        .route("/batch/overview", get(overview))
        .route("/sessions", get(list_sessions))
        .route("/sessions/:id", get(session_report))
        .route("/sessions/:id/resume", post(resume_session))
        .route("/documents/reprocess", post(flag_for_reprocess))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use folio_batch::BatchConfig;
    use folio_extract::MockAdapter;
    use tower::ServiceExt; // for oneshot

    fn create_test_state(dir: &tempfile::TempDir) -> AppState {
        let service = BatchService::new(
            SqliteStore::in_memory().unwrap(),
            Arc::new(MockAdapter::default()),
            BatchConfig::with_data_dir(dir.path()),
        )
        .unwrap();
        AppState {
            service: Arc::new(service),
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = create_router(create_test_state(&dir));

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stop_without_session_conflicts() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = create_router(create_test_state(&dir));

        let request = Request::builder()
            .method("POST")
            .uri("/batch/stop")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (BatchError::NotRunning, StatusCode::CONFLICT),
            (BatchError::NotTerminal("x".into()), StatusCode::CONFLICT),
            (BatchError::SessionNotFound("x".into()), StatusCode::NOT_FOUND),
            (BatchError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (BatchError::Store("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(AppError::from(error).into_response().status(), expected);
        }
    }
}
