//! Integration tests for the HTTP trigger surface

use axum::{
    body::{Body, Bytes},
    http::{Request, StatusCode},
    Router,
};
use folio_batch::{BatchConfig, BatchService};
use folio_domain::{DocumentId, ExtractionState, NewDocument};
use folio_extract::MockAdapter;
use folio_server::handlers::{
    create_router, AppState, BatchStatusResponse, ErrorResponse, HealthCheckResponse,
    OverviewResponse, ReprocessResponse, SessionListResponse, SessionReportResponse,
    StartBatchResponse,
};
use folio_store::{CheckpointRecord, SqliteStore};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot

/// Helper to create test application state with `count` pending PDFs
fn create_test_state(dir: &TempDir, count: usize) -> (AppState, SqliteStore) {
    let store = SqliteStore::in_memory().unwrap();
    for i in 1..=count {
        store
            .insert_document(&NewDocument {
                external_file_id: format!("file-{}", i),
                name: format!("doc-{}.pdf", i),
                mime_type: "application/pdf".to_string(),
            })
            .unwrap();
    }

    let service = BatchService::new(
        store.clone(),
        Arc::new(MockAdapter::new("extracted text", "improved_pdfpig")),
        BatchConfig::with_data_dir(dir.path()),
    )
    .unwrap();

    (
        AppState {
            service: Arc::new(service),
        },
        store,
    )
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Bytes) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes)
}

fn parse<T: DeserializeOwned>(bytes: &[u8]) -> T {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn test_health_check_endpoint() {
    let dir = TempDir::new().unwrap();
    let (state, _) = create_test_state(&dir, 0);
    let app = create_router(state);

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let health: HealthCheckResponse = parse(&body);
    assert_eq!(health.status, "healthy");
    assert!(!health.session_running);
}

#[tokio::test]
async fn test_start_run_and_report() {
    let dir = TempDir::new().unwrap();
    let (state, _) = create_test_state(&dir, 25);
    let service = Arc::clone(&state.service);
    let app = create_router(state);

    let (status, body) = send(&app, "POST", "/batch/start", Some(r#"{"batchSize": 10}"#)).await;
    assert_eq!(status, StatusCode::OK);
    let started: StartBatchResponse = parse(&body);
    assert_eq!(started.session_id.len(), 32);
    assert!(started.log_file.ends_with("batch_log.txt"));

    service.wait().await.unwrap();

    let uri = format!("/sessions/{}", started.session_id);
    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let report: SessionReportResponse = parse(&body);
    assert_eq!(report.checkpoint.status, "completed");
    assert_eq!(report.checkpoint.current_batch, 3);
    assert_eq!(report.checkpoint.success_count, 25);
    assert!(report.recent_log.len() <= 20);
    assert!(report.recent_log.last().unwrap().contains("Summary: 25 processed"));

    // Checkpoint fields are camelCase on the wire
    let raw: serde_json::Value = parse(&body);
    assert_eq!(raw["sessionId"], started.session_id.as_str());
    assert_eq!(raw["processedInSession"], 25);
    assert!(raw["recentLog"].is_array());

    let (status, body) = send(&app, "GET", "/batch/status", None).await;
    assert_eq!(status, StatusCode::OK);
    let guard: BatchStatusResponse = parse(&body);
    assert!(!guard.is_running);
    assert!(guard.current_session_id.is_none());
}

#[tokio::test]
async fn test_start_without_body_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let (state, _) = create_test_state(&dir, 3);
    let service = Arc::clone(&state.service);
    let app = create_router(state);

    let (status, body) = send(&app, "POST", "/batch/start", None).await;
    assert_eq!(status, StatusCode::OK);
    let started: StartBatchResponse = parse(&body);
    service.wait().await.unwrap();

    let (_, body) = send(&app, "GET", &format!("/sessions/{}", started.session_id), None).await;
    let report: SessionReportResponse = parse(&body);
    assert_eq!(report.checkpoint.batch_size, 10);
    assert_eq!(report.checkpoint.processed_in_session, 3);
}

#[tokio::test]
async fn test_invalid_batch_size_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let (state, _) = create_test_state(&dir, 3);
    let app = create_router(state);

    let (status, body) = send(&app, "POST", "/batch/start", Some(r#"{"batchSize": 0}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = parse(&body);
    assert!(error.error.contains("batch size"));

    let (_, body) = send(&app, "GET", "/batch/status", None).await;
    let guard: BatchStatusResponse = parse(&body);
    assert!(!guard.is_running);
}

#[tokio::test]
async fn test_stop_without_session_conflicts() {
    let dir = TempDir::new().unwrap();
    let (state, _) = create_test_state(&dir, 0);
    let app = create_router(state);

    let (status, body) = send(&app, "POST", "/batch/stop", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let error: ErrorResponse = parse(&body);
    assert_eq!(error.error, "No batch session is running");
}

#[tokio::test]
async fn test_unknown_and_malformed_session_ids() {
    let dir = TempDir::new().unwrap();
    let (state, _) = create_test_state(&dir, 0);
    let app = create_router(state);

    let (status, _) = send(&app, "GET", "/sessions/0123456789abcdef", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", "/sessions/0123456789abcdef/resume", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/sessions/not%20valid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_and_resume() {
    let dir = TempDir::new().unwrap();
    let (state, _) = create_test_state(&dir, 2);
    let service = Arc::clone(&state.service);
    let app = create_router(state);

    let (_, body) = send(&app, "POST", "/batch/start", None).await;
    let started: StartBatchResponse = parse(&body);
    service.wait().await.unwrap();

    let (status, body) = send(&app, "GET", "/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    let list: SessionListResponse = parse(&body);
    assert_eq!(list.sessions.len(), 1);
    assert_eq!(list.sessions[0].session_id, started.session_id);

    let uri = format!("/sessions/{}/resume", started.session_id);
    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let record: CheckpointRecord = parse(&body);
    assert_eq!(record.status, "resumed");
    assert!(record.resume_time.is_some());
}

#[tokio::test]
async fn test_overview_and_reprocess() {
    let dir = TempDir::new().unwrap();
    let (state, store) = create_test_state(&dir, 3);
    let app = create_router(state);

    store
        .set_extraction(
            DocumentId::new(1),
            Some("old text"),
            &ExtractionState::Succeeded {
                method: "basic_pdfpig".to_string(),
                rechecked: false,
            },
        )
        .unwrap();

    let (status, body) = send(&app, "GET", "/batch/overview", None).await;
    assert_eq!(status, StatusCode::OK);
    let overview: OverviewResponse = parse(&body);
    assert!(!overview.status.is_running);
    assert_eq!(overview.by_mime_type.len(), 1);
    assert_eq!(overview.totals.total, 3);
    assert_eq!(overview.totals.extracted, 1);
    assert_eq!(overview.totals.not_attempted, 2);
    assert_eq!(overview.totals.percentage, 33.33);

    let (status, body) = send(
        &app,
        "POST",
        "/documents/reprocess",
        Some(r#"{"method": "basic_pdfpig", "limit": 5}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let flagged: ReprocessResponse = parse(&body);
    assert_eq!(flagged.flagged, 1);

    let doc = store.get_document(DocumentId::new(1)).unwrap().unwrap();
    assert_eq!(
        doc.extraction_state,
        ExtractionState::ReprocessPending {
            prior_length: 8,
            prior_method: "basic_pdfpig".to_string()
        }
    );

    let (status, _) = send(&app, "POST", "/documents/reprocess", Some(r#"{"limit": 0}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
