//! Folio Server
//!
//! HTTP trigger surface for batch extraction sessions: start and stop a
//! session, inspect progress, list and resume sessions, flag documents for
//! reprocessing. See [`handlers`] for the routes.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;

use config::ServerConfig;
use folio_batch::{BatchError, BatchService};
use folio_extract::ExtractError;
use folio_store::{SqliteStore, StoreError};
use handlers::{create_router, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Database could not be opened
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Extraction adapter could not be built
    #[error("Extractor error: {0}")]
    Extractor(#[from] ExtractError),

    /// Batch service error
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Open the database, build the adapter and wrap both in a [`BatchService`]
pub fn build_state(config: &ServerConfig) -> Result<AppState, ServerError> {
    let store = SqliteStore::new(&config.database_path)?;
    let adapter = config.extractor.build()?;
    let service = BatchService::new(store, adapter, config.batch.clone())?;
    Ok(AppState {
        service: Arc::new(service),
    })
}

/// Start the HTTP server
///
/// Runs until Ctrl+C. On shutdown a running session is asked to stop and
/// awaited, so it ends at a batch boundary with its checkpoint written.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    // Initialize tracing; RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    info!("Starting Folio server");
    info!("Bind address: {}", config.bind_addr());
    info!("Database: {}", config.database_path.display());
    info!("Session data: {}", config.batch.data_dir.display());

    let state = build_state(&config)?;
    let service = Arc::clone(&state.service);
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Server listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    if let Ok(session_id) = service.stop() {
        info!("Waiting for session {} to reach a batch boundary", session_id);
    }
    service.wait().await?;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
