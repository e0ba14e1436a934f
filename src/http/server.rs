//! Server bootstrap: storage setup, router assembly, graceful
//! shutdown.

use crate::config::Config;
use crate::http::api::{self, AppState, SharedState};
use crate::storage::{SqliteStorage, StorageHandle};
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Assemble the full application router on top of shared state.
pub fn build_router(state: SharedState) -> Router {
    api::api_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open storage, bind the listen address, and serve until shutdown.
pub async fn start_server(config: &Config) -> Result<()> {
    // Ensure the parent directory exists for the database file. A bare
    // filename has an empty parent, which create_dir_all rejects.
    if let Some(parent) = config.database.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
    }

    let storage = SqliteStorage::open(&config.database)
        .with_context(|| format!("Failed to open database at {}", config.database.display()))?;
    let state: SharedState = Arc::new(AppState {
        storage: StorageHandle::new(storage),
    });

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen))?;
    let local_addr = listener.local_addr()?;
    tracing::info!(
        addr = %local_addr,
        database = %config.database.display(),
        "tracklet listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown requested");
}
