//! testpulse -- test-execution analytics.
//!
//! Execution records (one run of a named automated test) are ingested by
//! hand or from delimited text, persisted in SQLite, and summarized into
//! per-test metrics, a daily timeline and period-over-period comparisons.

pub mod analysis;
pub mod api;
pub mod config;
pub mod demo;
pub mod ingest;
pub mod record;
pub mod report;
pub mod storage;
pub mod store;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::storage::SqliteBackend;
use crate::store::RecordStore;

/// Open the database and its in-memory snapshot.
pub async fn open(db_path: &str) -> Result<(Arc<SqliteBackend>, RecordStore)> {
    tracing::info!(%db_path, "Initializing database");
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let backend = Arc::new(
        SqliteBackend::open(db_path).with_context(|| format!("failed to open {}", db_path))?,
    );
    let store = RecordStore::load(backend.as_ref())
        .await
        .context("failed to load execution records")?;
    Ok((backend, store))
}

/// Start the HTTP API over the database at `db_path`.
pub async fn serve(bind: &str, db_path: &str, window_days: u32) -> Result<()> {
    let (backend, store) = open(db_path).await?;
    let app = api::router(api::state::AppState::new(store, backend).with_window_days(window_days));

    let addr: std::net::SocketAddr = bind
        .parse()
        .with_context(|| format!("bad bind address {}", bind))?;
    tracing::info!(%addr, "testpulse listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
