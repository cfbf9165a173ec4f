//! Server module for Mockdeck
//!
//! Wires the document store and the WebSocket relay into an axum router
//! and runs it.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use mockdeck_canvas::{
    document_ws_handler, Document, DocumentStore, RelayState, SqliteDocumentStore,
};

/// Run the relay server until interrupted.
pub async fn run(host: &str, port: u16, database_url: &str) -> Result<()> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to open database")?;

    let store = Arc::new(SqliteDocumentStore::new(pool));
    store.init().await.context("failed to initialize schema")?;

    let relay = Arc::new(RelayState::new());

    let app = Router::new()
        .route("/ws/documents/:document_id", get(document_ws_handler))
        .with_state(relay)
        .merge(
            Router::new()
                .route("/health", get(health))
                .route("/api/documents/:document_id", get(get_document))
                .with_state(store),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

/// Liveness probe.
async fn health() -> &'static str {
    "ok"
}

/// Serve the stored snapshot of a document. Missing documents yield the
/// default single-screen document, same as the editors see on open.
async fn get_document(
    Path(document_id): Path<Uuid>,
    State(store): State<Arc<SqliteDocumentStore>>,
) -> Json<Document> {
    let document = store
        .load(document_id)
        .await
        .unwrap_or_else(|_| Document::with_default_screen());
    Json(document)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        info!("shutdown signal listener failed, exiting");
    }
    info!("shutting down");
}
