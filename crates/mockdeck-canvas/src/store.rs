//! Document Store
//!
//! Persistence for canvas documents. The store is deliberately forgiving
//! on the read path: a missing row or malformed stored JSON yields the
//! default single-screen document instead of failing the caller, so a
//! corrupted project never locks a user out of the editor.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use tracing::warn;
use uuid::Uuid;

use crate::document::Document;
use crate::error::Result;

/// Persistent storage for full document snapshots.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a document snapshot.
    ///
    /// Malformed or absent stored state yields a default single-screen
    /// document; only infrastructure failures (database down) error.
    async fn load(&self, document_id: Uuid) -> Result<Document>;

    /// Persist a full document snapshot.
    async fn save(&self, document_id: Uuid, document: &Document) -> Result<()>;
}

/// SQLite-backed document store.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Create a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                document_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete a stored document. Returns whether a row was removed.
    pub async fn delete(&self, document_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(document_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn load(&self, document_id: Uuid) -> Result<Document> {
        let row = sqlx::query("SELECT document_json FROM documents WHERE id = ?")
            .bind(document_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(Document::with_default_screen());
        };

        let document_json: String = row.get("document_json");
        let mut document = match serde_json::from_str::<Document>(&document_json) {
            Ok(doc) if !doc.screens.is_empty() => doc,
            Ok(_) => {
                warn!(%document_id, "stored document has no screens, using default");
                return Ok(Document::with_default_screen());
            }
            Err(err) => {
                warn!(%document_id, error = %err, "stored document is malformed, using default");
                return Ok(Document::with_default_screen());
            }
        };

        // The cursor is client-local state, not part of the snapshot.
        document.current_screen_id = document.screens.first().map(|s| s.id.clone());
        Ok(document)
    }

    async fn save(&self, document_id: Uuid, document: &Document) -> Result<()> {
        let document_json = serde_json::to_string(document)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO documents (id, document_json, updated_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(document_id.to_string())
        .bind(&document_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
