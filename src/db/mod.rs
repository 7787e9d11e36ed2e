//! Local persistence of the planner document.

mod memory_store;
mod sqlite_store;

pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteStore;

use std::future::Future;
use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

use crate::models::Document;

/// Fixed key the document is stored under.
pub const STORAGE_KEY: &str = "macroplan.state.v2";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Local store lock poisoned")]
    Poisoned,
}

/// Durable storage for the whole document on this device.
///
/// A stored value that cannot be parsed reads as absent.
pub trait LocalStore: Send + Sync + 'static {
    fn read(&self) -> impl Future<Output = Result<Option<Document>, StorageError>> + Send;

    fn write(&self, doc: &Document) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Removes the stored document.
    fn clear(&self) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Parses a stored value, treating corrupt data as absent.
fn decode(raw: &str) -> Option<Document> {
    match serde_json::from_str(raw) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::warn!(error = %e, "Stored document is unreadable, ignoring it");
            None
        }
    }
}

/// Initialize the database connection pool and run migrations
pub async fn init_db(path: &Path) -> Result<SqlitePool, StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());
    let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_db_creates_tables() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("test.db");

        let pool = init_db(&db_path).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert!(table_names.contains(&"kv_store"));
    }

    #[test]
    fn test_decode_corrupt_value() {
        assert!(decode("{not json").is_none());
        assert!(decode(r#"{"foods": []}"#).is_none());
    }
}
