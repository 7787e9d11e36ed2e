use sqlx::SqlitePool;

use super::{decode, LocalStore, StorageError, STORAGE_KEY};
use crate::models::Document;

/// Document stored as one JSON value in the `kv_store` table.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    key: String,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_key(pool, STORAGE_KEY)
    }

    pub fn with_key(pool: SqlitePool, key: impl Into<String>) -> Self {
        Self {
            pool,
            key: key.into(),
        }
    }

    async fn write_raw(&self, value: &str, updated_at: i64) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.key)
        .bind(value)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl LocalStore for SqliteStore {
    async fn read(&self) -> Result<Option<Document>, StorageError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(&self.key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|(value,)| decode(&value)))
    }

    async fn write(&self, doc: &Document) -> Result<(), StorageError> {
        let value = serde_json::to_string(doc)?;
        self.write_raw(&value, doc.updated_at()).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(&self.key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
