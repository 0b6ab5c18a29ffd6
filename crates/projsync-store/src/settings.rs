//! SQLite implementation of ISettingsStore
//!
//! One row per key in the `settings` table. Values are stored as JSON text
//! and parsed on read; `updated_at` is an RFC 3339 timestamp.

use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;

use projsync_core::ports::ISettingsStore;

use crate::StoreError;

/// SQLite-backed settings store
#[derive(Clone)]
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Creates a store over an already migrated pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Lists every stored key, sorted
    pub async fn keys(&self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar("SELECT key FROM settings ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ISettingsStore for SqliteSettingsStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match raw {
            Some(text) => {
                let value = serde_json::from_str(&text).map_err(|e| StoreError::CorruptValue {
                    key: key.to_string(),
                    message: e.to_string(),
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        let text = serde_json::to_string(&value)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(&text)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        tracing::debug!(key, bytes = text.len(), "Stored setting");
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let result = sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(key, "Deleted setting");
        }
        Ok(())
    }
}
