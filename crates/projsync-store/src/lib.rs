//! projsync Store - Durable settings persistence
//!
//! SQLite-based key/value store holding:
//! - The session key and organization
//! - The currently selected project
//! - The per-project Sync Tree (`syncItems`)
//!
//! ## Architecture
//!
//! This crate implements the `ISettingsStore` port from `projsync-core`
//! using SQLite as the storage backend. It is a driven (secondary) adapter
//! in the hexagonal architecture.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use projsync_store::{DatabasePool, SqliteSettingsStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/projsync/settings.db")).await?;
//! let store = SqliteSettingsStore::new(pool.pool().clone());
//! // Use store as ISettingsStore...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod settings;

pub use pool::DatabasePool;
pub use settings::SqliteSettingsStore;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value is not valid JSON
    #[error("Corrupt value for '{key}': {message}")]
    CorruptValue { key: String, message: String },
}
