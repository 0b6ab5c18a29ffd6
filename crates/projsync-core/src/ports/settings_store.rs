//! Settings store port
//!
//! Opaque durable key/value storage. Values are JSON documents so callers can
//! persist structured data (the per-project sync tree) without the adapter
//! knowing its shape. Errors are adapter-specific, hence `anyhow::Result`.

use serde_json::Value;

/// Port trait for durable key/value settings
#[async_trait::async_trait]
pub trait ISettingsStore: Send + Sync {
    /// Returns the value stored under `key`, if any
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;

    /// Stores `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()>;

    /// Removes `key`; removing a missing key is not an error
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}
