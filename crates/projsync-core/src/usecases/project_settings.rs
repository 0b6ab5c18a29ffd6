//! Per-project settings use case
//!
//! Typed access to the values the application keeps in the settings store:
//!
//! | Key                | Value                                         |
//! |--------------------|-----------------------------------------------|
//! | `currentProjectId` | project UUID string                           |
//! | `syncItems`        | object mapping project UUID → nested tree     |
//! | `sessionKey`       | session cookie value                          |
//! | `organizationUUID` | organization UUID string                      |

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::domain::{OrganizationId, ProjectId, SyncTree, TreeNode};
use crate::ports::ISettingsStore;

pub const CURRENT_PROJECT_KEY: &str = "currentProjectId";
pub const SYNC_ITEMS_KEY: &str = "syncItems";
pub const SESSION_KEY: &str = "sessionKey";
pub const ORGANIZATION_KEY: &str = "organizationUUID";

/// Stored credentials for the remote document store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_key: String,
    pub organization: OrganizationId,
}

/// Typed wrapper over [`ISettingsStore`]
#[derive(Clone)]
pub struct ProjectSettings {
    store: Arc<dyn ISettingsStore>,
}

impl ProjectSettings {
    pub fn new(store: Arc<dyn ISettingsStore>) -> Self {
        Self { store }
    }

    /// Returns the selected project, if any
    ///
    /// # Errors
    ///
    /// Fails if the store is unreadable or holds a malformed id
    pub async fn current_project_id(&self) -> Result<Option<ProjectId>> {
        match self.get_string(CURRENT_PROJECT_KEY).await? {
            Some(raw) => Ok(Some(
                raw.parse().context("Stored current project id is invalid")?,
            )),
            None => Ok(None),
        }
    }

    pub async fn set_current_project_id(&self, project: &ProjectId) -> Result<()> {
        self.store
            .set(CURRENT_PROJECT_KEY, Value::String(project.to_string()))
            .await
            .context("Failed to store current project id")
    }

    /// Returns the persisted Sync Tree of `project` (empty when none)
    pub async fn sync_items(&self, project: &ProjectId) -> Result<SyncTree> {
        let all = self.all_sync_items().await?;
        Ok(all
            .get(&project.to_string())
            .map(|nodes| SyncTree::from_nodes(nodes))
            .unwrap_or_default())
    }

    /// Persists the Sync Tree of `project`, leaving other projects untouched
    pub async fn set_sync_items(&self, project: &ProjectId, tree: &SyncTree) -> Result<()> {
        let mut all = self.all_sync_items().await?;
        all.insert(project.to_string(), tree.to_nodes());
        debug!(project = %project, entries = tree.len(), "Saving sync items");
        self.write_sync_items(&all).await
    }

    /// Drops the Sync Tree of `project`
    pub async fn clear_sync_items(&self, project: &ProjectId) -> Result<()> {
        let mut all = self.all_sync_items().await?;
        if all.remove(&project.to_string()).is_some() {
            self.write_sync_items(&all).await?;
        }
        Ok(())
    }

    /// Returns the stored session, if both key and organization are present
    pub async fn session(&self) -> Result<Option<Session>> {
        let key = self.get_string(SESSION_KEY).await?;
        let org = self.get_string(ORGANIZATION_KEY).await?;
        match (key, org) {
            (Some(session_key), Some(org)) => Ok(Some(Session {
                session_key,
                organization: org.parse().context("Stored organization id is invalid")?,
            })),
            _ => Ok(None),
        }
    }

    /// Stores session credentials
    ///
    /// # Errors
    ///
    /// Rejects an empty session key
    pub async fn store_session(&self, session_key: &str, organization: &OrganizationId) -> Result<()> {
        let session_key = session_key.trim();
        if session_key.is_empty() {
            bail!("Session key must not be empty");
        }
        self.store
            .set(SESSION_KEY, Value::String(session_key.to_string()))
            .await
            .context("Failed to store session key")?;
        self.store
            .set(ORGANIZATION_KEY, Value::String(organization.to_string()))
            .await
            .context("Failed to store organization id")
    }

    pub async fn clear_session(&self) -> Result<()> {
        self.store.delete(SESSION_KEY).await?;
        self.store.delete(ORGANIZATION_KEY).await?;
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.store.get(key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => bail!("Setting '{key}' is not a string: {other}"),
        }
    }

    async fn all_sync_items(&self) -> Result<BTreeMap<String, Vec<TreeNode>>> {
        match self.store.get(SYNC_ITEMS_KEY).await? {
            None | Some(Value::Null) => Ok(BTreeMap::new()),
            Some(value) => serde_json::from_value(value).context("Stored sync items are malformed"),
        }
    }

    async fn write_sync_items(&self, all: &BTreeMap<String, Vec<TreeNode>>) -> Result<()> {
        let value = serde_json::to_value(all)?;
        self.store
            .set(SYNC_ITEMS_KEY, value)
            .await
            .context("Failed to store sync items")
    }
}
