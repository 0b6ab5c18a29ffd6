//! Subcommand implementations
//!
//! Every command receives a [`CliContext`] holding the output format and the
//! loaded configuration, and opens the adapters it needs through the helpers
//! below.

pub mod auth;
pub mod config;
pub mod items;
pub mod projects;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use projsync_api::client::ApiClient;
use projsync_api::provider::ApiDocumentStore;
use projsync_core::config::Config;
use projsync_core::domain::ProjectId;
use projsync_core::usecases::{ProjectSettings, Session};
use projsync_store::{DatabasePool, SqliteSettingsStore};
use tracing::debug;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Global state shared by all commands
pub struct CliContext {
    pub format: OutputFormat,
    pub config: Config,
    pub config_path: PathBuf,
}

impl CliContext {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    /// Opens the settings database named in the configuration
    pub async fn settings(&self) -> Result<ProjectSettings> {
        let path = &self.config.storage.database;
        let pool = DatabasePool::new(path)
            .await
            .with_context(|| format!("Failed to open settings database {}", path.display()))?;
        debug!(path = %path.display(), "Opened settings database");
        Ok(ProjectSettings::new(Arc::new(SqliteSettingsStore::new(
            pool.pool().clone(),
        ))))
    }

    /// Builds the remote document store client for `session`
    pub fn remote(&self, session: &Session) -> Result<ApiDocumentStore> {
        let client = ApiClient::new(session.session_key.clone(), &self.config.remote)
            .context("Failed to create API client")?;
        Ok(ApiDocumentStore::new(client)
            .with_max_upload_bytes(self.config.sync.max_file_size_bytes))
    }
}

/// Returns the stored session or an error telling the user how to create one
pub async fn require_session(settings: &ProjectSettings) -> Result<Session> {
    settings
        .session()
        .await?
        .context("No session stored. Run 'projsync auth set' first.")
}

/// Returns the selected project or an error telling the user how to pick one
pub async fn require_project(settings: &ProjectSettings) -> Result<ProjectId> {
    settings
        .current_project_id()
        .await?
        .context("No project selected. Run 'projsync projects use <id>' first.")
}
