//! Shared fakes for projsync-sync integration tests
//!
//! - [`FakeRemote`] - in-memory document store recording every call
//! - [`MemorySettings`] - in-memory settings store

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;

use projsync_core::config::{Config, ConfigBuilder};
use projsync_core::domain::{DocumentId, OrganizationId, ProjectId, RemoteName};
use projsync_core::ports::{
    IRemoteDocumentStore, ISettingsStore, ProjectSummary, RemoteDocument, RemoteError,
    UploadOutcome,
};
use projsync_core::usecases::ProjectSettings;

// ============================================================================
// FakeRemote
// ============================================================================

/// A recorded remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Upload(String),
    Delete(DocumentId),
}

#[derive(Default)]
struct RemoteState {
    documents: Vec<(RemoteDocument, String)>,
    calls: Vec<Call>,
    fail_upload: bool,
    fail_list: bool,
    decline_upload: Option<String>,
    deletes_before_failure: Option<usize>,
    latency: Duration,
}

/// In-memory remote document store
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<RemoteState>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds a document without recording a call
    pub fn seed(&self, file_name: &str, content: &str) -> DocumentId {
        let document = RemoteDocument {
            uuid: DocumentId::new(),
            file_name: file_name.to_string(),
        };
        let id = document.uuid;
        self.state
            .lock()
            .unwrap()
            .documents
            .push((document, content.to_string()));
        id
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .documents
            .iter()
            .map(|(doc, _)| doc.file_name.clone())
            .collect()
    }

    pub fn content_of(&self, file_name: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .documents
            .iter()
            .find(|(doc, _)| doc.file_name == file_name)
            .map(|(_, content)| content.clone())
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.state.lock().unwrap().fail_upload = fail;
    }

    pub fn fail_listing(&self, fail: bool) {
        self.state.lock().unwrap().fail_list = fail;
    }

    /// Makes uploads answer `UploadOutcome::Skipped` with `reason`
    pub fn decline_uploads(&self, reason: &str) {
        self.state.lock().unwrap().decline_upload = Some(reason.to_string());
    }

    /// Lets `count` deletes succeed, then fails every further delete
    pub fn fail_deletes_after(&self, count: usize) {
        self.state.lock().unwrap().deletes_before_failure = Some(count);
    }

    /// Delays every upload and delete by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().unwrap().latency = latency;
    }

    async fn wait(&self) {
        let latency = self.state.lock().unwrap().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait::async_trait]
impl IRemoteDocumentStore for FakeRemote {
    async fn list_projects(
        &self,
        _organization: &OrganizationId,
    ) -> Result<Vec<ProjectSummary>, RemoteError> {
        Ok(Vec::new())
    }

    async fn list_documents(
        &self,
        _organization: &OrganizationId,
        _project: &ProjectId,
    ) -> Result<Vec<RemoteDocument>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List);
        if state.fail_list {
            return Err(RemoteError::Transport("connection reset".into()));
        }
        Ok(state.documents.iter().map(|(doc, _)| doc.clone()).collect())
    }

    async fn upload_document(
        &self,
        _organization: &OrganizationId,
        _project: &ProjectId,
        file_name: &RemoteName,
        content: &str,
    ) -> Result<UploadOutcome, RemoteError> {
        self.wait().await;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Upload(file_name.to_string()));
        if state.fail_upload {
            return Err(RemoteError::Status {
                status: 500,
                body: "upload failed".into(),
            });
        }
        if let Some(reason) = state.decline_upload.clone() {
            return Ok(UploadOutcome::Skipped { reason });
        }
        let document = RemoteDocument {
            uuid: DocumentId::new(),
            file_name: file_name.to_string(),
        };
        state.documents.push((document.clone(), content.to_string()));
        Ok(UploadOutcome::Uploaded(document))
    }

    async fn delete_document(
        &self,
        _organization: &OrganizationId,
        _project: &ProjectId,
        document: &DocumentId,
    ) -> Result<(), RemoteError> {
        self.wait().await;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(*document));
        match state.deletes_before_failure {
            Some(0) => {
                return Err(RemoteError::Status {
                    status: 503,
                    body: "delete failed".into(),
                })
            }
            Some(n) => state.deletes_before_failure = Some(n - 1),
            None => {}
        }
        let before = state.documents.len();
        state.documents.retain(|(doc, _)| doc.uuid != *document);
        if state.documents.len() == before {
            return Err(RemoteError::Status {
                status: 404,
                body: "document not found".into(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// MemorySettings
// ============================================================================

/// In-memory settings store
#[derive(Default)]
pub struct MemorySettings(Mutex<HashMap<String, Value>>);

#[async_trait::async_trait]
impl ISettingsStore for MemorySettings {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.0.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.0.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.0.lock().unwrap().remove(key);
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Settings with a stored session and a selected project
pub async fn signed_in_settings() -> (ProjectSettings, OrganizationId, ProjectId) {
    let settings = ProjectSettings::new(Arc::new(MemorySettings::default()));
    let organization = OrganizationId::new();
    let project = ProjectId::new();
    settings
        .store_session("sk-test", &organization)
        .await
        .unwrap();
    settings.set_current_project_id(&project).await.unwrap();
    (settings, organization, project)
}

/// Fast watcher settings; `stability_ms` controls how long live edits wait
pub fn test_config(stability_ms: u64) -> Config {
    ConfigBuilder::new()
        .watcher_poll_interval_ms(25)
        .watcher_stability_threshold_ms(stability_ms)
        .watcher_stability_poll_ms(10)
        .sync_job_timeout_secs(5)
        .build()
}
