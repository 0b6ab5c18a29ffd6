//! ApiDocumentStore - IRemoteDocumentStore implementation over HTTP
//!
//! Wraps the [`ApiClient`] to fulfil the
//! [`IRemoteDocumentStore`](projsync_core::ports::IRemoteDocumentStore) port.
//!
//! ## Design Notes
//!
//! - Content larger than the configured upload limit is refused with
//!   [`UploadOutcome::Skipped`] before any request is sent.
//! - [`ApiError`](crate::ApiError) values are converted into
//!   [`RemoteError`] at this boundary.

use projsync_core::config::DEFAULT_MAX_FILE_SIZE;
use projsync_core::domain::{DocumentId, OrganizationId, ProjectId, RemoteName};
use projsync_core::ports::{
    IRemoteDocumentStore, ProjectSummary, RemoteDocument, RemoteError, UploadOutcome,
};
use tracing::{debug, info};

use crate::client::ApiClient;

/// Remote document store backed by the HTTP API
pub struct ApiDocumentStore {
    client: ApiClient,
    max_upload_bytes: u64,
}

impl ApiDocumentStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            max_upload_bytes: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Sets the largest content accepted by `upload_document`
    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Returns a reference to the underlying client
    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl IRemoteDocumentStore for ApiDocumentStore {
    async fn list_projects(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<ProjectSummary>, RemoteError> {
        Ok(self.client.list_projects(organization).await?)
    }

    async fn list_documents(
        &self,
        organization: &OrganizationId,
        project: &ProjectId,
    ) -> Result<Vec<RemoteDocument>, RemoteError> {
        let documents = self.client.list_documents(organization, project).await?;
        debug!(%project, count = documents.len(), "Listed documents");
        Ok(documents)
    }

    async fn upload_document(
        &self,
        organization: &OrganizationId,
        project: &ProjectId,
        file_name: &RemoteName,
        content: &str,
    ) -> Result<UploadOutcome, RemoteError> {
        let size = content.len() as u64;
        if size > self.max_upload_bytes {
            info!(file_name = %file_name, size, "Content exceeds upload limit, not sending");
            return Ok(UploadOutcome::Skipped {
                reason: format!(
                    "content is {size} bytes, limit is {} bytes",
                    self.max_upload_bytes
                ),
            });
        }

        let document = self
            .client
            .create_document(organization, project, file_name.as_str(), content)
            .await?;
        Ok(UploadOutcome::Uploaded(document))
    }

    async fn delete_document(
        &self,
        organization: &OrganizationId,
        project: &ProjectId,
        document: &DocumentId,
    ) -> Result<(), RemoteError> {
        Ok(self
            .client
            .delete_document(organization, project, document)
            .await?)
    }
}
