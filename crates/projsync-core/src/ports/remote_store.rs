//! Remote document store port (driven/secondary port)
//!
//! The remote side of sync: a collection of text documents per project,
//! scoped to an organization. Documents are identified by a namespaced file
//! name (see [`RemoteName`](crate::domain::RemoteName)); the store offers no
//! atomic replace, only list, upload and delete.
//!
//! ## Design Notes
//!
//! - Returns [`RemoteError`] rather than `anyhow::Error` because the sync
//!   orchestrator turns every remote failure into a per-path error status and
//!   reports the transport/status detail.
//! - Uses `#[async_trait]` for async trait methods.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::newtypes::{DocumentId, OrganizationId, ProjectId, RemoteName};

// ============================================================================
// DTOs
// ============================================================================

/// A project visible to the organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub uuid: ProjectId,
    pub name: String,
}

/// A document stored in a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub uuid: DocumentId,
    pub file_name: String,
}

/// Result of an upload request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The document was created
    Uploaded(RemoteDocument),
    /// The store declined the content without a network call (e.g. too large)
    Skipped { reason: String },
}

// ============================================================================
// RemoteError
// ============================================================================

/// Failure of a remote document store call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The request never produced a response (DNS, TLS, connection reset...)
    #[error("transport error: {0}")]
    Transport(String),

    /// The session was rejected
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Non-2xx response
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// A 2xx response whose body could not be understood
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The store declined to accept the content
    #[error("upload declined: {0}")]
    Declined(String),
}

// ============================================================================
// IRemoteDocumentStore trait
// ============================================================================

/// Port trait for remote project document operations
#[async_trait::async_trait]
pub trait IRemoteDocumentStore: Send + Sync {
    /// Lists the projects of an organization
    async fn list_projects(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<ProjectSummary>, RemoteError>;

    /// Lists every document of a project
    ///
    /// The listing is authoritative; callers re-fetch it before each
    /// mutating decision instead of caching it.
    async fn list_documents(
        &self,
        organization: &OrganizationId,
        project: &ProjectId,
    ) -> Result<Vec<RemoteDocument>, RemoteError>;

    /// Creates a new document named `file_name`
    ///
    /// # Arguments
    /// * `organization` - Owning organization
    /// * `project` - Target project
    /// * `file_name` - Namespaced remote name, `<root>/<relative path>`
    /// * `content` - Document text
    ///
    /// # Returns
    /// The created document, or [`UploadOutcome::Skipped`] when the
    /// implementation refuses the content before sending it
    async fn upload_document(
        &self,
        organization: &OrganizationId,
        project: &ProjectId,
        file_name: &RemoteName,
        content: &str,
    ) -> Result<UploadOutcome, RemoteError>;

    /// Deletes a document by id
    async fn delete_document(
        &self,
        organization: &OrganizationId,
        project: &ProjectId,
        document: &DocumentId,
    ) -> Result<(), RemoteError>;
}
