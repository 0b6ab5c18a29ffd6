//! Remote document sync for a single local file
//!
//! [`DocumentSync`] maps one local file onto its remote document:
//!
//! - **upload / replace**: the remote store has no atomic replace. Every
//!   document carrying the file's [`RemoteName`] is deleted, then the current
//!   content is uploaded as a new document. The local content is read before
//!   any remote mutation, so a vanished or unreadable file never costs the
//!   remote copy.
//! - **delete**: every document with the name is removed; finding none is
//!   success.
//!
//! The document listing is fetched again for every operation and never
//! cached.

use std::path::Path;
use std::sync::Arc;

use projsync_core::domain::{DocumentId, OrganizationId, ProjectId, RemoteName, SyncOutcome};
use projsync_core::ports::{IRemoteDocumentStore, RemoteError, UploadOutcome};
use tracing::{debug, info, warn};

use crate::SyncError;

/// Uploads, replaces and deletes remote documents for local files
#[derive(Clone)]
pub struct DocumentSync {
    remote: Arc<dyn IRemoteDocumentStore>,
    max_file_size: u64,
}

impl DocumentSync {
    /// # Arguments
    /// * `remote` - Remote document store adapter
    /// * `max_file_size` - Files larger than this many bytes are skipped
    pub fn new(remote: Arc<dyn IRemoteDocumentStore>, max_file_size: u64) -> Self {
        Self {
            remote,
            max_file_size,
        }
    }

    /// Uploads `path` as `name`, replacing any document with the same name
    ///
    /// # Returns
    /// - `SyncOutcome::Uploaded` with the new document id
    /// - `SyncOutcome::Skipped` if the file exceeds the size limit or is not
    ///   UTF-8 text; no remote call is made in that case
    ///
    /// # Errors
    /// - `SyncError::IoError` if the file cannot be read
    /// - `SyncError::Remote` if listing, deleting or uploading fails before
    ///   any document was deleted
    /// - `SyncError::ReplaceIncomplete` once a previous document has been
    ///   deleted and the new content did not make it to the remote store,
    ///   whether the upload failed or was declined
    #[tracing::instrument(skip(self))]
    pub async fn sync_file(
        &self,
        organization: &OrganizationId,
        project: &ProjectId,
        path: &Path,
        name: &RemoteName,
    ) -> Result<SyncOutcome, SyncError> {
        let size = tokio::fs::metadata(path).await?.len();
        if let Some(outcome) = self.over_limit(path, size) {
            return Ok(outcome);
        }

        let bytes = tokio::fs::read(path).await?;
        // The file may have grown since it was stat'ed
        if let Some(outcome) = self.over_limit(path, bytes.len() as u64) {
            return Ok(outcome);
        }
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(_) => {
                info!(path = %path.display(), "File is not UTF-8 text, skipping");
                return Ok(SyncOutcome::Skipped {
                    reason: "not valid UTF-8 text".to_string(),
                });
            }
        };

        let existing = self.find_documents(organization, project, name).await?;
        let mut deleted = 0usize;
        for document in &existing {
            debug!(document = %document, "Deleting previous version");
            if let Err(source) = self
                .remote
                .delete_document(organization, project, document)
                .await
            {
                return Err(incomplete_if(deleted > 0, name, source));
            }
            deleted += 1;
        }
        let replaced = deleted > 0;

        let uploaded = self
            .remote
            .upload_document(organization, project, name, &content)
            .await;

        match uploaded {
            Ok(UploadOutcome::Uploaded(document)) => {
                info!(
                    path = %path.display(),
                    document = %document.uuid,
                    replaced,
                    "Uploaded document"
                );
                Ok(SyncOutcome::Uploaded {
                    document: document.uuid,
                    replaced,
                })
            }
            Ok(UploadOutcome::Skipped { reason }) if replaced => {
                warn!(path = %path.display(), %reason, "Upload declined after previous version was deleted");
                Err(SyncError::ReplaceIncomplete {
                    name: name.to_string(),
                    source: RemoteError::Declined(reason),
                })
            }
            Ok(UploadOutcome::Skipped { reason }) => Ok(SyncOutcome::Skipped { reason }),
            Err(source) => Err(incomplete_if(replaced, name, source)),
        }
    }

    /// Skip outcome for a file of `size` bytes above the limit
    fn over_limit(&self, path: &Path, size: u64) -> Option<SyncOutcome> {
        if size <= self.max_file_size {
            return None;
        }
        info!(
            path = %path.display(),
            size,
            limit = self.max_file_size,
            "File exceeds size limit, skipping"
        );
        Some(SyncOutcome::Skipped {
            reason: format!(
                "file is {size} bytes, limit is {} bytes",
                self.max_file_size
            ),
        })
    }

    /// Deletes every remote document named `name`
    ///
    /// Idempotent: a missing document yields `SyncOutcome::AlreadyAbsent`.
    #[tracing::instrument(skip(self))]
    pub async fn delete_remote_file(
        &self,
        organization: &OrganizationId,
        project: &ProjectId,
        name: &RemoteName,
    ) -> Result<SyncOutcome, SyncError> {
        let existing = self.find_documents(organization, project, name).await?;
        if existing.is_empty() {
            debug!("No remote document to delete");
            return Ok(SyncOutcome::AlreadyAbsent);
        }

        for document in &existing {
            self.remote
                .delete_document(organization, project, document)
                .await?;
        }
        info!(count = existing.len(), "Deleted remote document");
        Ok(SyncOutcome::Deleted)
    }

    async fn find_documents(
        &self,
        organization: &OrganizationId,
        project: &ProjectId,
        name: &RemoteName,
    ) -> Result<Vec<DocumentId>, RemoteError> {
        let documents = self.remote.list_documents(organization, project).await?;
        Ok(documents
            .into_iter()
            .filter(|doc| doc.file_name == name.as_str())
            .map(|doc| doc.uuid)
            .collect())
    }
}

/// `ReplaceIncomplete` once a previous version is gone, plain `Remote` otherwise
fn incomplete_if(deleted: bool, name: &RemoteName, source: RemoteError) -> SyncError {
    if deleted {
        SyncError::ReplaceIncomplete {
            name: name.to_string(),
            source,
        }
    } else {
        SyncError::Remote(source)
    }
}
