//! projsync Sync - Watch-driven document synchronization
//!
//! Provides:
//! - A FIFO job queue executing one remote operation at a time
//! - A polling file watcher with a write-stability debounce
//! - Mapping of local files to remote documents (replace and delete)
//! - The sync orchestrator tying watcher, queue and status tracking together
//!
//! ## Modules
//!
//! - [`queue`] - Serialized job executor with optional per-job timeout
//! - [`watcher`] - Polling watcher and [`StabilityQueue`](watcher::StabilityQueue)
//! - [`remote_sync`] - Upload/replace/delete of a single file's document
//! - [`orchestrator`] - [`SyncOrchestrator`](orchestrator::SyncOrchestrator) and its event stream

pub mod orchestrator;
pub mod queue;
pub mod remote_sync;
pub mod watcher;

use std::path::PathBuf;
use std::time::Duration;

use projsync_core::domain::DomainError;
use projsync_core::ports::RemoteError;
use thiserror::Error;

/// Errors that can occur while syncing a single file
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error occurred while reading the local file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// An event arrived for a path outside every configured sync root
    #[error("No sync root found for {0}")]
    NoSyncRoot(PathBuf),

    /// A domain-level error propagated from projsync-core
    #[error("Domain error: {0}")]
    DomainError(#[from] DomainError),

    /// The remote document store rejected or failed a call
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// The old document was deleted but the new content was not uploaded
    #[error("Replace of '{name}' incomplete, previous document deleted but upload failed: {source}")]
    ReplaceIncomplete {
        name: String,
        #[source]
        source: RemoteError,
    },

    /// The job exceeded the configured timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// No session is stored
    #[error("Not authenticated: no session stored")]
    NotAuthenticated,

    /// No project is selected
    #[error("No project selected")]
    NoProject,

    /// The settings store failed
    #[error("Settings error: {0:#}")]
    Settings(anyhow::Error),

    /// The queue no longer accepts jobs
    #[error("Sync queue is shut down")]
    QueueClosed,
}
