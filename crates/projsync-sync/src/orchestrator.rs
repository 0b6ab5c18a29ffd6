//! Sync orchestrator
//!
//! The [`SyncOrchestrator`] turns file watcher events into remote document
//! operations and keeps the per-path status table the UI displays.
//!
//! ## Flow
//!
//! ```text
//! FileWatcher ──→ forwarder task ──→ Dispatcher::submit()
//!                                        │ route to sync root, compute remote name
//!                                        │ status: queued
//!                                        ▼
//!                                    SyncQueue ──→ SyncJobHandler
//!                                                     │ status: syncing
//!                                                     ▼
//!                                               DocumentSync (replace / delete)
//!                                                     │ status: synced | skipped | error
//!                                                     ▼
//!                                               SyncEvent stream
//! ```
//!
//! Status keys are remote names (`<root name>/<relative path>`), so a
//! directory's key is a prefix of its descendants' keys and the
//! [`StatusTracker`] can roll statuses up. A routing fault has no remote
//! name; it is reported under the absolute path instead.
//!
//! Stopping sync tears down the watcher only. Jobs already queued run to
//! completion; [`SyncOrchestrator::shutdown`] waits for them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{bail, Context};
use projsync_core::config::Config;
use projsync_core::domain::{RemoteName, StatusTracker, SyncOutcome, SyncStatus, SyncTree};
use projsync_core::filter::PathFilter;
use projsync_core::ports::IRemoteDocumentStore;
use projsync_core::usecases::{process_selected_paths, ProjectSettings};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::queue::{JobHandler, SyncQueue};
use crate::remote_sync::DocumentSync;
use crate::watcher::{FileEvent, FileEventKind, FileWatcher, WatcherMessage};
use crate::SyncError;

// ============================================================================
// Context and events
// ============================================================================

/// Collaborators injected into the orchestrator
#[derive(Clone)]
pub struct SyncContext {
    pub remote: Arc<dyn IRemoteDocumentStore>,
    pub settings: ProjectSettings,
    pub config: Arc<Config>,
}

/// Asynchronous notifications produced while syncing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A file event was synced to the remote store
    #[serde(rename = "file-change")]
    FileChange {
        #[serde(rename = "type")]
        kind: FileEventKind,
        path: PathBuf,
    },

    /// The visible status of a file or directory changed
    #[serde(rename = "sync-status-update")]
    StatusUpdate {
        #[serde(rename = "filePath")]
        path: String,
        status: SyncStatus,
        /// Why a file was skipped; only set on the file's own update
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// A job or routing step failed
    #[serde(rename = "sync-error")]
    SyncError { message: String },

    /// The watcher finished its initial scan
    #[serde(rename = "watcher-ready")]
    WatcherReady,

    /// The watcher was torn down
    #[serde(rename = "sync-stopped")]
    SyncStopped,
}

/// One queued remote operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJob {
    pub kind: FileEventKind,
    pub path: PathBuf,
    pub sync_root: PathBuf,
    pub remote_name: RemoteName,
    /// Submission number for `remote_name`; a higher one supersedes this job
    pub seq: u64,
}

// ============================================================================
// Shared status
// ============================================================================

#[derive(Default)]
struct BoardState {
    tracker: StatusTracker,
    /// Latest submission number per key
    latest: HashMap<String, u64>,
    next_seq: u64,
}

impl BoardState {
    fn is_current(&self, key: &str, seq: u64) -> bool {
        self.latest.get(key) == Some(&seq)
    }
}

/// Status table plus the event sender that reports its changes
///
/// Updates coming from a job go through [`settle`](Self::settle) and friends,
/// which drop them once a newer job for the same key was queued, so a
/// finishing job never overwrites the `queued` status of its successor.
#[derive(Clone)]
struct StatusBoard {
    state: Arc<Mutex<BoardState>>,
    events: mpsc::UnboundedSender<SyncEvent>,
}

impl StatusBoard {
    fn new(events: mpsc::UnboundedSender<SyncEvent>) -> Self {
        Self {
            state: Arc::new(Mutex::new(BoardState::default())),
            events,
        }
    }

    fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Unconditional update, for keys no job owns
    fn set(&self, key: &str, status: SyncStatus) {
        let changed = self.state().tracker.update(key, status);
        self.publish(changed, None);
    }

    /// Marks `key` queued and returns the submission number of the new job
    fn enqueue(&self, key: &str) -> u64 {
        let (seq, changed) = {
            let mut state = self.state();
            state.next_seq += 1;
            let seq = state.next_seq;
            state.latest.insert(key.to_string(), seq);
            (seq, state.tracker.update(key, SyncStatus::Queued))
        };
        self.publish(changed, None);
        seq
    }

    /// Sets `status` if job `seq` is still the latest for `key`
    fn settle(&self, key: &str, seq: u64, status: SyncStatus, reason: Option<&str>) -> bool {
        let changed = {
            let mut state = self.state();
            if !state.is_current(key, seq) {
                return false;
            }
            state.tracker.update(key, status)
        };
        self.publish(changed, reason.map(|r| (key, r)));
        true
    }

    /// Reports `key` synced and drops it, if job `seq` is still the latest
    fn settle_removed(&self, key: &str, seq: u64) -> bool {
        let changed = {
            let mut state = self.state();
            if !state.is_current(key, seq) {
                return false;
            }
            state.latest.remove(key);
            let mut changed = state.tracker.update(key, SyncStatus::Synced);
            changed.extend(state.tracker.forget(key));
            changed
        };
        self.publish(changed, None);
        true
    }

    fn publish(&self, changed: Vec<(String, SyncStatus)>, reason: Option<(&str, &str)>) {
        for (path, status) in changed {
            let reason = reason
                .filter(|(key, _)| *key == path)
                .map(|(_, reason)| reason.to_string());
            self.emit(SyncEvent::StatusUpdate {
                path,
                status,
                reason,
            });
        }
    }

    fn emit(&self, event: SyncEvent) {
        if self.events.send(event).is_err() {
            debug!("Sync event receiver dropped");
        }
    }

    /// Marks `key` as failed and reports `message`
    fn fail(&self, key: &str, message: String) {
        self.set(key, SyncStatus::Error);
        self.emit(SyncEvent::SyncError { message });
    }

    /// Like [`fail`](Self::fail) for job `seq`; the error is always reported
    fn fail_job(&self, key: &str, seq: u64, message: String) {
        if !self.settle(key, seq, SyncStatus::Error, None) {
            debug!(key, seq, "Newer job queued, keeping its status");
        }
        self.emit(SyncEvent::SyncError { message });
    }
}

// ============================================================================
// Job handler
// ============================================================================

struct SyncJobHandler {
    settings: ProjectSettings,
    documents: DocumentSync,
    board: StatusBoard,
}

#[async_trait::async_trait]
impl JobHandler<SyncJob> for SyncJobHandler {
    async fn handle(&self, job: &SyncJob) -> Result<(), SyncError> {
        let key = job.remote_name.as_str();
        self.board.settle(key, job.seq, SyncStatus::Syncing, None);

        let session = self
            .settings
            .session()
            .await
            .map_err(SyncError::Settings)?
            .ok_or(SyncError::NotAuthenticated)?;
        let project = self
            .settings
            .current_project_id()
            .await
            .map_err(SyncError::Settings)?
            .ok_or(SyncError::NoProject)?;

        let outcome = match job.kind {
            FileEventKind::Add | FileEventKind::Change => {
                self.documents
                    .sync_file(&session.organization, &project, &job.path, &job.remote_name)
                    .await?
            }
            FileEventKind::Delete => {
                self.documents
                    .delete_remote_file(&session.organization, &project, &job.remote_name)
                    .await?
            }
        };

        let settled = match &outcome {
            SyncOutcome::Deleted | SyncOutcome::AlreadyAbsent => {
                self.board.settle_removed(key, job.seq)
            }
            SyncOutcome::Skipped { reason } => {
                info!(path = %job.path.display(), %reason, "File skipped");
                self.board
                    .settle(key, job.seq, outcome.status(), Some(reason.as_str()))
            }
            SyncOutcome::Uploaded { .. } => {
                self.board.settle(key, job.seq, outcome.status(), None)
            }
        };
        if !settled {
            debug!(path = %job.path.display(), "Newer job queued, keeping its status");
        }

        self.board.emit(SyncEvent::FileChange {
            kind: job.kind,
            path: job.path.clone(),
        });
        Ok(())
    }

    async fn failed(&self, job: &SyncJob, error: &SyncError) {
        self.board.fail_job(
            job.remote_name.as_str(),
            job.seq,
            format!("Failed to sync {}: {error}", job.path.display()),
        );
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes file events of one sync session onto the queue
#[derive(Clone)]
struct Dispatcher {
    tree: Arc<SyncTree>,
    queue: SyncQueue<SyncJob>,
    board: StatusBoard,
}

impl Dispatcher {
    fn submit(&self, event: FileEvent) {
        let job = match self.route(&event) {
            Ok(job) => job,
            Err(e) => {
                error!(path = %event.path.display(), error = %e, "Cannot route file event");
                self.board
                    .fail(&event.path.display().to_string(), e.to_string());
                return;
            }
        };

        let key = job.remote_name.to_string();
        let job = SyncJob {
            seq: self.board.enqueue(&key),
            ..job
        };
        let seq = job.seq;
        if let Err(e) = self.queue.add(job) {
            warn!(path = %event.path.display(), error = %e, "Cannot enqueue sync job");
            self.board.fail_job(&key, seq, e.to_string());
        }
    }

    /// Builds the job for `event`; its `seq` is assigned on submission
    fn route(&self, event: &FileEvent) -> Result<SyncJob, SyncError> {
        let sync_root = self
            .tree
            .find_sync_root(&event.path)
            .ok_or_else(|| SyncError::NoSyncRoot(event.path.clone()))?;
        let remote_name = RemoteName::for_file(sync_root, &event.path)?;

        Ok(SyncJob {
            kind: event.kind,
            path: event.path.clone(),
            sync_root: sync_root.to_path_buf(),
            remote_name,
            seq: 0,
        })
    }
}

// ============================================================================
// SyncOrchestrator
// ============================================================================

struct ActiveSync {
    watcher: FileWatcher,
    forwarder: JoinHandle<()>,
}

/// Watches the Sync Tree and mirrors file changes to the remote project
pub struct SyncOrchestrator {
    ctx: SyncContext,
    filter: PathFilter,
    queue: SyncQueue<SyncJob>,
    board: StatusBoard,
    dispatcher: Option<Dispatcher>,
    active: Option<ActiveSync>,
}

impl SyncOrchestrator {
    /// Creates the orchestrator and its job queue
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Returns
    /// The orchestrator and the receiving end of its event stream
    pub fn new(ctx: SyncContext) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let board = StatusBoard::new(events);

        let handler = Arc::new(SyncJobHandler {
            settings: ctx.settings.clone(),
            documents: DocumentSync::new(ctx.remote.clone(), ctx.config.sync.max_file_size_bytes),
            board: board.clone(),
        });
        let queue = SyncQueue::new(handler, ctx.config.sync.job_timeout());
        let filter = PathFilter::from_config(&ctx.config.filter);

        (
            Self {
                ctx,
                filter,
                queue,
                board,
                dispatcher: None,
                active: None,
            },
            rx,
        )
    }

    /// Starts watching every path of `tree`
    ///
    /// A running watcher is torn down first; the watched root set never
    /// changes in place.
    ///
    /// # Errors
    /// Fails if the tree is empty or the watcher cannot be created
    pub async fn start_sync(&mut self, tree: &SyncTree) -> anyhow::Result<()> {
        self.teardown_watcher().await;

        let roots = tree.watch_roots();
        if roots.is_empty() {
            bail!("Nothing to sync: the sync tree is empty");
        }

        let dispatcher = Dispatcher {
            tree: Arc::new(tree.clone()),
            queue: self.queue.clone(),
            board: self.board.clone(),
        };

        let (watcher, rx) = FileWatcher::start(roots.clone(), self.filter.clone(), &self.ctx.config.watcher)
            .context("Failed to start file watcher")?;
        let forwarder = tokio::spawn(forward(rx, dispatcher.clone()));

        info!(roots = roots.len(), "Sync started");
        self.dispatcher = Some(dispatcher);
        self.active = Some(ActiveSync { watcher, forwarder });
        Ok(())
    }

    /// Filters `paths`, builds a Sync Tree from them and starts watching it
    pub async fn start_sync_paths(&mut self, paths: &[PathBuf]) -> anyhow::Result<()> {
        let tree = SyncTree::new().merge(&process_selected_paths(paths, &self.filter));
        self.start_sync(&tree).await
    }

    /// Routes a file event as if the watcher had reported it
    ///
    /// Without a started sync every path is a routing fault.
    pub fn submit(&self, event: FileEvent) {
        match &self.dispatcher {
            Some(dispatcher) => dispatcher.submit(event),
            None => {
                let key = event.path.display().to_string();
                error!(path = %key, "File event received while sync is stopped");
                self.board
                    .fail(&key, SyncError::NoSyncRoot(event.path).to_string());
            }
        }
    }

    /// Tears down the watcher; queued jobs keep running
    pub async fn stop_sync(&mut self) {
        if self.teardown_watcher().await {
            info!(pending = self.queue.pending(), "Sync stopped");
        }
        self.dispatcher = None;
        self.board.emit(SyncEvent::SyncStopped);
    }

    /// Status of a file or directory key (remote name or absolute path)
    pub fn status_of(&self, key: &str) -> SyncStatus {
        self.board.state().tracker.status_of(key)
    }

    /// Status of `path` beneath the current sync roots
    pub fn status_of_path(&self, path: &Path) -> SyncStatus {
        let Some(dispatcher) = &self.dispatcher else {
            return SyncStatus::Synced;
        };
        match dispatcher
            .tree
            .find_sync_root(path)
            .map(|root| RemoteName::for_file(root, path))
        {
            Some(Ok(name)) => self.status_of(name.as_str()),
            _ => self.status_of(&path.display().to_string()),
        }
    }

    /// Returns true while a watcher is active
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Jobs waiting in the queue
    pub fn pending_jobs(&self) -> usize {
        self.queue.pending()
    }

    /// Stops sync and waits for every queued job to finish
    pub async fn shutdown(&mut self) {
        if self.is_running() {
            self.stop_sync().await;
        }
        self.queue.shutdown().await;
    }

    async fn teardown_watcher(&mut self) -> bool {
        let Some(mut active) = self.active.take() else {
            return false;
        };
        active.watcher.stop().await;
        if let Err(e) = active.forwarder.await {
            error!(error = %e, "Watcher forwarder task panicked");
        }
        true
    }
}

async fn forward(mut rx: mpsc::Receiver<WatcherMessage>, dispatcher: Dispatcher) {
    while let Some(message) = rx.recv().await {
        match message {
            WatcherMessage::Event(event) => dispatcher.submit(event),
            WatcherMessage::Ready => {
                info!("Watcher ready");
                dispatcher.board.emit(SyncEvent::WatcherReady);
            }
            WatcherMessage::Error(message) => dispatcher.board.emit(SyncEvent::SyncError { message }),
        }
    }
    debug!("Watcher forwarder exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> (StatusBoard, mpsc::UnboundedReceiver<SyncEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (StatusBoard::new(events), rx)
    }

    fn drain_updates(rx: &mut mpsc::UnboundedReceiver<SyncEvent>) -> Vec<(String, SyncStatus)> {
        let mut updates = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SyncEvent::StatusUpdate { path, status, .. } = event {
                updates.push((path, status));
            }
        }
        updates
    }

    #[test]
    fn test_sync_event_wire_names() {
        let event = SyncEvent::StatusUpdate {
            path: "proj/a.txt".into(),
            status: SyncStatus::Queued,
            reason: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "sync-status-update");
        assert_eq!(json["filePath"], "proj/a.txt");
        assert_eq!(json["status"], "queued");
        assert!(json.get("reason").is_none());

        let change = SyncEvent::FileChange {
            kind: FileEventKind::Delete,
            path: PathBuf::from("/p/a.txt"),
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["event"], "file-change");
        assert_eq!(json["type"], "delete");
    }

    #[test]
    fn test_status_board_reports_rollup_changes() {
        let (board, mut rx) = board();

        board.set("proj/src/a.txt", SyncStatus::Error);
        assert_eq!(
            drain_updates(&mut rx),
            vec![
                ("proj/src/a.txt".to_string(), SyncStatus::Error),
                ("proj/src".to_string(), SyncStatus::Error),
                ("proj".to_string(), SyncStatus::Error),
            ]
        );
    }

    #[test]
    fn test_superseded_job_keeps_successor_queued() {
        let (board, _rx) = board();
        let first = board.enqueue("proj/a.txt");
        assert!(board.settle("proj/a.txt", first, SyncStatus::Syncing, None));

        let second = board.enqueue("proj/a.txt");
        assert!(!board.settle("proj/a.txt", first, SyncStatus::Synced, None));
        assert_eq!(board.state().tracker.status_of("proj/a.txt"), SyncStatus::Queued);

        assert!(board.settle("proj/a.txt", second, SyncStatus::Synced, None));
        assert_eq!(board.state().tracker.status_of("proj/a.txt"), SyncStatus::Synced);
    }

    #[test]
    fn test_superseded_delete_does_not_forget_successor() {
        let (board, _rx) = board();
        let delete = board.enqueue("proj/a.txt");
        let add = board.enqueue("proj/a.txt");

        assert!(!board.settle_removed("proj/a.txt", delete));
        assert_eq!(board.state().tracker.leaf_status("proj/a.txt"), Some(SyncStatus::Queued));

        assert!(board.settle_removed("proj/a.txt", add));
        assert_eq!(board.state().tracker.leaf_status("proj/a.txt"), None);
    }

    #[test]
    fn test_failed_superseded_job_still_reports_error() {
        let (board, mut rx) = board();
        let first = board.enqueue("proj/a.txt");
        board.enqueue("proj/a.txt");
        drain_updates(&mut rx);

        board.fail_job("proj/a.txt", first, "boom".into());

        assert_eq!(board.state().tracker.status_of("proj/a.txt"), SyncStatus::Queued);
        assert_eq!(
            rx.try_recv().unwrap(),
            SyncEvent::SyncError {
                message: "boom".into()
            }
        );
    }

    #[test]
    fn test_skip_reason_is_attached_to_leaf_only() {
        let (board, mut rx) = board();
        let seq = board.enqueue("proj/src/big.txt");
        drain_updates(&mut rx);

        board.settle("proj/src/big.txt", seq, SyncStatus::Skipped, Some("too big"));

        let mut reasons = Vec::new();
        while let Ok(SyncEvent::StatusUpdate { path, reason, .. }) = rx.try_recv() {
            reasons.push((path, reason));
        }
        assert_eq!(reasons[0], ("proj/src/big.txt".to_string(), Some("too big".to_string())));
        assert!(reasons[1..].iter().all(|(_, reason)| reason.is_none()));
    }
}
