//! Polling file watcher with write-stability debounce
//!
//! Provides a [`FileWatcher`] that polls a fixed set of root paths with
//! `notify`'s [`PollWatcher`] and emits normalized [`FileEvent`] values once
//! each file has stopped changing.
//!
//! Polling (rather than inotify) keeps change detection correct on network
//! and removable filesystems. The [`StabilityQueue`] holds `add`/`change`
//! events until the file has been quiet for the stability threshold, so a
//! large copy in progress is not uploaded half-written.
//!
//! ## Architecture
//!
//! ```text
//!  PollWatcher thread ──→ mpsc (raw) ──→ pump task ──→ StabilityQueue ──→ mpsc (WatcherMessage)
//!                                            │
//!                                   initial scan: add… then Ready
//! ```
//!
//! The watched root set is fixed for the lifetime of a watcher; changing it
//! means [`stop`](FileWatcher::stop) and start a new one.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, PollWatcher, RecursiveMode, Watcher};
use projsync_core::config::WatcherConfig;
use projsync_core::filter::PathFilter;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// ============================================================================
// FileEvent
// ============================================================================

/// Kind of a normalized file event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileEventKind {
    /// A file appeared (or existed when the watcher started)
    Add,
    /// A file's content changed
    Change,
    /// A file was removed
    Delete,
}

impl fmt::Display for FileEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            FileEventKind::Add => "add",
            FileEventKind::Change => "change",
            FileEventKind::Delete => "delete",
        })
    }
}

/// A normalized event for one absolute file path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub kind: FileEventKind,
    pub path: PathBuf,
}

impl FileEvent {
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Output of a running [`FileWatcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherMessage {
    /// A settled file event
    Event(FileEvent),
    /// The initial scan finished
    Ready,
    /// A non-fatal watcher error
    Error(String),
}

// ============================================================================
// Event mapping - notify::Event → FileEvent
// ============================================================================

/// Converts a `notify::Event` into normalized file events
///
/// - `Create(*)` → `Add`
/// - `Modify(Name(Both))` with two paths → `Delete(old)` + `Add(new)`
/// - other `Modify(*)` → `Change`
/// - `Remove(*)` → `Delete`
///
/// Access and unknown events map to nothing.
fn map_notify_event(event: &notify::Event) -> Vec<FileEvent> {
    let paths = &event.paths;

    match &event.kind {
        EventKind::Create(_) => paths
            .first()
            .map(|p| vec![FileEvent::new(FileEventKind::Add, p.clone())])
            .unwrap_or_default(),

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
            debug!(
                old = %paths[0].display(),
                new = %paths[1].display(),
                "Mapped Rename event"
            );
            vec![
                FileEvent::new(FileEventKind::Delete, paths[0].clone()),
                FileEvent::new(FileEventKind::Add, paths[1].clone()),
            ]
        }

        EventKind::Modify(_) => paths
            .first()
            .map(|p| vec![FileEvent::new(FileEventKind::Change, p.clone())])
            .unwrap_or_default(),

        EventKind::Remove(_) => paths
            .first()
            .map(|p| vec![FileEvent::new(FileEventKind::Delete, p.clone())])
            .unwrap_or_default(),

        _ => {
            debug!(kind = ?event.kind, "Ignoring event kind");
            Vec::new()
        }
    }
}

// ============================================================================
// StabilityQueue
// ============================================================================

#[derive(Debug, Clone)]
struct Pending {
    kind: FileEventKind,
    last_seen: Instant,
    seq: u64,
}

/// Debounce of file events as a pure function of their timestamps
///
/// - `add`/`change` settle once no event for the path arrived for `threshold`;
///   every new event restarts the wait
/// - `delete` settles at the next poll
/// - `add` then `change` before settling stays `add`
/// - `delete` then `add`/`change` before settling becomes `change`
pub struct StabilityQueue {
    pending: HashMap<PathBuf, Pending>,
    threshold: Duration,
    seq: u64,
}

impl StabilityQueue {
    pub fn new(threshold: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            threshold,
            seq: 0,
        }
    }

    /// Records `event` as seen at `now`
    pub fn push_at(&mut self, event: FileEvent, now: Instant) {
        self.seq += 1;
        let kind = match self.pending.get(&event.path).map(|p| p.kind) {
            None => event.kind,
            Some(_) if event.kind == FileEventKind::Delete => FileEventKind::Delete,
            Some(FileEventKind::Add) => FileEventKind::Add,
            Some(FileEventKind::Delete) | Some(FileEventKind::Change) => FileEventKind::Change,
        };
        debug!(path = %event.path.display(), kind = %kind, "Pending file event");
        self.pending.insert(
            event.path,
            Pending {
                kind,
                last_seen: now,
                seq: self.seq,
            },
        );
    }

    /// Removes and returns every event settled at `now`, oldest first
    pub fn settled_at(&mut self, now: Instant) -> Vec<FileEvent> {
        let mut ready: Vec<(u64, PathBuf)> = self
            .pending
            .iter()
            .filter(|(_, p)| {
                p.kind == FileEventKind::Delete
                    || now.saturating_duration_since(p.last_seen) >= self.threshold
            })
            .map(|(path, p)| (p.seq, path.clone()))
            .collect();
        ready.sort();

        ready
            .into_iter()
            .filter_map(|(_, path)| {
                self.pending
                    .remove(&path)
                    .map(|p| FileEvent::new(p.kind, path))
            })
            .collect()
    }

    /// Returns the number of pending (unsettled) events
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ============================================================================
// FileWatcher
// ============================================================================

/// Polling watcher over a fixed set of root paths
///
/// ## Usage
///
/// ```ignore
/// let (mut watcher, mut rx) = FileWatcher::start(roots, filter, &config.watcher)?;
/// while let Some(msg) = rx.recv().await { /* ... */ }
/// watcher.stop().await;
/// ```
pub struct FileWatcher {
    roots: Vec<PathBuf>,
    cancel: CancellationToken,
    pump: Option<JoinHandle<()>>,
    poller: Option<PollWatcher>,
}

impl FileWatcher {
    /// Starts polling `roots` recursively
    ///
    /// Returns the watcher and the receiver of settled events. The receiver
    /// first yields an `add` for every existing file that passes `filter`,
    /// then [`WatcherMessage::Ready`].
    ///
    /// # Errors
    /// Returns an error if the poll watcher cannot be created. Roots that
    /// cannot be watched are reported as [`WatcherMessage::Error`].
    pub fn start(
        roots: Vec<PathBuf>,
        filter: PathFilter,
        config: &WatcherConfig,
    ) -> Result<(Self, mpsc::Receiver<WatcherMessage>)> {
        let (raw_tx, raw_rx) = mpsc::channel::<notify::Result<notify::Event>>(config.event_buffer);
        let (out_tx, out_rx) = mpsc::channel::<WatcherMessage>(config.event_buffer);

        info!(
            roots = roots.len(),
            poll_ms = config.poll_interval_ms,
            stability_ms = config.stability_threshold_ms,
            "Starting file watcher"
        );

        let mut poller = PollWatcher::new(
            move |res: notify::Result<notify::Event>| {
                if let Err(e) = raw_tx.blocking_send(res) {
                    debug!(error = %e, "Dropping raw event (watcher stopping)");
                }
            },
            notify::Config::default().with_poll_interval(config.poll_interval()),
        )
        .context("Failed to create poll watcher")?;

        let mut startup_errors = Vec::new();
        for root in &roots {
            if let Err(e) = poller.watch(root, RecursiveMode::Recursive) {
                warn!(path = %root.display(), error = %e, "Cannot watch sync root");
                startup_errors.push(format!("Cannot watch {}: {e}", root.display()));
            }
        }

        let cancel = CancellationToken::new();
        let pump = Pump {
            roots: roots.clone(),
            filter,
            queue: StabilityQueue::new(config.stability_threshold()),
            stability_poll: config.stability_poll(),
            out: out_tx,
        };
        let handle = tokio::spawn(pump.run(raw_rx, startup_errors, cancel.clone()));

        Ok((
            Self {
                roots,
                cancel,
                pump: Some(handle),
                poller: Some(poller),
            },
            out_rx,
        ))
    }

    /// The watched roots
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Stops polling and waits for the pump task to exit
    ///
    /// Pending unsettled events are discarded. The message receiver yields
    /// `None` afterwards.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        // Dropping the poller joins nothing but signals its thread to exit
        self.poller.take();
        if let Some(pump) = self.pump.take() {
            if let Err(e) = pump.await {
                error!(error = %e, "Watcher pump task panicked");
            }
        }
        info!("File watcher stopped");
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Pump {
    roots: Vec<PathBuf>,
    filter: PathFilter,
    queue: StabilityQueue,
    stability_poll: Duration,
    out: mpsc::Sender<WatcherMessage>,
}

impl Pump {
    async fn run(
        mut self,
        mut raw_rx: mpsc::Receiver<notify::Result<notify::Event>>,
        startup_errors: Vec<String>,
        cancel: CancellationToken,
    ) {
        for message in startup_errors {
            if self.out.send(WatcherMessage::Error(message)).await.is_err() {
                return;
            }
        }

        let roots = self.roots.clone();
        let filter = self.filter.clone();
        let initial = tokio::select! {
            _ = cancel.cancelled() => return,
            scanned = tokio::task::spawn_blocking(move || initial_scan(&roots, &filter)) => scanned,
        };
        match initial {
            Ok(files) => {
                debug!(count = files.len(), "Initial scan complete");
                for path in files {
                    let event = WatcherMessage::Event(FileEvent::new(FileEventKind::Add, path));
                    if self.out.send(event).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => error!(error = %e, "Initial scan task failed"),
        }
        if self.out.send(WatcherMessage::Ready).await.is_err() {
            return;
        }

        let mut tick = tokio::time::interval(self.stability_poll);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                raw = raw_rx.recv() => match raw {
                    Some(Ok(event)) => {
                        let now = Instant::now();
                        for file_event in map_notify_event(&event) {
                            if self.accepts(&file_event) {
                                self.queue.push_at(file_event, now);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "File watcher error");
                        if self.out.send(WatcherMessage::Error(e.to_string())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },

                _ = tick.tick() => {
                    for event in self.queue.settled_at(Instant::now()) {
                        // A path may have turned into a directory while pending
                        if event.kind != FileEventKind::Delete && event.path.is_dir() {
                            continue;
                        }
                        if self.out.send(WatcherMessage::Event(event)).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
        debug!(dropped = self.queue.pending_count(), "Watcher pump exiting");
    }

    /// Drops directory events and filtered paths
    fn accepts(&self, event: &FileEvent) -> bool {
        if event.kind != FileEventKind::Delete && event.path.is_dir() {
            return false;
        }
        let Some(root) = owning_root(&self.roots, &event.path) else {
            return false;
        };
        !self.filter.is_ignored_below(root, &event.path, false)
    }
}

fn owning_root<'a>(roots: &'a [PathBuf], path: &Path) -> Option<&'a Path> {
    roots
        .iter()
        .filter(|root| path.starts_with(root))
        .max_by_key(|root| root.components().count())
        .map(PathBuf::as_path)
}

/// Every file under `roots` that passes `filter`, in walk order
///
/// Ignored directories are not descended into; directory symlinks are not
/// followed.
fn initial_scan(roots: &[PathBuf], filter: &PathFilter) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in roots {
        match std::fs::metadata(root) {
            Ok(meta) if meta.is_dir() => walk(root, filter, &mut files),
            Ok(_) => {
                if !filter.should_ignore(root, false) {
                    files.push(root.clone());
                }
            }
            Err(e) => warn!(path = %root.display(), error = %e, "Sync root unreadable"),
        }
    }
    files
}

fn walk(dir: &Path, filter: &PathFilter, files: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Cannot read directory during scan");
            return;
        }
    };

    let mut children: Vec<_> = entries.filter_map(|entry| entry.ok()).collect();
    children.sort_by_key(|entry| entry.file_name());

    for entry in children {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if !filter.should_ignore(&path, true) {
                walk(&path, filter, files);
            }
        } else if file_type.is_symlink() && path.is_dir() {
            debug!(path = %path.display(), "Not following directory symlink");
        } else if !filter.should_ignore(&path, false) {
            files.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn add(p: &str) -> FileEvent {
        FileEvent::new(FileEventKind::Add, p)
    }

    fn change(p: &str) -> FileEvent {
        FileEvent::new(FileEventKind::Change, p)
    }

    fn delete(p: &str) -> FileEvent {
        FileEvent::new(FileEventKind::Delete, p)
    }

    // ------------------------------------------------------------------
    // StabilityQueue
    // ------------------------------------------------------------------

    #[test]
    fn test_add_waits_for_threshold() {
        let t0 = Instant::now();
        let mut queue = StabilityQueue::new(Duration::from_millis(100));
        queue.push_at(add("/a.txt"), t0);

        assert!(queue.settled_at(t0 + Duration::from_millis(99)).is_empty());
        assert_eq!(
            queue.settled_at(t0 + Duration::from_millis(100)),
            vec![add("/a.txt")]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_new_event_restarts_wait() {
        let t0 = Instant::now();
        let mut queue = StabilityQueue::new(Duration::from_millis(100));
        queue.push_at(change("/a.txt"), t0);
        queue.push_at(change("/a.txt"), t0 + Duration::from_millis(80));

        assert!(queue.settled_at(t0 + Duration::from_millis(150)).is_empty());
        assert_eq!(queue.settled_at(t0 + Duration::from_millis(180)).len(), 1);
    }

    #[test]
    fn test_delete_settles_immediately() {
        let t0 = Instant::now();
        let mut queue = StabilityQueue::new(Duration::from_secs(60));
        queue.push_at(delete("/a.txt"), t0);
        assert_eq!(queue.settled_at(t0), vec![delete("/a.txt")]);
    }

    #[test]
    fn test_add_then_change_stays_add() {
        let t0 = Instant::now();
        let mut queue = StabilityQueue::new(Duration::from_millis(10));
        queue.push_at(add("/a.txt"), t0);
        queue.push_at(change("/a.txt"), t0);
        assert_eq!(
            queue.settled_at(t0 + Duration::from_millis(10)),
            vec![add("/a.txt")]
        );
    }

    #[test]
    fn test_delete_then_add_becomes_change() {
        let t0 = Instant::now();
        let mut queue = StabilityQueue::new(Duration::from_millis(10));
        queue.push_at(delete("/a.txt"), t0);
        queue.push_at(add("/a.txt"), t0);
        assert_eq!(queue.pending_count(), 1);
        assert!(queue.settled_at(t0).is_empty());
        assert_eq!(
            queue.settled_at(t0 + Duration::from_millis(10)),
            vec![change("/a.txt")]
        );
    }

    #[test]
    fn test_add_then_delete_is_delete() {
        let t0 = Instant::now();
        let mut queue = StabilityQueue::new(Duration::from_secs(1));
        queue.push_at(add("/a.txt"), t0);
        queue.push_at(delete("/a.txt"), t0);
        assert_eq!(queue.settled_at(t0), vec![delete("/a.txt")]);
    }

    #[test]
    fn test_settled_events_are_oldest_first() {
        let t0 = Instant::now();
        let mut queue = StabilityQueue::new(Duration::from_millis(10));
        queue.push_at(add("/b.txt"), t0);
        queue.push_at(add("/a.txt"), t0 + Duration::from_millis(1));
        assert_eq!(
            queue.settled_at(t0 + Duration::from_millis(20)),
            vec![add("/b.txt"), add("/a.txt")]
        );
    }

    // ------------------------------------------------------------------
    // Event mapping
    // ------------------------------------------------------------------

    fn notify_event(kind: EventKind, paths: &[&str]) -> notify::Event {
        notify::Event {
            kind,
            paths: paths.iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_map_create_modify_remove() {
        let created = notify_event(EventKind::Create(notify::event::CreateKind::Any), &["/a"]);
        assert_eq!(map_notify_event(&created), vec![add("/a")]);

        let modified = notify_event(
            EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Any)),
            &["/a"],
        );
        assert_eq!(map_notify_event(&modified), vec![change("/a")]);

        let removed = notify_event(EventKind::Remove(notify::event::RemoveKind::Any), &["/a"]);
        assert_eq!(map_notify_event(&removed), vec![delete("/a")]);
    }

    #[test]
    fn test_map_rename_is_delete_plus_add() {
        let renamed = notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/old.txt", "/new.txt"],
        );
        assert_eq!(
            map_notify_event(&renamed),
            vec![delete("/old.txt"), add("/new.txt")]
        );
    }

    #[test]
    fn test_map_access_and_empty_ignored() {
        let access = notify_event(EventKind::Access(notify::event::AccessKind::Any), &["/a"]);
        assert!(map_notify_event(&access).is_empty());

        let empty = notify_event(EventKind::Create(notify::event::CreateKind::File), &[]);
        assert!(map_notify_event(&empty).is_empty());
    }

    // ------------------------------------------------------------------
    // Initial scan and live watching
    // ------------------------------------------------------------------

    #[test]
    fn test_initial_scan_respects_filter() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("node_modules")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("node_modules/x.js"), "x").unwrap();
        fs::write(root.join("src/lib.rs"), "").unwrap();
        fs::write(root.join("b.md"), "").unwrap();
        fs::write(root.join("debug.log"), "").unwrap();

        let files = initial_scan(&[root.to_path_buf()], &PathFilter::default());
        assert_eq!(files, vec![root.join("b.md"), root.join("src/lib.rs")]);
    }

    #[test]
    fn test_owning_root_prefers_longest() {
        let roots = vec![PathBuf::from("/a"), PathBuf::from("/a/b")];
        assert_eq!(
            owning_root(&roots, Path::new("/a/b/c.txt")),
            Some(Path::new("/a/b"))
        );
        assert_eq!(owning_root(&roots, Path::new("/ab/c.txt")), None);
    }

    fn fast_config() -> WatcherConfig {
        WatcherConfig {
            poll_interval_ms: 20,
            stability_threshold_ms: 60,
            stability_poll_ms: 10,
            event_buffer: 64,
        }
    }

    async fn next_event(rx: &mut mpsc::Receiver<WatcherMessage>) -> WatcherMessage {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("watcher message in time")
            .expect("watcher channel open")
    }

    #[tokio::test]
    async fn test_watcher_reports_initial_files_then_ready() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let (mut watcher, mut rx) = FileWatcher::start(
            vec![dir.path().to_path_buf()],
            PathFilter::default(),
            &fast_config(),
        )
        .unwrap();

        assert_eq!(
            next_event(&mut rx).await,
            WatcherMessage::Event(FileEvent::new(FileEventKind::Add, dir.path().join("a.txt")))
        );
        assert_eq!(next_event(&mut rx).await, WatcherMessage::Ready);

        watcher.stop().await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_watcher_detects_new_file_after_ready() {
        let dir = tempfile::tempdir().unwrap();
        let (mut watcher, mut rx) = FileWatcher::start(
            vec![dir.path().to_path_buf()],
            PathFilter::default(),
            &fast_config(),
        )
        .unwrap();
        assert_eq!(next_event(&mut rx).await, WatcherMessage::Ready);

        // Give the poller a baseline before creating the file
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(dir.path().join("new.md"), "# hi").unwrap();
        fs::write(dir.path().join("ignored.tmp"), "x").unwrap();

        assert_eq!(
            next_event(&mut rx).await,
            WatcherMessage::Event(FileEvent::new(FileEventKind::Add, dir.path().join("new.md")))
        );

        watcher.stop().await;
    }
}
