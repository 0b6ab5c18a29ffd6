//! Serialized sync job queue
//!
//! A [`SyncQueue`] hands jobs to a single worker task which runs them one at
//! a time in submission order. [`add`](SyncQueue::add) never waits for the
//! worker; jobs added while another job runs join the backlog.
//!
//! ## Flow
//!
//! ```text
//! add() ──→ mpsc::unbounded ──→ worker loop ──→ JobHandler::handle()
//!                                   │                 │ Err / timeout
//!                                   │                 ▼
//!                                   │          JobHandler::failed()
//!                                   ▼
//!                             next job (FIFO)
//! ```
//!
//! A failing or timed-out job is logged and reported to the handler; the
//! worker moves on to the next job.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::SyncError;

/// Executes queued jobs of type `J`
#[async_trait::async_trait]
pub trait JobHandler<J>: Send + Sync + 'static {
    /// Runs one job to completion
    async fn handle(&self, job: &J) -> Result<(), SyncError>;

    /// Called after `handle` failed or timed out; the default does nothing
    async fn failed(&self, _job: &J, _error: &SyncError) {}
}

enum Message<J> {
    Job(J),
    Shutdown,
}

/// FIFO job queue drained by one worker task
///
/// Cloning yields another handle to the same queue.
pub struct SyncQueue<J> {
    tx: mpsc::UnboundedSender<Message<J>>,
    pending: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<J> Clone for SyncQueue<J> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            pending: self.pending.clone(),
            closed: self.closed.clone(),
            worker: self.worker.clone(),
        }
    }
}

impl<J: Debug + Send + Sync + 'static> SyncQueue<J> {
    /// Spawns the worker task and returns the queue
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Arguments
    /// * `handler` - Runs each job
    /// * `timeout` - Per-job limit; `None` lets a job run indefinitely
    pub fn new(handler: Arc<dyn JobHandler<J>>, timeout: Option<Duration>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));

        info!(timeout_secs = timeout.map(|t| t.as_secs()), "Starting sync queue");
        let worker = tokio::spawn(run_worker(rx, handler, timeout, pending.clone()));

        Self {
            tx,
            pending,
            closed: Arc::new(AtomicBool::new(false)),
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    /// Appends a job to the backlog
    ///
    /// # Errors
    /// Returns [`SyncError::QueueClosed`] after [`shutdown`](Self::shutdown)
    pub fn add(&self, job: J) -> Result<(), SyncError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SyncError::QueueClosed);
        }
        debug!(job = ?job, "Enqueuing job");
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.tx.send(Message::Job(job)).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            SyncError::QueueClosed
        })
    }

    /// Number of jobs waiting to start
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Returns true once the queue stopped accepting jobs
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stops accepting jobs and waits until every job already added has run
    pub async fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.tx.send(Message::Shutdown);
        }

        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "Sync queue worker panicked");
            }
        }
    }
}

async fn run_worker<J: Debug + Send + Sync + 'static>(
    mut rx: mpsc::UnboundedReceiver<Message<J>>,
    handler: Arc<dyn JobHandler<J>>,
    timeout: Option<Duration>,
    pending: Arc<AtomicUsize>,
) {
    while let Some(message) = rx.recv().await {
        let job = match message {
            Message::Job(job) => job,
            Message::Shutdown => break,
        };
        pending.fetch_sub(1, Ordering::AcqRel);

        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, handler.handle(&job)).await {
                Ok(result) => result,
                Err(_) => Err(SyncError::Timeout(limit)),
            },
            None => handler.handle(&job).await,
        };

        if let Err(e) = result {
            error!(job = ?job, error = %e, "Sync job failed");
            handler.failed(&job, &e).await;
        }
    }

    rx.close();
    while let Ok(Message::Job(job)) = rx.try_recv() {
        pending.fetch_sub(1, Ordering::AcqRel);
        warn!(job = ?job, "Dropping job added after shutdown");
    }
    info!("Sync queue stopped");
}
