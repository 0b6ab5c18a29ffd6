//! Sync command - Mirror the Sync Tree to the selected project
//!
//! Provides the `projsync sync` CLI command which:
//! 1. Loads the session, the selected project and its Sync Tree
//! 2. Creates the remote store adapter and the sync orchestrator
//! 3. Prints every sync event as an append-only console
//! 4. Stops on Ctrl-C (or after the initial scan with `--once`) and waits
//!    for queued jobs to finish

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use projsync_core::domain::SyncStatus;
use projsync_sync::orchestrator::{SyncContext, SyncEvent, SyncOrchestrator};
use tracing::info;

use super::{require_project, require_session, CliContext};
use crate::output::OutputFormatter;

/// Sync command options
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Sync the files present now, then exit instead of watching
    #[arg(long)]
    pub once: bool,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();

        let settings = ctx.settings().await?;
        let session = require_session(&settings).await?;
        let project = require_project(&settings).await?;
        let tree = settings.sync_items(&project).await?;
        if tree.is_empty() {
            bail!("The sync tree is empty. Run 'projsync items add <path>' first.");
        }

        let remote = Arc::new(ctx.remote(&session)?);
        let sync_ctx = SyncContext {
            remote,
            settings,
            config: Arc::new(ctx.config.clone()),
        };
        let (mut orchestrator, mut events) = SyncOrchestrator::new(sync_ctx);

        orchestrator
            .start_sync(&tree)
            .await
            .context("Failed to start sync")?;
        info!(%project, roots = tree.watch_roots().len(), "Sync running");
        formatter.info(&format!(
            "Watching {} path(s), press Ctrl-C to stop",
            tree.watch_roots().len()
        ));

        let mut errors = 0usize;
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    formatter.info("Interrupted");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let ready = event == SyncEvent::WatcherReady;
                    errors += print_event(formatter.as_ref(), &event);
                    if ready && self.once {
                        break;
                    }
                }
            }
        }

        formatter.info(&format!(
            "Stopping, {} queued job(s) left",
            orchestrator.pending_jobs()
        ));
        orchestrator.shutdown().await;
        while let Ok(event) = events.try_recv() {
            errors += print_event(formatter.as_ref(), &event);
        }

        if errors > 0 {
            formatter.warn(&format!("{errors} error(s) during sync"));
        } else {
            formatter.success("Sync stopped");
        }
        Ok(())
    }
}

/// Prints one event; returns 1 for errors so the caller can count them
fn print_event(formatter: &dyn OutputFormatter, event: &SyncEvent) -> usize {
    if let Ok(value) = serde_json::to_value(event) {
        formatter.print_json_line(&value);
    }

    match event {
        SyncEvent::FileChange { kind, path } => {
            formatter.info(&format!("{kind:<6} {}", path.display()));
            0
        }
        SyncEvent::StatusUpdate {
            path,
            status,
            reason,
        } => {
            match (status, reason) {
                (SyncStatus::Skipped, Some(reason)) => {
                    formatter.info(&format!("[{status}] {path}: {reason}"))
                }
                (SyncStatus::Skipped | SyncStatus::Error, _) => {
                    formatter.info(&format!("[{status}] {path}"))
                }
                _ => {}
            }
            0
        }
        SyncEvent::SyncError { message } => {
            formatter.error(message);
            1
        }
        SyncEvent::WatcherReady => {
            formatter.success("Initial scan complete");
            0
        }
        SyncEvent::SyncStopped => 0,
    }
}
