//! Items command - Edit the Sync Tree of the selected project
//!
//! Provides the `projsync items` CLI command which:
//! 1. Adds files and folders (filtered, snapshotted, merged into the tree)
//! 2. Removes an entry and its subtree
//! 3. Lists, refreshes and clears the tree

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use projsync_core::domain::TreeNode;
use projsync_core::filter::PathFilter;
use projsync_core::usecases::{refresh_tree, select_files_and_folders};
use tracing::info;

use super::{require_project, CliContext};
use crate::output::OutputFormatter;

/// Items subcommands
#[derive(Debug, Subcommand)]
pub enum ItemsCommand {
    /// Add files or folders to the sync tree
    Add {
        /// Paths to add
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Remove an entry (and everything below it) from the sync tree
    Remove {
        /// Path of the entry
        path: PathBuf,
    },
    /// Show the sync tree
    List,
    /// Re-read the contents of every folder in the tree
    Refresh,
    /// Remove every entry from the sync tree
    Clear,
}

impl ItemsCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ItemsCommand::Add { paths } => self.execute_add(ctx, paths).await,
            ItemsCommand::Remove { path } => self.execute_remove(ctx, path).await,
            ItemsCommand::List => self.execute_list(ctx).await,
            ItemsCommand::Refresh => self.execute_refresh(ctx).await,
            ItemsCommand::Clear => self.execute_clear(ctx).await,
        }
    }

    async fn execute_add(&self, ctx: &CliContext, paths: &[PathBuf]) -> Result<()> {
        let formatter = ctx.formatter();
        let settings = ctx.settings().await?;
        let project = require_project(&settings).await?;
        let filter = PathFilter::from_config(&ctx.config.filter);

        let mut picked = Vec::new();
        for path in paths {
            match std::fs::canonicalize(path) {
                Ok(absolute) => picked.push(absolute),
                Err(e) => formatter.warn(&format!("Skipping {}: {e}", path.display())),
            }
        }

        let existing = settings.sync_items(&project).await?;
        let before = existing.len();
        let merged = select_files_and_folders(&existing, &mut picked, &filter);
        settings.set_sync_items(&project, &merged).await?;

        let added = merged.len().saturating_sub(before);
        info!(%project, added, "Updated sync items");
        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "added": added,
                "entries": merged.len(),
            }));
        } else {
            formatter.success(&format!("Added {added} entr{}", plural_y(added)));
        }
        Ok(())
    }

    async fn execute_remove(&self, ctx: &CliContext, path: &Path) -> Result<()> {
        let formatter = ctx.formatter();
        let settings = ctx.settings().await?;
        let project = require_project(&settings).await?;

        let target = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut tree = settings.sync_items(&project).await?;
        if !tree.remove(&target) {
            formatter.warn(&format!("{} is not in the sync tree", target.display()));
            return Ok(());
        }
        settings.set_sync_items(&project, &tree).await?;
        formatter.success(&format!("Removed {}", target.display()));
        Ok(())
    }

    async fn execute_list(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let settings = ctx.settings().await?;
        let project = require_project(&settings).await?;
        let nodes = settings.sync_items(&project).await?.to_nodes();

        if ctx.format.is_json() {
            let json = serde_json::to_value(&nodes).context("Failed to serialize sync tree")?;
            formatter.print_json(&json);
        } else if nodes.is_empty() {
            formatter.warn("The sync tree is empty. Run 'projsync items add <path>'.");
        } else {
            let total: usize = nodes.iter().map(TreeNode::count).sum();
            formatter.success(&format!("{total} entr{}", plural_y(total)));
            print_nodes(formatter.as_ref(), &nodes, 0);
        }
        Ok(())
    }

    async fn execute_refresh(&self, ctx: &CliContext) -> Result<()> {
        let settings = ctx.settings().await?;
        let project = require_project(&settings).await?;
        let filter = PathFilter::from_config(&ctx.config.filter);

        let tree = settings.sync_items(&project).await?;
        let refreshed = refresh_tree(&tree, &filter);
        settings.set_sync_items(&project, &refreshed).await?;

        ctx.formatter().success(&format!(
            "Refreshed sync tree ({} entr{})",
            refreshed.len(),
            plural_y(refreshed.len())
        ));
        Ok(())
    }

    async fn execute_clear(&self, ctx: &CliContext) -> Result<()> {
        let settings = ctx.settings().await?;
        let project = require_project(&settings).await?;
        settings.clear_sync_items(&project).await?;
        ctx.formatter().success("Sync tree cleared");
        Ok(())
    }
}

fn print_nodes(formatter: &dyn OutputFormatter, nodes: &[TreeNode], depth: usize) {
    for node in nodes {
        let suffix = if node.is_directory { "/" } else { "" };
        let label = if depth == 0 {
            node.path.display().to_string()
        } else {
            node.name.clone()
        };
        formatter.info(&format!("{}{label}{suffix}", "  ".repeat(depth)));
        if let Some(children) = &node.children {
            print_nodes(formatter, children, depth + 1);
        }
    }
}

fn plural_y(n: usize) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}
