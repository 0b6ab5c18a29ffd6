//! File selection use case
//!
//! Turns paths picked by the user into Sync Tree entries: each picked path is
//! filtered, directories are snapshotted recursively (a snapshot, not a live
//! view), and the result is merged into the existing tree.
//!
//! Unreadable paths and directories are logged and left out; the selection
//! continues with the remaining entries.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::domain::{SyncTree, TreeNode};
use crate::filter::PathFilter;

/// Source of user-picked paths (a native dialog, CLI arguments, a test fixture)
pub trait PathPicker {
    /// Returns the picked paths, or `None` if the user cancelled
    fn pick(&mut self) -> Option<Vec<PathBuf>>;
}

impl PathPicker for Vec<PathBuf> {
    fn pick(&mut self) -> Option<Vec<PathBuf>> {
        Some(std::mem::take(self))
    }
}

/// Recursively snapshots the contents of `dir` that pass `filter`
///
/// Entries are sorted by name. Symbolic links to directories are not
/// followed.
pub fn snapshot_directory(dir: &Path, filter: &PathFilter) -> Vec<TreeNode> {
    let read = match std::fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Cannot read directory, skipping");
            return Vec::new();
        }
    };

    let mut entries: Vec<(PathBuf, bool)> = Vec::new();
    for entry in read {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Cannot read directory entry, skipping");
                continue;
            }
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot stat entry, skipping");
                continue;
            }
        };

        let is_dir = if file_type.is_symlink() {
            match std::fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => {
                    debug!(path = %path.display(), "Not following directory symlink");
                    continue;
                }
                Ok(_) => false,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Dangling symlink, skipping");
                    continue;
                }
            }
        } else {
            file_type.is_dir()
        };

        if filter.should_ignore(&path, is_dir) {
            continue;
        }
        entries.push((path, is_dir));
    }

    entries.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
    entries
        .into_iter()
        .map(|(path, is_dir)| {
            if is_dir {
                let children = snapshot_directory(&path, filter);
                TreeNode::directory(path, children)
            } else {
                TreeNode::file(path)
            }
        })
        .collect()
}

/// Filters picked paths and snapshots directories
///
/// Paths that cannot be stat'ed are logged and dropped.
pub fn process_selected_paths(paths: &[PathBuf], filter: &PathFilter) -> Vec<TreeNode> {
    paths
        .iter()
        .filter_map(|path| {
            let meta = match std::fs::metadata(path) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot read selected path, skipping");
                    return None;
                }
            };
            let is_dir = meta.is_dir();
            if filter.should_ignore(path, is_dir) {
                info!(path = %path.display(), "Selected path is filtered out");
                return None;
            }
            Some(if is_dir {
                TreeNode::directory(path.clone(), snapshot_directory(path, filter))
            } else {
                TreeNode::file(path.clone())
            })
        })
        .collect()
}

/// Asks `picker` for paths and merges the selection into `existing`
///
/// # Returns
///
/// The merged tree, or a copy of `existing` when the picker was cancelled
pub fn select_files_and_folders(
    existing: &SyncTree,
    picker: &mut dyn PathPicker,
    filter: &PathFilter,
) -> SyncTree {
    let Some(paths) = picker.pick() else {
        debug!("Selection cancelled");
        return existing.clone();
    };

    let selected = process_selected_paths(&paths, filter);
    info!(
        picked = paths.len(),
        accepted = selected.len(),
        "Merging selection into sync tree"
    );
    existing.merge(&selected)
}

/// Re-snapshots the children of every directory root
///
/// Roots that no longer exist are dropped; file roots are kept as-is.
pub fn refresh_tree(tree: &SyncTree, filter: &PathFilter) -> SyncTree {
    let mut refreshed = tree.clone();
    let roots: Vec<_> = tree
        .roots()
        .map(|root| (root.id(), root.path().to_path_buf(), root.is_directory()))
        .collect();

    for (id, path, is_dir) in roots {
        if !path.exists() {
            info!(path = %path.display(), "Sync root vanished, removing");
            refreshed.remove(&path);
            continue;
        }
        if is_dir {
            let children = snapshot_directory(&path, filter);
            refreshed.replace_children(id, &children);
        }
    }
    refreshed
}
