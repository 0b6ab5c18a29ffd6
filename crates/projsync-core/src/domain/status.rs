//! Sync status values and directory rollup
//!
//! Every watched file carries an ephemeral [`SyncStatus`] keyed by its
//! project-relative path (the remote name, e.g. `project/src/a.txt`). The
//! [`StatusTracker`] keeps those leaf statuses and derives a status for every
//! ancestor directory so tree indicators stay consistent.
//!
//! ## State Machine
//!
//! ```text
//! unwatched ──→ Queued ──→ Syncing ──→ Synced
//!                 ▲                 ├─→ Skipped
//!                 │                 └─→ Error
//!                 └──── next event ────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::newtypes::DocumentId;

// ============================================================================
// SyncStatus
// ============================================================================

/// Status of a single path in the sync pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// A job for the path is waiting in the queue
    Queued,
    /// The remote operation for the path is in flight
    Syncing,
    /// The remote store mirrors the local state of the path
    Synced,
    /// The path was intentionally not uploaded (e.g. size limit)
    Skipped,
    /// The last operation for the path failed
    Error,
}

impl SyncStatus {
    /// Rollup priority, higher wins: `error > syncing > queued > skipped > synced`
    pub fn priority(self) -> u8 {
        match self {
            SyncStatus::Error => 4,
            SyncStatus::Syncing => 3,
            SyncStatus::Queued => 2,
            SyncStatus::Skipped => 1,
            SyncStatus::Synced => 0,
        }
    }

    /// Returns true once no further work is pending for the path
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            SyncStatus::Synced | SyncStatus::Skipped | SyncStatus::Error
        )
    }

    /// Returns the state name as a lowercase string
    pub fn name(self) -> &'static str {
        match self {
            SyncStatus::Queued => "queued",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
            SyncStatus::Skipped => "skipped",
            SyncStatus::Error => "error",
        }
    }

    /// Picks the more urgent of two statuses
    pub fn max(self, other: SyncStatus) -> SyncStatus {
        if other.priority() > self.priority() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// SyncOutcome
// ============================================================================

/// Result of one successfully processed sync job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The file content was uploaded as a new document
    Uploaded {
        /// Identifier of the new remote document
        document: DocumentId,
        /// Whether an older document with the same name was deleted first
        replaced: bool,
    },
    /// The remote document was deleted
    Deleted,
    /// A delete was requested but no remote document had that name
    AlreadyAbsent,
    /// The file was not uploaded
    Skipped {
        /// Human-readable reason
        reason: String,
    },
}

impl SyncOutcome {
    /// The leaf status this outcome leaves behind
    pub fn status(&self) -> SyncStatus {
        match self {
            SyncOutcome::Skipped { .. } => SyncStatus::Skipped,
            _ => SyncStatus::Synced,
        }
    }
}

// ============================================================================
// StatusTracker
// ============================================================================

/// In-memory status table with bottom-up directory rollup
///
/// Leaf keys are `/`-separated project-relative paths. Each leaf update
/// recomputes every ancestor directory; directories without tracked
/// descendants report [`SyncStatus::Synced`].
#[derive(Debug, Default, Clone)]
pub struct StatusTracker {
    leaves: BTreeMap<String, SyncStatus>,
    dirs: BTreeMap<String, SyncStatus>,
}

impl StatusTracker {
    /// Creates an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status of a leaf and recomputes its ancestors
    ///
    /// Returns every `(key, status)` pair whose visible status changed,
    /// leaf first, then ancestors nearest first.
    pub fn update(&mut self, key: &str, status: SyncStatus) -> Vec<(String, SyncStatus)> {
        let mut changed = Vec::new();
        if self.leaves.insert(key.to_string(), status) != Some(status) {
            changed.push((key.to_string(), status));
        }
        changed.extend(self.recompute_ancestors(key));
        changed
    }

    /// Stops tracking a leaf (e.g. after its remote document was deleted)
    ///
    /// Returns the ancestors whose derived status changed.
    pub fn forget(&mut self, key: &str) -> Vec<(String, SyncStatus)> {
        if self.leaves.remove(key).is_none() {
            return Vec::new();
        }
        self.recompute_ancestors(key)
    }

    /// Status of a leaf or directory key
    pub fn status_of(&self, key: &str) -> SyncStatus {
        self.leaves
            .get(key)
            .or_else(|| self.dirs.get(key))
            .copied()
            .unwrap_or(SyncStatus::Synced)
    }

    /// Status of a leaf, if tracked
    pub fn leaf_status(&self, key: &str) -> Option<SyncStatus> {
        self.leaves.get(key).copied()
    }

    /// Computes the rollup of all tracked leaves beneath `dir`
    pub fn aggregate(&self, dir: &str) -> SyncStatus {
        let prefix = format!("{dir}/");
        self.leaves
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .fold(SyncStatus::Synced, |acc, (_, status)| acc.max(*status))
    }

    /// Number of tracked leaves
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Returns true if no leaf is tracked
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Iterates tracked leaves in key order
    pub fn leaves(&self) -> impl Iterator<Item = (&str, SyncStatus)> {
        self.leaves.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Drops every leaf and derived directory status
    pub fn clear(&mut self) {
        self.leaves.clear();
        self.dirs.clear();
    }

    fn recompute_ancestors(&mut self, key: &str) -> Vec<(String, SyncStatus)> {
        let mut changed = Vec::new();
        for dir in ancestor_keys(key) {
            let status = self.aggregate(dir);
            let previous = if self.has_descendants(dir) {
                self.dirs.insert(dir.to_string(), status)
            } else {
                self.dirs.remove(dir)
            };
            if previous.unwrap_or(SyncStatus::Synced) != status {
                changed.push((dir.to_string(), status));
            }
        }
        changed
    }

    fn has_descendants(&self, dir: &str) -> bool {
        let prefix = format!("{dir}/");
        self.leaves
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(&prefix))
    }
}

/// Ancestor directory keys of `key`, nearest first: `a/b/c` → `a/b`, `a`
fn ancestor_keys(key: &str) -> Vec<&str> {
    key.match_indices('/')
        .filter(|(idx, _)| *idx > 0)
        .map(|(idx, _)| &key[..idx])
        .rev()
        .collect()
}
