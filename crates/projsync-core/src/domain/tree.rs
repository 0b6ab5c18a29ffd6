//! Sync Tree
//!
//! The set of local files and folders mirrored into a project. The tree is
//! stored as an arena: a flat table of [`TreeEntry`] values keyed by
//! [`EntryId`], with parent/child relationships held as id references and an
//! ordered list of top-level roots.
//!
//! For persistence and for the selection surface the tree converts to and
//! from the nested [`TreeNode`] form:
//!
//! ```json
//! [{ "name": "project", "path": "/home/u/project", "isDirectory": true,
//!    "children": [{ "name": "a.txt", "path": "/home/u/project/a.txt", "isDirectory": false }] }]
//! ```
//!
//! ## Merge rule
//!
//! Merging folds a newly selected entry that lies beneath an existing
//! top-level directory root into that root's children instead of adding a
//! second, overlapping root. Only top-level roots are considered as parents:
//! an entry beneath an already nested child becomes a child of the top-level
//! root, never a grandchild.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ============================================================================
// TreeNode (nested, serializable form)
// ============================================================================

/// Nested, serializable form of one Sync Tree entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Display name (base name of `path`)
    pub name: String,
    /// Absolute local path
    pub path: PathBuf,
    /// Whether the entry is a directory
    pub is_directory: bool,
    /// Snapshot of directory contents; `None` for files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    /// Creates a file node
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: base_name(&path),
            path,
            is_directory: false,
            children: None,
        }
    }

    /// Creates a directory node with the given children snapshot
    pub fn directory(path: impl Into<PathBuf>, children: Vec<TreeNode>) -> Self {
        let path = path.into();
        Self {
            name: base_name(&path),
            path,
            is_directory: true,
            children: Some(children),
        }
    }

    /// Counts this node and every descendant
    pub fn count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(TreeNode::count)
            .sum::<usize>()
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Returns true if `child` is strictly beneath `parent` (component-wise)
pub fn is_sub_path(parent: &Path, child: &Path) -> bool {
    child != parent && child.starts_with(parent)
}

// ============================================================================
// Arena types
// ============================================================================

/// Stable identifier of an entry within one [`SyncTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One entry of the Sync Tree arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    id: EntryId,
    name: String,
    path: PathBuf,
    is_directory: bool,
    parent: Option<EntryId>,
    children: Vec<EntryId>,
}

impl TreeEntry {
    /// Returns the entry id
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Returns the display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the absolute local path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the entry is a directory
    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// Returns the parent entry, `None` for top-level roots
    pub fn parent(&self) -> Option<EntryId> {
        self.parent
    }

    /// Returns the child ids in order
    pub fn children(&self) -> &[EntryId] {
        &self.children
    }
}

// ============================================================================
// SyncTree
// ============================================================================

/// Ordered forest of sync roots and their retained children
#[derive(Debug, Clone, Default)]
pub struct SyncTree {
    entries: BTreeMap<EntryId, TreeEntry>,
    roots: Vec<EntryId>,
    next_id: u64,
}

impl SyncTree {
    /// Creates an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from its nested form, preserving order
    pub fn from_nodes(nodes: &[TreeNode]) -> Self {
        let mut tree = Self::new();
        for node in nodes {
            let id = tree.insert(node, None);
            tree.roots.push(id);
        }
        tree
    }

    /// Converts the tree back into its nested form
    pub fn to_nodes(&self) -> Vec<TreeNode> {
        self.roots
            .iter()
            .filter_map(|id| self.to_node(*id))
            .collect()
    }

    /// Returns the entry with the given id
    pub fn get(&self, id: EntryId) -> Option<&TreeEntry> {
        self.entries.get(&id)
    }

    /// Iterates top-level roots in order
    pub fn roots(&self) -> impl Iterator<Item = &TreeEntry> {
        self.roots.iter().filter_map(|id| self.entries.get(id))
    }

    /// Number of entries, nested ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the tree has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges newly selected entries into a copy of this tree
    ///
    /// For each new entry, in order:
    /// 1. an entry whose path equals a top-level root's path is skipped;
    /// 2. an entry beneath a top-level directory root is appended to that
    ///    root's children (skipped if a direct child already has its path);
    /// 3. anything else becomes a new top-level root.
    ///
    /// Roots appended earlier in the same call are candidates for step 2.
    pub fn merge(&self, new_entries: &[TreeNode]) -> SyncTree {
        let mut merged = self.clone();
        for node in new_entries {
            merged.merge_one(node);
        }
        merged
    }

    fn merge_one(&mut self, node: &TreeNode) {
        if self.roots().any(|root| root.path == node.path) {
            return;
        }

        let parent = self
            .roots()
            .find(|root| root.is_directory && is_sub_path(&root.path, &node.path))
            .map(|root| root.id);

        match parent {
            Some(parent) => {
                let duplicate = self.entries.get(&parent).is_some_and(|root| {
                    root.children
                        .iter()
                        .filter_map(|child| self.entries.get(child))
                        .any(|child| child.path == node.path)
                });
                if !duplicate {
                    let id = self.insert(node, Some(parent));
                    if let Some(entry) = self.entries.get_mut(&parent) {
                        entry.children.push(id);
                    }
                }
            }
            None => {
                let id = self.insert(node, None);
                self.roots.push(id);
            }
        }
    }

    /// Removes the first entry with exactly `path`, together with its subtree
    ///
    /// Entries are searched depth-first, roots first. Returns true if an
    /// entry was removed.
    pub fn remove(&mut self, path: &Path) -> bool {
        let Some(id) = self.find(path) else {
            return false;
        };

        match self.entries.get(&id).and_then(|entry| entry.parent) {
            Some(parent) => {
                if let Some(entry) = self.entries.get_mut(&parent) {
                    entry.children.retain(|child| *child != id);
                }
            }
            None => self.roots.retain(|root| *root != id),
        }

        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(entry) = self.entries.remove(&next) {
                stack.extend(entry.children);
            }
        }
        true
    }

    /// Replaces the children snapshot of a directory entry
    ///
    /// Returns false if `id` is unknown or not a directory.
    pub fn replace_children(&mut self, id: EntryId, children: &[TreeNode]) -> bool {
        let old = match self.entries.get_mut(&id) {
            Some(entry) if entry.is_directory => std::mem::take(&mut entry.children),
            _ => return false,
        };

        let mut stack = old;
        while let Some(next) = stack.pop() {
            if let Some(entry) = self.entries.remove(&next) {
                stack.extend(entry.children);
            }
        }

        let ids: Vec<EntryId> = children
            .iter()
            .map(|child| self.insert(child, Some(id)))
            .collect();
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.children = ids;
        }
        true
    }

    /// Finds the first entry with exactly `path`, depth-first, roots first
    pub fn find(&self, path: &Path) -> Option<EntryId> {
        let mut stack: Vec<EntryId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let entry = self.entries.get(&id)?;
            if entry.path == path {
                return Some(id);
            }
            stack.extend(entry.children.iter().rev().copied());
        }
        None
    }

    /// Every path in the tree, depth-first in tree order
    pub fn all_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(self.entries.len());
        let mut stack: Vec<EntryId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Some(entry) = self.entries.get(&id) {
                paths.push(entry.path.clone());
                stack.extend(entry.children.iter().rev().copied());
            }
        }
        paths
    }

    /// Paths to hand to the watcher: no returned path lies beneath another
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        minimal_cover(self.all_paths())
    }

    /// The top-level root owning `path` (longest component-wise prefix)
    ///
    /// A file selected directly as a root owns only its own path.
    pub fn find_sync_root(&self, path: &Path) -> Option<&Path> {
        self.roots()
            .filter(|root| path.starts_with(&root.path))
            .max_by_key(|root| root.path.components().count())
            .map(|root| root.path.as_path())
    }

    fn insert(&mut self, node: &TreeNode, parent: Option<EntryId>) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;

        let children: Vec<EntryId> = node
            .children
            .iter()
            .flatten()
            .map(|child| self.insert(child, Some(id)))
            .collect();

        self.entries.insert(
            id,
            TreeEntry {
                id,
                name: node.name.clone(),
                path: node.path.clone(),
                is_directory: node.is_directory,
                parent,
                children,
            },
        );
        id
    }

    fn to_node(&self, id: EntryId) -> Option<TreeNode> {
        let entry = self.entries.get(&id)?;
        let children = entry.is_directory.then(|| {
            entry
                .children
                .iter()
                .filter_map(|child| self.to_node(*child))
                .collect()
        });
        Some(TreeNode {
            name: entry.name.clone(),
            path: entry.path.clone(),
            is_directory: entry.is_directory,
            children,
        })
    }
}

impl From<Vec<TreeNode>> for SyncTree {
    fn from(nodes: Vec<TreeNode>) -> Self {
        SyncTree::from_nodes(&nodes)
    }
}

/// Pure merge over the nested form
///
/// # Arguments
///
/// * `existing` - Current top-level roots
/// * `new_entries` - Newly selected entries, in selection order
pub fn merge(existing: &[TreeNode], new_entries: &[TreeNode]) -> Vec<TreeNode> {
    SyncTree::from_nodes(existing).merge(new_entries).to_nodes()
}

/// Reduces a path set so that no path is beneath another
///
/// Component-wise ordering places every descendant directly after its
/// ancestor, so one sorted sweep is enough.
fn minimal_cover(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort();
    paths.dedup();
    let mut cover: Vec<PathBuf> = Vec::new();
    for path in paths {
        match cover.last() {
            Some(last) if path.starts_with(last) => {}
            _ => cover.push(path),
        }
    }
    cover
}
