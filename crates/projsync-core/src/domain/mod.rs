//! Domain entities and business logic
//!
//! This module contains the core domain types for projsync:
//! - Newtypes for remote identifiers and remote document names
//! - The Sync Tree, an arena of selected filesystem entries
//! - Sync status values and the directory rollup tracker
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod status;
pub mod tree;

// Re-export commonly used types
pub use errors::DomainError;
pub use newtypes::*;
pub use status::{StatusTracker, SyncOutcome, SyncStatus};
pub use tree::{merge, EntryId, SyncTree, TreeEntry, TreeNode};
