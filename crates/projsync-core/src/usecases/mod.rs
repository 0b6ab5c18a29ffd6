//! Use cases for projsync
//!
//! Thin coordinators combining domain types with the local filesystem and
//! the ports.
//!
//! ## Use Cases
//!
//! - [`select_paths`] - File selection surface: filter, snapshot, merge, refresh
//! - [`ProjectSettings`] - Current project, per-project sync items, session

pub mod project_settings;
pub mod select_paths;

pub use project_settings::{ProjectSettings, Session};
pub use select_paths::{
    process_selected_paths, refresh_tree, select_files_and_folders, snapshot_directory, PathPicker,
};
