//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the core depends on; their implementations live
//! in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteDocumentStore`] - Project listing and document list/upload/delete
//! - [`ISettingsStore`] - Durable key/value storage for session and sync items

pub mod remote_store;
pub mod settings_store;

pub use remote_store::{
    IRemoteDocumentStore, ProjectSummary, RemoteDocument, RemoteError, UploadOutcome,
};
pub use settings_store::ISettingsStore;
