//! projsync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `SyncTree`, `SyncStatus`, `StatusTracker`, `RemoteName`
//! - **Path filtering** - `PathFilter` deciding which paths take part in sync
//! - **Use cases** - file selection and per-project settings
//! - **Port definitions** - Traits for adapters: `IRemoteDocumentStore`, `ISettingsStore`
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O. Ports define
//! trait interfaces that adapter crates implement (`projsync-api` for the
//! remote store, `projsync-store` for settings). Use cases combine domain
//! types with the local filesystem and the ports.

pub mod config;
pub mod domain;
pub mod filter;
pub mod ports;
pub mod usecases;
