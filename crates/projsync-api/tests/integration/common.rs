//! Shared test helpers for API integration tests
//!
//! Each helper starts a mock server and returns a client pointing at it.

use projsync_core::domain::{OrganizationId, ProjectId};
use wiremock::MockServer;

use projsync_api::client::ApiClient;
use projsync_api::provider::ApiDocumentStore;

pub const SESSION_KEY: &str = "sk-ant-test";
pub const ORG: &str = "7d1c5a0e-9b1e-4c61-8b41-5f6f2f1f0a11";
pub const PROJECT: &str = "0b7f4c3a-1111-4c61-8b41-5f6f2f1f0a22";
pub const DOC: &str = "4e0a3d1b-2222-4c61-8b41-5f6f2f1f0a33";

pub fn org() -> OrganizationId {
    ORG.parse().unwrap()
}

pub fn project() -> ProjectId {
    PROJECT.parse().unwrap()
}

pub fn docs_path() -> String {
    format!("/organizations/{ORG}/projects/{PROJECT}/docs")
}

/// Starts a mock server and returns a client for it
pub async fn setup_client() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::with_base_url(SESSION_KEY, server.uri()).expect("client builds");
    (server, client)
}

/// Starts a mock server and returns the port implementation for it
pub async fn setup_store() -> (MockServer, ApiDocumentStore) {
    let (server, client) = setup_client().await;
    (server, ApiDocumentStore::new(client))
}
