//! Integration tests for project listing and error mapping

use projsync_api::ApiError;
use projsync_core::ports::{IRemoteDocumentStore, RemoteError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_list_projects_sends_session_cookie() {
    let (server, client) = common::setup_client().await;

    Mock::given(method("GET"))
        .and(path(format!("/organizations/{}/projects", common::ORG)))
        .and(header("cookie", format!("sessionKey={}", common::SESSION_KEY).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "uuid": common::PROJECT, "name": "Docs", "is_private": true },
            { "uuid": "9a9a9a9a-3333-4c61-8b41-5f6f2f1f0a44", "name": "Other" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let projects = client.list_projects(&common::org()).await.unwrap();

    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].uuid, common::project());
    assert_eq!(projects[0].name, "Docs");
}

#[tokio::test]
async fn test_unauthorized_response() {
    let (server, client) = common::setup_client().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("session expired"))
        .mount(&server)
        .await;

    let err = client.list_projects(&common::org()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(ref body) if body == "session expired"));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let (server, store) = common::setup_store().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = store.list_projects(&common::org()).await.unwrap_err();
    assert!(matches!(err, RemoteError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_server_error_maps_to_status() {
    let (server, store) = common::setup_store().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let err = store.list_projects(&common::org()).await.unwrap_err();
    assert_eq!(
        err,
        RemoteError::Status {
            status: 503,
            body: "unavailable".into()
        }
    );
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let client = projsync_api::client::ApiClient::with_base_url("sk", "http://127.0.0.1:9").unwrap();
    let store = projsync_api::provider::ApiDocumentStore::new(client);

    let err = store.list_projects(&common::org()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)));
}
