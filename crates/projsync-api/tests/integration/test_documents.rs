//! Integration tests for document listing, upload and delete

use projsync_core::domain::{DocumentId, RemoteName};
use projsync_core::ports::{IRemoteDocumentStore, UploadOutcome};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_list_documents() {
    let (server, store) = common::setup_store().await;

    Mock::given(method("GET"))
        .and(path(common::docs_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "uuid": common::DOC,
                "file_name": "project/src/a.txt",
                "content": "hello",
                "created_at": "2024-05-01T10:00:00Z"
            }
        ])))
        .mount(&server)
        .await;

    let docs = store
        .list_documents(&common::org(), &common::project())
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].file_name, "project/src/a.txt");
    assert_eq!(docs[0].uuid, common::DOC.parse::<DocumentId>().unwrap());
}

#[tokio::test]
async fn test_upload_posts_name_and_content() {
    let (server, store) = common::setup_store().await;

    Mock::given(method("POST"))
        .and(path(common::docs_path()))
        .and(body_json(serde_json::json!({
            "file_name": "project/notes.md",
            "content": "# notes"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "uuid": common::DOC,
            "file_name": "project/notes.md"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let name = RemoteName::new("project/notes.md").unwrap();
    let outcome = store
        .upload_document(&common::org(), &common::project(), &name, "# notes")
        .await
        .unwrap();

    match outcome {
        UploadOutcome::Uploaded(doc) => assert_eq!(doc.file_name, "project/notes.md"),
        other => panic!("expected upload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_oversized_upload_is_skipped_without_request() {
    let (server, store) = common::setup_store().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let name = RemoteName::new("project/big.txt").unwrap();
    let content = "a".repeat(101 * 1024);
    let outcome = store
        .upload_document(&common::org(), &common::project(), &name, &content)
        .await
        .unwrap();

    assert!(matches!(outcome, UploadOutcome::Skipped { .. }));
}

#[tokio::test]
async fn test_delete_document() {
    let (server, store) = common::setup_store().await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/{}", common::docs_path(), common::DOC)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    store
        .delete_document(
            &common::org(),
            &common::project(),
            &common::DOC.parse().unwrap(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_of_missing_document_succeeds() {
    let (server, store) = common::setup_store().await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let result = store
        .delete_document(
            &common::org(),
            &common::project(),
            &common::DOC.parse().unwrap(),
        )
        .await;
    assert!(result.is_ok());
}
