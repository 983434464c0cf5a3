//! CouchDB HTTP integration tests using wiremock
//!
//! These tests drive the bootstrapper and the storage API against a mock
//! CouchDB server and check the requests that reach it.

use couchstate_core::{DocumentError, Storage, StorageError};
use serde_json::json;
use wiremock::matchers::{basic_auth, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, database: &str) -> String {
    json!({ "url": server.uri(), "databaseName": database }).to_string()
}

async fn mount_existing_db(server: &MockServer, database: &str) {
    Mock::given(method("GET"))
        .and(path("/_all_dbs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["_users", database])))
        .mount(server)
        .await;
}

async fn initialized(server: &MockServer) -> Storage {
    mount_existing_db(server, "app").await;
    let storage = Storage::new();
    storage
        .init(Some(&config(server, "app")))
        .await
        .expect("Failed to initialize");
    storage
}

#[tokio::test]
async fn test_init_creates_missing_database() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/_all_dbs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["_users"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/app"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Storage::new();
    storage.init(Some(&config(&server, "app"))).await.unwrap();
    assert!(storage.is_initialized());
}

#[tokio::test]
async fn test_init_twice_against_existing_database() {
    let server = MockServer::start().await;

    mount_existing_db(&server, "app").await;
    Mock::given(method("PUT"))
        .and(path("/app"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let storage = Storage::new();
    storage.init(Some(&config(&server, "app"))).await.unwrap();
    storage.init(Some(&config(&server, "app"))).await.unwrap();
}

#[tokio::test]
async fn test_init_tolerates_concurrent_create() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/_all_dbs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/app"))
        .respond_with(ResponseTemplate::new(412).set_body_json(json!({
            "error": "file_exists",
            "reason": "The database could not be created, the file already exists."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Storage::new();
    storage.init(Some(&config(&server, "app"))).await.unwrap();
}

#[tokio::test]
async fn test_init_rejected_listing_is_connectivity_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/_all_dbs"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "unauthorized",
            "reason": "Name or password is incorrect."
        })))
        .mount(&server)
        .await;

    let storage = Storage::new();
    let err = storage
        .init(Some(&config(&server, "app")))
        .await
        .unwrap_err();

    match err {
        StorageError::Connectivity(DocumentError::Http { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "unauthorized: Name or password is incorrect.");
        }
        other => panic!("expected Connectivity, got {other:?}"),
    }
    assert!(!storage.is_initialized());
}

#[tokio::test]
async fn test_init_unreachable_server_is_connectivity_error() {
    // Nothing listens on port 1
    let uri = "http://127.0.0.1:1";

    let storage = Storage::new();
    let config = json!({ "url": uri, "databaseName": "app" }).to_string();
    let err = storage.init(Some(&config)).await.unwrap_err();

    assert!(matches!(
        err,
        StorageError::Connectivity(DocumentError::Transport(_))
    ));
    assert_eq!(err.code(), "CONNECTIVITY_ERROR");
}

#[tokio::test]
async fn test_credentials_in_url_become_basic_auth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/_all_dbs"))
        .and(basic_auth("admin", "p@ss"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["app"])))
        .expect(1)
        .mount(&server)
        .await;

    let address = server.address();
    let url = format!("http://admin:p%40ss@{address}");
    let storage = Storage::new();
    storage
        .init(Some(&json!({ "url": url, "app_db": "app" }).to_string()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_first_run_scenario() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/_all_dbs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/app"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    // Absent for the first read and for the fetch inside save
    Mock::given(method("GET"))
        .and(path("/app/nodered_flows"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "not_found",
            "reason": "missing"
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/app/nodered_flows"))
        .and(body_json(json!({"_id": "nodered_flows", "flows": [{"id": "n1"}]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true, "id": "nodered_flows", "rev": "1-a"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/app/nodered_flows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "nodered_flows", "_rev": "1-a", "flows": [{"id": "n1"}]
        })))
        .mount(&server)
        .await;

    let storage = Storage::new();
    storage.init(Some(&config(&server, "app"))).await.unwrap();

    assert!(storage.get_flows().await.unwrap().is_empty());
    storage.save_flows(vec![json!({"id": "n1"})]).await.unwrap();
    assert_eq!(storage.get_flows().await.unwrap(), vec![json!({"id": "n1"})]);
}

#[tokio::test]
async fn test_save_sends_revision_and_foreign_fields_back() {
    let server = MockServer::start().await;
    let storage = initialized(&server).await;

    Mock::given(method("GET"))
        .and(path("/app/nodered_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "nodered_settings",
            "_rev": "4-abc",
            "owner": "ops",
            "settings": {"old": true}
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/app/nodered_settings"))
        .and(body_json(json!({
            "_id": "nodered_settings",
            "_rev": "4-abc",
            "owner": "ops",
            "settings": {"new": true}
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = serde_json::Map::new();
    settings.insert("new".into(), json!(true));
    storage.save_settings(settings).await.unwrap();
}

#[tokio::test]
async fn test_write_conflict_is_store_error() {
    let server = MockServer::start().await;
    let storage = initialized(&server).await;

    Mock::given(method("GET"))
        .and(path("/app/nodered_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "nodered_credentials",
            "_rev": "1-old",
            "credentials": {}
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/app/nodered_credentials"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": "conflict",
            "reason": "Document update conflict."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = storage
        .save_credentials(serde_json::Map::new())
        .await
        .unwrap_err();

    match err {
        StorageError::Store {
            operation,
            document,
            source: DocumentError::Conflict(message),
        } => {
            assert_eq!(operation, "saving");
            assert_eq!(document, "nodered_credentials");
            assert_eq!(message, "conflict: Document update conflict.");
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_on_fetch_skips_write() {
    let server = MockServer::start().await;
    let storage = initialized(&server).await;

    Mock::given(method("GET"))
        .and(path("/app/nodered_flows"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/app/nodered_flows"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = storage.save_flows(Vec::new()).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Store {
            source: DocumentError::Http { status: 500, .. },
            ..
        }
    ));

    let err = storage.get_flows().await.unwrap_err();
    assert_eq!(err.code(), "STORE_ERROR");
}
