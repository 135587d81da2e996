//! Integration tests for the User File Server API
//!
//! These tests verify the complete request/response cycle for all endpoints.

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::path::PathBuf;
use tempfile::TempDir;
use tower::ServiceExt;

use user_file_server::{AppState, BlobStore, Config, open_database, routes};

const BOUNDARY: &str = "user-file-server-test-boundary";

// =============================================================================
// Test Helpers
// =============================================================================

struct TestApp {
    app: Router,
    upload_dir: PathBuf,
    _temp_dir: TempDir,
}

/// Create a test app backed by a temporary data directory
fn create_test_app() -> TestApp {
    create_test_app_with_config(|_| {})
}

fn create_test_app_with_config(customize: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::with_data_dir(temp_dir.path());
    customize(&mut config);

    let db = open_database(&config.database_path).expect("Failed to create test database");
    let blobs = BlobStore::open(&config.upload_dir).expect("Failed to create upload dir");
    let upload_dir = config.upload_dir.clone();

    TestApp {
        app: routes::router(AppState::new(db, blobs, config)),
        upload_dir,
        _temp_dir: temp_dir,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn register(&self, name: &str, email: &str) {
        let body = json!({ "name": name, "email": email });
        let response = self.send(make_post_request("/user", body.to_string())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    async fn upload(&self, email: &str, filename: &str, bytes: &[u8]) -> Response<Body> {
        self.send(make_upload_request(
            &format!("/user/{email}/file"),
            filename,
            bytes,
        ))
        .await
    }
}

/// Parse response body as JSON
async fn body_to_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_to_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

/// Create a POST request with JSON body
fn make_post_request(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

/// Create a multipart upload with a single `file` part
fn make_upload_request(uri: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Create a GET request
fn make_get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Create a DELETE request
fn make_delete_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check_returns_healthy() {
    let test_app = create_test_app();

    let response = test_app.send(make_get_request("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["uploads"], "available");
    assert!(body["version"].as_str().is_some());
}

// =============================================================================
// Registration Tests
// =============================================================================

#[tokio::test]
async fn test_register_user_success() {
    let test_app = create_test_app();

    let body = json!({ "name": "Ann", "email": "ann@x.com" });
    let response = test_app
        .send(make_post_request("/user", body.to_string()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["message"], "User added successfully");
}

#[tokio::test]
async fn test_register_duplicate_user_returns_conflict() {
    let test_app = create_test_app();
    test_app.register("Ann", "ann@x.com").await;

    let body = json!({ "name": "Ann", "email": "ann@x.com" });
    let response = test_app
        .send(make_post_request("/user", body.to_string()))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_to_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_register_missing_fields_returns_bad_request() {
    let test_app = create_test_app();

    for body in [
        json!({ "name": "Ann" }),
        json!({ "email": "ann@x.com" }),
        json!({ "name": "", "email": "ann@x.com" }),
    ] {
        let response = test_app
            .send(make_post_request("/user", body.to_string()))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["error"], "Name and email are required");
    }
}

#[tokio::test]
async fn test_register_malformed_json_returns_bad_request() {
    let test_app = create_test_app();

    let response = test_app
        .send(make_post_request("/user", "{not json".to_string()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_to_json(response.into_body()).await;
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_register_devices_for_same_email() {
    let test_app = create_test_app();

    for (device_id, expected_message) in [
        ("d1", "User added successfully"),
        ("d2", "Device added to existing user"),
    ] {
        let body = json!({ "name": "Ann", "email": "ann@x.com", "device_id": device_id });
        let response = test_app
            .send(make_post_request("/user", body.to_string()))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["message"], expected_message);
    }

    let body = json!({ "name": "Ann", "email": "ann@x.com", "device_id": "d1" });
    let response = test_app
        .send(make_post_request("/user", body.to_string()))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = test_app
        .send(make_get_request("/user/ann@x.com/device"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["email"], "ann@x.com");
    assert_eq!(body["device_ids"], json!(["d1", "d2"]));

    let response = test_app.send(make_get_request("/user")).await;
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

// =============================================================================
// Upload & Download Tests
// =============================================================================

#[tokio::test]
async fn test_upload_and_download_file() {
    let test_app = create_test_app();
    test_app.register("Ann", "ann@x.com").await;

    let response = test_app.upload("ann@x.com", "a.txt", b"hello world").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["message"], "File uploaded successfully");
    assert_eq!(body["file_id"], "ann@x.com_a.txt");
    assert_eq!(body["size_bytes"], 11);
    assert!(body["uploaded_at"].as_str().is_some());
    assert!(test_app.upload_dir.join("ann@x.com_a.txt").is_file());

    let response = test_app
        .send(make_get_request("/user/ann@x.com/file/ann@x.com_a.txt"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"a.txt\""
    );
    assert_eq!(body_to_bytes(response.into_body()).await, b"hello world");
}

#[tokio::test]
async fn test_upload_for_unknown_user_returns_not_found() {
    let test_app = create_test_app();

    let response = test_app.upload("ghost@x.com", "a.txt", b"boo").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["error"], "User not found");
    assert_eq!(std::fs::read_dir(&test_app.upload_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_upload_without_file_part_returns_bad_request() {
    let test_app = create_test_app();
    test_app.register("Ann", "ann@x.com").await;

    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/user/ann@x.com/file")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = test_app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["error"], "Email and file are required");
}

#[tokio::test]
async fn test_upload_non_multipart_returns_bad_request() {
    let test_app = create_test_app();
    test_app.register("Ann", "ann@x.com").await;

    let response = test_app
        .send(make_post_request("/user/ann@x.com/file", "{}".to_string()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_too_large_returns_payload_too_large() {
    let test_app = create_test_app_with_config(|config| config.max_upload_bytes = 8);
    test_app.register("Ann", "ann@x.com").await;

    let response = test_app
        .upload("ann@x.com", "big.bin", b"0123456789")
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_reupload_replaces_file() {
    let test_app = create_test_app();
    test_app.register("Ann", "ann@x.com").await;

    test_app.upload("ann@x.com", "a.txt", b"first").await;
    let response = test_app.upload("ann@x.com", "a.txt", b"second").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = test_app.send(make_get_request("/user/ann@x.com/file")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["file_ids"], json!(["ann@x.com_a.txt"]));

    let response = test_app
        .send(make_get_request("/user/ann@x.com/file/ann@x.com_a.txt"))
        .await;
    assert_eq!(body_to_bytes(response.into_body()).await, b"second");
}

#[tokio::test]
async fn test_download_missing_file_returns_not_found() {
    let test_app = create_test_app();
    test_app.register("Ann", "ann@x.com").await;

    let response = test_app
        .send(make_get_request("/user/ann@x.com/file/ann@x.com_nope.txt"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Association exists but the blob was removed out of band
    test_app.upload("ann@x.com", "a.txt", b"hi").await;
    std::fs::remove_file(test_app.upload_dir.join("ann@x.com_a.txt")).unwrap();

    let response = test_app
        .send(make_get_request("/user/ann@x.com/file/ann@x.com_a.txt"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_files_for_unknown_user_returns_not_found() {
    let test_app = create_test_app();

    let response = test_app
        .send(make_get_request("/user/ghost@x.com/file"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_single_file() {
    let test_app = create_test_app();
    test_app.register("Ann", "ann@x.com").await;
    test_app.upload("ann@x.com", "a.txt", b"a").await;
    test_app.upload("ann@x.com", "b.txt", b"b").await;

    let response = test_app
        .send(make_delete_request("/user/ann@x.com/file/ann@x.com_a.txt"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!test_app.upload_dir.join("ann@x.com_a.txt").exists());

    let response = test_app.send(make_get_request("/user/ann@x.com")).await;
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["file_ids"], json!(["ann@x.com_b.txt"]));

    let response = test_app
        .send(make_delete_request("/user/ann@x.com/file/ann@x.com_a.txt"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Lookup & Deletion Tests
// =============================================================================

#[tokio::test]
async fn test_get_unknown_user_returns_not_found() {
    let test_app = create_test_app();

    let response = test_app.send(make_get_request("/user/ghost@x.com")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn test_list_users_in_registration_order() {
    let test_app = create_test_app();
    test_app.register("Cy", "cy@x.com").await;
    test_app.register("Ann", "ann@x.com").await;
    test_app.upload("ann@x.com", "a.txt", b"a").await;

    let response = test_app.send(make_get_request("/user")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(
        body,
        json!([
            { "name": "Cy", "email": "cy@x.com", "file_ids": [], "device_ids": [] },
            { "name": "Ann", "email": "ann@x.com", "file_ids": ["ann@x.com_a.txt"], "device_ids": [] },
        ])
    );
}

#[tokio::test]
async fn test_delete_user_removes_files() {
    let test_app = create_test_app();
    test_app.register("Ann", "ann@x.com").await;
    for name in ["a.txt", "b.txt", "c.txt"] {
        test_app.upload("ann@x.com", name, b"data").await;
    }

    let response = test_app
        .send(make_delete_request("/user/ann@x.com"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["files_deleted"], 3);
    assert_eq!(
        body["message"],
        "User with email ann@x.com and associated files deleted successfully"
    );

    let response = test_app.send(make_get_request("/user/ann@x.com")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(std::fs::read_dir(&test_app.upload_dir).unwrap().count(), 0);

    let response = test_app
        .send(make_delete_request("/user/ann@x.com"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_all_users() {
    let test_app = create_test_app();
    test_app.register("Ann", "ann@x.com").await;
    test_app.register("Bob", "bob@x.com").await;
    test_app.upload("ann@x.com", "a.txt", b"a").await;
    test_app.upload("bob@x.com", "b.txt", b"b").await;

    let response = test_app.send(make_delete_request("/user")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["users_deleted"], 2);
    assert_eq!(body["files_deleted"], 2);

    let response = test_app.send(make_get_request("/user")).await;
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body, json!([]));
    assert_eq!(std::fs::read_dir(&test_app.upload_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_register_upload_get_delete_scenario() {
    let test_app = create_test_app();
    test_app.register("Ann", "ann@x.com").await;

    let response = test_app.upload("ann@x.com", "a.txt", b"hi").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = test_app.send(make_get_request("/user/ann@x.com")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["name"], "Ann");
    assert_eq!(body["email"], "ann@x.com");
    assert_eq!(body["file_ids"], json!(["ann@x.com_a.txt"]));

    let response = test_app
        .send(make_delete_request("/user/ann@x.com"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = test_app.send(make_get_request("/user/ann@x.com")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Stats Tests
// =============================================================================

#[tokio::test]
async fn test_stats_counts_records() {
    let test_app = create_test_app();
    test_app.register("Ann", "ann@x.com").await;
    test_app.upload("ann@x.com", "a.txt", b"1234").await;

    let response = test_app.send(make_get_request("/stats")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["user_count"], 1);
    assert_eq!(body["file_count"], 1);
    assert_eq!(body["device_count"], 0);
    assert_eq!(body["uploads_size_bytes"], 4);
    assert!(body["database_size_bytes"].as_u64().unwrap() > 0);
    assert!(body["database_size_human"].as_str().is_some());
}
