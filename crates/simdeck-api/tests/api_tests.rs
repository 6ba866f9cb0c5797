//! Integration tests for the registry API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. Each test gets its own temporary document and
//! file store.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use simdeck_api::router::build_router;
use simdeck_api::state::AppState;
use simdeck_core::{Registry, RegistryOptions};
use simdeck_store::{DocumentStore, FileStore, RegistryDocument};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "simdeck-test-boundary";

struct TestApp {
    _dir: TempDir,
    state: Arc<AppState>,
}

impl TestApp {
    fn uploads(&self) -> &std::path::Path {
        self.state.files.root()
    }
}

async fn make_test_state_with(options: RegistryOptions, max_body_bytes: usize) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    let documents = DocumentStore::new(dir.path().join("db.json"));
    let files = FileStore::new(&uploads, uploads.join(".staging"));
    files.ensure_dirs().await.unwrap();
    documents
        .save(&RegistryDocument::new(Registry::with_types(["temp", "pressure"])))
        .await
        .unwrap();

    let mut state = AppState::new(documents, files).with_options(options);
    state.max_body_bytes = max_body_bytes;
    TestApp {
        _dir: dir,
        state: Arc::new(state),
    }
}

async fn make_test_state() -> TestApp {
    make_test_state_with(RegistryOptions::default(), 1024 * 1024).await
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = build_router(Arc::clone(&app.state))
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_request(
    method: Method,
    uri: &str,
    fields: &[(&str, &str)],
    files: &[(&str, &str)],
) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    for (file_name, content) in files {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\nContent-Type: application/json\r\n\r\n{content}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn create(app: &TestApp, name: &str, sim_type: &str) {
    let (status, _) = send(
        app,
        json_request(
            Method::POST,
            "/api/simulation",
            &json!({ "name": name, "type": sim_type }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_create_and_get_simulation() {
    let app = make_test_state().await;

    let (status, json) = send(
        &app,
        json_request(
            Method::POST,
            "/api/simulation",
            &json!({ "name": "heat-run", "type": "temp", "description": "first" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["message"], "Simulation added successfully.");

    let (status, json) = send(&app, get("/api/simulation/heat-run")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["simulation"]["description"], "first");
    assert_eq!(json["simulation"]["type"], "temp");
    assert_eq!(json["isRunning"], false);
}

#[tokio::test]
async fn test_create_requires_name_and_type() {
    let app = make_test_state().await;
    let (status, json) = send(
        &app,
        json_request(Method::POST, "/api/simulation", &json!({ "name": "a" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Simulation name and type are required.");
    assert_eq!(json["kind"], "ValidationError");
}

#[tokio::test]
async fn test_create_unknown_type_is_rejected() {
    let app = make_test_state().await;
    let (status, json) = send(
        &app,
        json_request(
            Method::POST,
            "/api/simulation",
            &json!({ "name": "a", "type": "wind" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["kind"], "TypeNotFound");

    let (_, registry) = send(&app, get("/api/simulations")).await;
    assert_eq!(registry, json!({ "temp": [], "pressure": [] }));
}

#[tokio::test]
async fn test_create_duplicate_name_conflicts() {
    let app = make_test_state().await;
    create(&app, "a", "temp").await;
    let (status, json) = send(
        &app,
        json_request(
            Method::POST,
            "/api/simulation",
            &json!({ "name": "a", "type": "pressure" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"], 409);
}

#[tokio::test]
async fn test_create_inverted_range_is_rejected() {
    let app = make_test_state().await;
    let (status, json) = send(
        &app,
        json_request(
            Method::POST,
            "/api/simulation",
            &json!({
                "name": "a",
                "type": "temp",
                "startFileName": "temp-7.json",
                "endFileName": "temp-3.json",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "InvalidRange");
}

#[tokio::test]
async fn test_create_multipart_with_files() {
    let app = make_test_state().await;
    let (status, json) = send(
        &app,
        multipart_request(
            Method::POST,
            "/api/simulation",
            &[("name", "a"), ("type", "temp")],
            &[("temp-10.json", "ten"), ("temp-9.json", "nine")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["simulation"]["startFileName"], "temp-9.json");
    assert_eq!(json["simulation"]["endFileName"], "temp-10.json");

    let stored = tokio::fs::read_to_string(app.uploads().join("temp-9.json"))
        .await
        .unwrap();
    assert_eq!(stored, "nine");
}

#[tokio::test]
async fn test_toggle_requires_name() {
    let app = make_test_state().await;
    let (status, json) = send(
        &app,
        json_request(Method::POST, "/toggle-simulation-status", &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["error"],
        "Invalid request body. Please provide simulationName."
    );
}

#[tokio::test]
async fn test_toggle_unknown_simulation_not_found() {
    let app = make_test_state().await;
    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/toggle-simulation-status",
            &json!({ "simulationName": "ghost" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_toggle_keeps_one_running_per_type() {
    let app = make_test_state().await;
    create(&app, "x", "temp").await;
    create(&app, "y", "temp").await;
    create(&app, "z", "pressure").await;

    for name in ["z", "x", "y"] {
        let (status, json) = send(
            &app,
            json_request(
                Method::POST,
                "/toggle-simulation-status",
                &json!({ "simulationName": name }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Simulation status toggled successfully");
        assert_eq!(json["isRunning"], true);
    }

    let (_, registry) = send(&app, get("/api/simulations")).await;
    assert_eq!(registry["temp"][0]["isRunning"], false);
    assert_eq!(registry["temp"][1]["isRunning"], true);
    assert_eq!(registry["pressure"][0]["isRunning"], true);
}

#[tokio::test]
async fn test_delete_removes_every_match() {
    let options = RegistryOptions {
        unique_names: false,
    };
    let app = make_test_state_with(options, 1024 * 1024).await;
    create(&app, "x", "temp").await;
    create(&app, "x", "pressure").await;

    let (status, json) = send(
        &app,
        json_request(
            Method::DELETE,
            "/api/simulation",
            &json!({ "simulationName": "x" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Simulation 'x' deleted successfully.");
    assert_eq!(json["removed"], 2);

    let (status, _) = send(&app, get("/api/simulation/x")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_without_body_is_validation_error() {
    let app = make_test_state().await;
    let request = Request::delete("/api/simulation")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Simulation name is required.");
}

#[tokio::test]
async fn test_update_merges_fields() {
    let app = make_test_state().await;
    create(&app, "a", "temp").await;

    let (status, json) = send(
        &app,
        json_request(
            Method::PUT,
            "/api/simulation/a",
            &json!({ "description": "tuned", "type": "pressure" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Simulation updated successfully.");
    assert_eq!(json["simulation"]["description"], "tuned");
    assert_eq!(json["simulation"]["type"], "temp");
}

#[tokio::test]
async fn test_update_of_legacy_entry_keeps_document_layout() {
    let app = make_test_state().await;
    tokio::fs::write(
        app.state.documents.path(),
        r#"{"profile":{"name":"lab"},"simulationsRunning":{"temp":[{"simulation":{"type":"temp","name":"old","startFileName":"a-10.json","endFileName":"b-2.json"}}]}}"#,
    )
    .await
    .unwrap();

    let (status, _) = send(
        &app,
        json_request(Method::PUT, "/api/simulation/old", &json!({ "description": "kept" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let written = tokio::fs::read_to_string(app.state.documents.path()).await.unwrap();
    let written: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(
        written.to_string(),
        r#"{"profile":{"name":"lab"},"simulationsRunning":{"temp":[{"simulation":{"type":"temp","name":"old","startFileName":"a-10.json","endFileName":"b-2.json","description":"kept"}}]}}"#
    );
}

#[tokio::test]
async fn test_update_unknown_leaves_document_unchanged() {
    let app = make_test_state().await;
    create(&app, "a", "temp").await;
    let before = tokio::fs::read(app.state.documents.path()).await.unwrap();

    let (status, json) = send(
        &app,
        json_request(Method::PUT, "/api/simulation/ghost", &json!({ "description": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Simulation 'ghost' not found.");

    let after = tokio::fs::read(app.state.documents.path()).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_update_with_files_then_list_files() {
    let app = make_test_state().await;
    create(&app, "a", "temp").await;

    let (status, json) = send(
        &app,
        multipart_request(
            Method::PUT,
            "/api/simulation/a",
            &[("description", "with data")],
            &[
                ("temp-3.json", "{\"t\":3}"),
                ("temp-1.json", "{\"t\":1}"),
                ("temp-2.json", "{\"t\":2}"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["simulation"]["startFileName"], "temp-1.json");
    assert_eq!(json["simulation"]["endFileName"], "temp-3.json");

    let (status, files) = send(&app, get("/api/files?simulationName=a")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = files
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["fileName"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["temp-1.json", "temp-2.json", "temp-3.json"]);
    assert_eq!(files[1]["content"], "{\"t\":2}");
    assert_eq!(files[1]["mimeType"], "application/octet-stream");
}

#[tokio::test]
async fn test_upload_with_path_in_filename_is_rejected() {
    let app = make_test_state().await;
    create(&app, "a", "temp").await;

    let (status, json) = send(
        &app,
        multipart_request(
            Method::PUT,
            "/api/simulation/a",
            &[],
            &[("../escape-1.json", "x")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "ValidationError");
}

#[tokio::test]
async fn test_list_files_requires_name() {
    let app = make_test_state().await;
    let (status, json) = send(&app, get("/api/files")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Missing simulationName in request.");
}

#[tokio::test]
async fn test_list_files_without_range_is_validation_error() {
    let app = make_test_state().await;
    create(&app, "a", "temp").await;
    let (status, json) = send(&app, get("/api/files?simulationName=a")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["error"],
        "Simulation is missing startFileName or endFileName."
    );
}

#[tokio::test]
async fn test_list_files_missing_file_fails_whole_range() {
    let app = make_test_state().await;
    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/simulation",
            &json!({
                "name": "a",
                "type": "temp",
                "startFileName": "temp-1.json",
                "endFileName": "temp-2.json",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    tokio::fs::write(app.uploads().join("temp-1.json"), "one")
        .await
        .unwrap();

    let (status, json) = send(&app, get("/api/files?simulationName=a")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "FileNotFound");
}

#[tokio::test]
async fn test_range_files_are_classified_as_binary() {
    let app = make_test_state().await;
    create(&app, "a", "temp").await;
    let (status, _) = send(
        &app,
        json_request(
            Method::PUT,
            "/api/simulation/a",
            &json!({ "startFileName": "temp-1.txt", "endFileName": "temp-1.txt" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // Range names are always synthesized with a .json extension.
    tokio::fs::write(app.uploads().join("temp-1.json"), "data")
        .await
        .unwrap();

    let (_, files) = send(&app, get("/api/files?simulationName=a")).await;
    assert_eq!(files[0]["fileName"], "temp-1.json");
    assert_eq!(files[0]["mimeType"], "application/octet-stream");
}

#[tokio::test]
async fn test_document_path_serves_registry() {
    let app = make_test_state().await;
    create(&app, "a", "pressure").await;

    let (status, json) = send(&app, get("/simulationsRunning")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["pressure"][0]["simulation"]["name"], "a");
    assert_eq!(json["temp"], json!([]));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = make_test_state_with(RegistryOptions::default(), 64).await;
    let description = "x".repeat(256);
    let (status, json) = send(
        &app,
        json_request(
            Method::POST,
            "/api/simulation",
            &json!({ "name": "a", "type": "temp", "description": description }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["kind"], "PayloadTooLarge");
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let app = make_test_state().await;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/simulation")
        .header(header::ORIGIN, "http://dashboard.local")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .body(Body::empty())
        .unwrap();

    let response = build_router(Arc::clone(&app.state))
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let allow_origin = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(allow_origin, "*");
}
