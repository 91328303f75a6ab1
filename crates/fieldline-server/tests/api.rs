//! End-to-end tests for the HTTP surface: intake a message, trigger a
//! workflow, and read the result back through the API.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use fieldline_server::{app, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app(dir: &tempfile::TempDir) -> Router {
    let db_path = dir.path().join("fieldline-test.db");
    let pool = fieldline_db::create_pool(
        db_path.to_str().expect("utf-8 path"),
        fieldline_db::PoolSettings::default(),
    )
    .expect("pool creation should succeed");
    fieldline_db::run_migrations(&pool.get().expect("connection")).expect("migrations");

    app(Arc::new(AppState { pool }))
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn establish_envelope(device_id: i64, name: &str) -> Value {
    json!({
        "header": { "eventType": "establish" },
        "payload": { "deviceId": device_id, "individualName": name }
    })
}

fn observe_envelope(device_id: i64, temperature: &str, time: &str) -> Value {
    json!({
        "header": { "eventType": "observe" },
        "payload": {
            "deviceId": device_id,
            "temperatureCentigrade": temperature,
            "actualTime": time
        }
    })
}

#[tokio::test]
async fn health_check_returns_ok() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = test_app(&dir);

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn intake_establish_and_read_device() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = test_app(&dir);

    let (status, body) = post_json(&app, "/api/messages", establish_envelope(42, "sensor-7")).await;
    assert_eq!(status, StatusCode::CREATED);
    let message_ref = body["ref"].as_i64().expect("ref should be an integer");

    let (status, body) = post_json(
        &app,
        "/api/devices/establish",
        json!({ "ref": message_ref }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 0);
    assert_eq!(body["outcome"], "registered");

    let (status, body) = get_json(&app, "/api/devices/42").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["individual_name"], "sensor-7");
    assert_eq!(body["status"], "ESTABLISHED");

    let (status, body) = get_json(&app, "/api/devices").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn observe_flow_end_to_end() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = test_app(&dir);

    let (_, body) = post_json(&app, "/api/messages", establish_envelope(42, "sensor-7")).await;
    let est_ref = body["ref"].as_i64().expect("ref");
    post_json(&app, "/api/devices/establish", json!({ "ref": est_ref })).await;

    let (_, body) = post_json(
        &app,
        "/api/messages",
        observe_envelope(42, "23.5", "2024-05-01T12:30:00Z"),
    )
    .await;
    let obs_ref = body["ref"].as_i64().expect("ref");

    let (status, body) = post_json(
        &app,
        "/api/observations/observe",
        json!({ "ref": obs_ref }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 0);
    assert_eq!(body["outcome"], "recorded");

    let (status, body) = get_json(&app, "/api/observations/new").await;
    assert_eq!(status, StatusCode::OK);
    let pending = body.as_array().expect("array");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["device_id"], 42);
    assert_eq!(pending[0]["temperature_centigrade"], "23.5");
    assert_eq!(pending[0]["status"], "NEW");
}

#[tokio::test]
async fn identity_conflict_is_labelled_but_still_status_zero() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = test_app(&dir);

    let (_, body) = post_json(&app, "/api/messages", establish_envelope(1, "sensor-A")).await;
    let first = body["ref"].as_i64().expect("ref");
    post_json(&app, "/api/devices/establish", json!({ "ref": first })).await;

    let (_, body) = post_json(&app, "/api/messages", establish_envelope(2, "sensor-A")).await;
    let conflicting = body["ref"].as_i64().expect("ref");

    let (status, body) = post_json(
        &app,
        "/api/devices/establish",
        json!({ "ref": conflicting }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 0, "host contract: always zero");
    assert_eq!(body["outcome"], "identity_conflict");

    // The conflicting id was never registered.
    let (status, _) = get_json(&app, "/api/devices/2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_device_observation_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = test_app(&dir);

    let (_, body) = post_json(
        &app,
        "/api/messages",
        observe_envelope(500, "23.5", "2024-05-01T12:30:00Z"),
    )
    .await;
    let obs_ref = body["ref"].as_i64().expect("ref");

    let (status, body) = post_json(
        &app,
        "/api/observations/observe",
        json!({ "ref": obs_ref }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 0);
    assert_eq!(body["outcome"], "invalid_device");

    let (_, body) = get_json(&app, "/api/observations/new").await;
    assert!(body.as_array().expect("array").is_empty());
}

#[tokio::test]
async fn unknown_device_returns_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = test_app(&dir);

    let (status, body) = get_json(&app, "/api/devices/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().expect("error message").contains("999"));
}
