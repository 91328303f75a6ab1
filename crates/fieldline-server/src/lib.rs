//! Fieldline server library logic.
//!
//! Assembles the axum router over the ingestion pipeline: a message intake
//! endpoint that assigns refs, trigger endpoints for the two workflows, and
//! read endpoints for devices and pending observations.

pub mod api_devices;
pub mod api_messages;
pub mod api_observations;
pub mod config;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use fieldline_db::DbPool;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
}

/// Health check handler.
///
/// Returns `200 OK` with server status and version. Used by load balancers,
/// monitoring, and CI to verify the server is running.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes and shared state.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/messages", post(api_messages::store_message_handler))
        .route(
            "/api/devices/establish",
            post(api_devices::establish_handler),
        )
        .route("/api/devices", get(api_devices::list_devices_handler))
        .route("/api/devices/{id}", get(api_devices::get_device_handler))
        .route(
            "/api/observations/observe",
            post(api_observations::observe_handler),
        )
        .route(
            "/api/observations/new",
            get(api_observations::list_new_handler),
        )
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Maps a connection-pool or blocking-task failure into a 500 response.
///
/// Workflow rejections never reach this path: the workflows swallow them by
/// design, so a 500 here always means infrastructure trouble.
pub(crate) fn internal_error(detail: String) -> axum::response::Response {
    use axum::response::IntoResponse;
    (
        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": detail })),
    )
        .into_response()
}
