//! Device API handlers.
//!
//! Provides:
//! - `POST /api/devices/establish` — run the establish workflow for a stored
//!   message ref
//! - `GET /api/devices` — list registered devices
//! - `GET /api/devices/{id}` — fetch a single device

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fieldline_ingest::{directory, workflow};
use serde::{Deserialize, Serialize};

use crate::{internal_error, AppState};

/// Request body for the workflow trigger endpoints.
#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    /// The ref returned by `POST /api/messages`.
    #[serde(rename = "ref")]
    pub message_ref: i64,
}

/// Response for a workflow trigger.
///
/// `status` is the host contract value and is always `0`; `outcome` labels
/// what actually happened for operators and tests.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    /// Host-facing status code (always `0`).
    pub status: i32,
    /// Outcome label (`registered`, `reconfirmed`, `identity_conflict`, ...).
    pub outcome: String,
}

/// Handler for `POST /api/devices/establish`.
pub async fn establish_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<TriggerRequest>,
) -> Result<Json<TriggerResponse>, Response> {
    let pool = state.pool.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| e.to_string())?;
        workflow::establish_device(&mut conn, req.message_ref)
            .map(|outcome| outcome.label().to_string())
            .map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| internal_error(format!("task join error: {e}")))?
    .map_err(internal_error)?;

    Ok(Json(TriggerResponse { status: 0, outcome }))
}

/// Handler for `GET /api/devices`.
pub async fn list_devices_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<directory::Device>>, Response> {
    let pool = state.pool.clone();

    let devices = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        directory::list(&conn).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| internal_error(format!("task join error: {e}")))?
    .map_err(internal_error)?;

    Ok(Json(devices))
}

/// Handler for `GET /api/devices/{id}`.
pub async fn get_device_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(device_id): Path<i64>,
) -> Result<Json<directory::Device>, Response> {
    let pool = state.pool.clone();

    let device = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        directory::get(&conn, device_id).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| internal_error(format!("task join error: {e}")))?
    .map_err(internal_error)?;

    match device {
        Some(device) => Ok(Json(device)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("no device with id {device_id}") })),
        )
            .into_response()),
    }
}
