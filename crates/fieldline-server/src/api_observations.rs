//! Observation API handlers.
//!
//! Provides:
//! - `POST /api/observations/observe` — run the observe workflow for a
//!   stored message ref
//! - `GET /api/observations/new` — observations awaiting downstream
//!   consumption

use std::sync::Arc;

use axum::{extract::Extension, response::Response, Json};
use fieldline_ingest::{recorder, workflow};

use crate::api_devices::{TriggerRequest, TriggerResponse};
use crate::{internal_error, AppState};

/// Handler for `POST /api/observations/observe`.
pub async fn observe_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<TriggerRequest>,
) -> Result<Json<TriggerResponse>, Response> {
    let pool = state.pool.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| e.to_string())?;
        workflow::observe_temperature(&mut conn, req.message_ref)
            .map(|outcome| outcome.label().to_string())
            .map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| internal_error(format!("task join error: {e}")))?
    .map_err(internal_error)?;

    Ok(Json(TriggerResponse { status: 0, outcome }))
}

/// Handler for `GET /api/observations/new`.
pub async fn list_new_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<recorder::Observation>>, Response> {
    let pool = state.pool.clone();

    let observations = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        recorder::fetch_new(&conn).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| internal_error(format!("task join error: {e}")))?
    .map_err(internal_error)?;

    Ok(Json(observations))
}
