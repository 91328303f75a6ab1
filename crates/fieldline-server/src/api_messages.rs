//! Message intake handler.
//!
//! `POST /api/messages` accepts the raw envelope JSON, stores it verbatim,
//! and returns the opaque ref to hand to the workflow trigger endpoints.

use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::Response, Json};
use fieldline_ingest::source;
use serde::Serialize;
use serde_json::Value;

use crate::{internal_error, AppState};

/// Response for a stored inbound message.
#[derive(Debug, Serialize)]
pub struct StoreMessageResponse {
    /// Opaque reference to the stored message.
    #[serde(rename = "ref")]
    pub message_ref: i64,
}

/// Handler for `POST /api/messages`.
///
/// The body must be JSON but is otherwise stored without interpretation —
/// envelope validation happens when a workflow resolves the ref, so an
/// incomplete envelope still gets a ref and can be inspected later.
pub async fn store_message_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<StoreMessageResponse>), Response> {
    let pool = state.pool.clone();
    let raw = body.to_string();

    let message_ref = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        source::store_message(&conn, &raw).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| internal_error(format!("task join error: {e}")))?
    .map_err(internal_error)?;

    Ok((
        StatusCode::CREATED,
        Json(StoreMessageResponse { message_ref }),
    ))
}
