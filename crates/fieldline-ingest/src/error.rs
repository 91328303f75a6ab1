//! Error types for the ingestion layer.

/// Errors produced while resolving and decoding an inbound envelope.
///
/// Decode failures are rejections, not faults: workflows log them and abort
/// without mutation, and the host still sees status code `0`.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// No inbound message exists for the given ref.
    #[error("no message stored for ref {0}")]
    UnknownRef(i64),

    /// The raw message is not valid JSON.
    #[error("message is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The envelope or payload lacks a required key, or the key holds a
    /// value of the wrong type.
    #[error("missing or mistyped field: {0}")]
    MissingField(&'static str),

    /// A field is present and of the right type but its value is unusable.
    #[error("field {field} is malformed: {reason}")]
    MalformedField {
        /// The offending field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Errors that can abort an ingestion workflow outright.
///
/// Distinct from [`DecodeError`]: a store fault here means the workflow could
/// not run to completion, not that the message was rejected.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A database operation failed.
    #[error("ingest database error: {0}")]
    Database(#[from] rusqlite::Error),
}
