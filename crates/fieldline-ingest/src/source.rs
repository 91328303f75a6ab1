//! Raw message intake and retrieval.
//!
//! Workflows never see request bodies directly; they receive an opaque ref
//! and resolve it here. The intake table is append-only — messages are kept
//! as received so a rejected envelope can be inspected after the fact.

use rusqlite::{params, Connection, OptionalExtension};

/// Stores a raw inbound message and returns its ref.
///
/// # Errors
///
/// Returns the underlying `rusqlite::Error` on SQL failure.
pub fn store_message(conn: &Connection, raw: &str) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO inbound_messages (raw) VALUES (?1)",
        params![raw],
    )?;
    let message_ref = conn.last_insert_rowid();
    tracing::debug!(message_ref, bytes = raw.len(), "stored inbound message");
    Ok(message_ref)
}

/// Fetches the raw message for an opaque ref.
///
/// Returns `Ok(None)` when no message exists for the ref.
///
/// # Errors
///
/// Returns the underlying `rusqlite::Error` on SQL failure.
pub fn fetch_message(conn: &Connection, message_ref: i64) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT raw FROM inbound_messages WHERE id = ?1",
        params![message_ref],
        |row| row.get(0),
    )
    .optional()
}
