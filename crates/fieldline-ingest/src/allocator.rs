//! Monotonic primary-key allocation per logical table.
//!
//! Counter rows live in `incremental_indexes` and are seeded by migration;
//! this module never creates or deletes them.

use rusqlite::{params, Connection, OptionalExtension};

/// Allocates the next id for the named logical table.
///
/// The advance and the read happen in a single statement. The UPDATE
/// post-increments the counter and `RETURNING next_index - 1` hands back the
/// pre-increment value, eliminating the read-modify-write race where two
/// concurrent allocators could observe the same counter value and hand out
/// duplicate ids. An id is only ever returned by a successful advance, so a
/// failed advance cannot collide with a later allocation.
///
/// Returns `Ok(None)` when no counter row exists for `table_name`.
///
/// # Errors
///
/// Returns the underlying `rusqlite::Error` on SQL failure.
pub fn next_id(conn: &Connection, table_name: &str) -> Result<Option<i64>, rusqlite::Error> {
    let allocated: Option<i64> = conn
        .query_row(
            "UPDATE incremental_indexes
             SET next_index = next_index + 1
             WHERE table_name = ?1
             RETURNING next_index - 1",
            params![table_name],
            |row| row.get(0),
        )
        .optional()?;

    match allocated {
        Some(id) => tracing::debug!(table_name, id, "allocated table index"),
        None => tracing::warn!(table_name, "no counter row for logical table"),
    }

    Ok(allocated)
}
