//! Persistence of temperature observations.
//!
//! All writes go through [`record`], which allocates the primary key and
//! inserts the row inside one savepoint, so a crash or fault between the two
//! statements cannot burn an id without a matching row or leave a row with a
//! contested key. Rows are created with status `NEW`; downstream consumption
//! of `NEW` rows is not this module's concern beyond [`fetch_new`].

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::allocator;

/// Logical table name the allocator keys observation ids on.
pub const OBSERVATIONS_TABLE: &str = "observations";

/// A single row from the `observations` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Allocator-assigned primary key.
    pub id: i64,
    /// The device this reading came from.
    pub device_id: i64,
    /// String-encoded temperature reading.
    pub temperature_centigrade: String,
    /// Timestamp of the reading, as received.
    pub actual_time: String,
    /// Processing status (`NEW` until consumed downstream).
    pub status: String,
    /// ISO 8601 timestamp of row creation.
    pub created_at: String,
}

/// Records a temperature observation for a device.
///
/// Allocates a new id keyed on [`OBSERVATIONS_TABLE`]; if no counter row
/// exists the insert is skipped entirely and `Ok(None)` is returned. On
/// success the return value echoes the *device* id, not the allocated
/// observation id — callers needing the latter must capture it at allocation
/// time.
///
/// # Errors
///
/// Returns the underlying `rusqlite::Error` on SQL failure; the savepoint
/// rolls back, discarding the allocation.
pub fn record(
    conn: &mut Connection,
    device_id: i64,
    temperature_centigrade: &str,
    actual_time: &str,
) -> Result<Option<i64>, rusqlite::Error> {
    let sp = conn.savepoint()?;

    let Some(observation_id) = allocator::next_id(&sp, OBSERVATIONS_TABLE)? else {
        return Ok(None);
    };

    sp.execute(
        "INSERT INTO observations (id, device_id, temperature_centigrade, actual_time)
         VALUES (?1, ?2, ?3, ?4)",
        params![observation_id, device_id, temperature_centigrade, actual_time],
    )?;

    sp.commit()?;

    tracing::info!(
        observation_id,
        device_id,
        temperature_centigrade,
        "recorded observation"
    );

    Ok(Some(device_id))
}

/// Returns all observations still awaiting downstream consumption, oldest
/// first.
///
/// # Errors
///
/// Returns the underlying `rusqlite::Error` on SQL failure.
pub fn fetch_new(conn: &Connection) -> Result<Vec<Observation>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, device_id, temperature_centigrade, actual_time, status, created_at
         FROM observations WHERE status = 'NEW' ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Observation {
            id: row.get(0)?,
            device_id: row.get(1)?,
            temperature_centigrade: row.get(2)?,
            actual_time: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;

    let mut observations = Vec::new();
    for row in rows {
        observations.push(row?);
    }
    Ok(observations)
}
