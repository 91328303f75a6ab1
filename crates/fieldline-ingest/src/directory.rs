//! Device directory: lookup, registration, status transitions, and the
//! validity gate over the `devices` table.
//!
//! Device ids are externally supplied by the establishing message and never
//! change. A given individual name maps to at most one id (UNIQUE column);
//! duplicate inserts propagate as store errors, and idempotence is enforced
//! by callers checking [`find_by_individual_name`] first.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a device. Transitions forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    /// Inserted but not yet confirmed by an establish workflow run.
    #[serde(rename = "REGISTERED")]
    Registered,
    /// Confirmed; observations are accepted while also active.
    #[serde(rename = "ESTABLISHED")]
    Established,
}

impl DeviceStatus {
    /// Returns the canonical string label stored in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::Established => "ESTABLISHED",
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single row from the `devices` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Externally supplied unique id.
    pub id: i64,
    /// Unique business identifier.
    pub individual_name: String,
    /// Lifecycle status label (`REGISTERED` or `ESTABLISHED`).
    pub status: String,
    /// Whether the device may submit observations.
    pub is_active: bool,
    /// ISO 8601 timestamp of row creation.
    pub created_at: String,
    /// ISO 8601 timestamp of the last status change.
    pub updated_at: String,
}

/// Exact-match lookup of a device id by individual name.
///
/// The found/not-found log lines are advisory, not part of the contract.
///
/// # Errors
///
/// Returns the underlying `rusqlite::Error` on SQL failure.
pub fn find_by_individual_name(
    conn: &Connection,
    individual_name: &str,
) -> Result<Option<i64>, rusqlite::Error> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM devices WHERE individual_name = ?1",
            params![individual_name],
            |row| row.get(0),
        )
        .optional()?;

    match found {
        Some(device_id) => {
            tracing::debug!(individual_name, device_id, "device found for individual name");
        }
        None => {
            tracing::debug!(individual_name, "no device registered for individual name");
        }
    }

    Ok(found)
}

/// Inserts a new device row with status `REGISTERED`.
///
/// Returns the same id on success. Duplicate ids or names violate table
/// constraints and propagate as store errors — this function does not
/// pre-check for them.
///
/// # Errors
///
/// Returns the underlying `rusqlite::Error` on SQL failure, including
/// constraint violations.
pub fn insert(conn: &Connection, device_id: i64, individual_name: &str) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO devices (id, individual_name, status) VALUES (?1, ?2, ?3)",
        params![device_id, individual_name, DeviceStatus::Registered.as_str()],
    )?;
    tracing::info!(device_id, individual_name, "registered new device");
    Ok(device_id)
}

/// Transitions a device's status.
///
/// Returns `true` iff exactly the targeted row was updated with no store
/// error. Zero rows matched and store faults both yield `false`: the lenient
/// contract treats them as the same non-fatal, reportable failure, and
/// callers proceed either way.
pub fn update_status(conn: &Connection, device_id: i64, status: DeviceStatus) -> bool {
    let result = conn.execute(
        "UPDATE devices SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![status.as_str(), device_id],
    );

    match result {
        Ok(1) => {
            tracing::info!(device_id, status = status.as_str(), "device status updated");
            true
        }
        Ok(rows) => {
            tracing::warn!(
                device_id,
                status = status.as_str(),
                rows,
                "device status update did not target exactly one row"
            );
            false
        }
        Err(e) => {
            tracing::warn!(
                device_id,
                status = status.as_str(),
                "device status update failed: {e}"
            );
            false
        }
    }
}

/// Checks whether a device may submit observations.
///
/// True iff the id is present AND a row exists with that id, status
/// `ESTABLISHED`, and `is_active` set, AND the id returned by the store
/// equals the queried id (re-checked against a malformed result).
///
/// # Errors
///
/// Returns the underlying `rusqlite::Error` on SQL failure.
pub fn is_valid(conn: &Connection, device_id: Option<i64>) -> Result<bool, rusqlite::Error> {
    let Some(device_id) = device_id else {
        tracing::debug!("device validity check with no id");
        return Ok(false);
    };

    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM devices
             WHERE id = ?1 AND status = 'ESTABLISHED' AND is_active = 1",
            params![device_id],
            |row| row.get(0),
        )
        .optional()?;

    let valid = found == Some(device_id);
    if valid {
        tracing::debug!(device_id, "device is valid for observation");
    } else {
        tracing::debug!(device_id, "device is not valid for observation");
    }
    Ok(valid)
}

/// Fetches a single device row by id.
///
/// # Errors
///
/// Returns the underlying `rusqlite::Error` on SQL failure.
pub fn get(conn: &Connection, device_id: i64) -> Result<Option<Device>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, individual_name, status, is_active, created_at, updated_at
         FROM devices WHERE id = ?1",
        params![device_id],
        map_device,
    )
    .optional()
}

/// Lists all devices, oldest registration first.
///
/// # Errors
///
/// Returns the underlying `rusqlite::Error` on SQL failure.
pub fn list(conn: &Connection) -> Result<Vec<Device>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, individual_name, status, is_active, created_at, updated_at
         FROM devices ORDER BY created_at ASC, id ASC",
    )?;
    let rows = stmt.query_map([], map_device)?;

    let mut devices = Vec::new();
    for row in rows {
        devices.push(row?);
    }
    Ok(devices)
}

fn map_device(row: &rusqlite::Row<'_>) -> Result<Device, rusqlite::Error> {
    Ok(Device {
        id: row.get(0)?,
        individual_name: row.get(1)?,
        status: row.get(2)?,
        is_active: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        fieldline_db::run_migrations(&conn).expect("migrations should succeed");
        conn
    }

    #[test]
    fn insert_then_find_by_name() {
        let conn = test_db();

        let id = insert(&conn, 42, "sensor-7").expect("insert should succeed");
        assert_eq!(id, 42);

        let found = find_by_individual_name(&conn, "sensor-7").expect("lookup should succeed");
        assert_eq!(found, Some(42));

        let missing = find_by_individual_name(&conn, "sensor-8").expect("lookup should succeed");
        assert_eq!(missing, None);
    }

    #[test]
    fn insert_starts_registered_and_active() {
        let conn = test_db();
        insert(&conn, 1, "sensor-1").expect("insert");

        let device = get(&conn, 1).expect("get").expect("device should exist");
        assert_eq!(device.status, "REGISTERED");
        assert!(device.is_active, "devices default to active");
    }

    #[test]
    fn duplicate_name_propagates_constraint_error() {
        let conn = test_db();
        insert(&conn, 1, "sensor-1").expect("first insert");

        let err = insert(&conn, 2, "sensor-1").expect_err("unique name should conflict");
        assert!(matches!(err, rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation));
    }

    #[test]
    fn update_status_true_for_existing_row() {
        let conn = test_db();
        insert(&conn, 1, "sensor-1").expect("insert");

        assert!(update_status(&conn, 1, DeviceStatus::Established));

        let device = get(&conn, 1).expect("get").expect("device");
        assert_eq!(device.status, "ESTABLISHED");
    }

    #[test]
    fn update_status_false_when_no_row_matches() {
        let conn = test_db();
        assert!(!update_status(&conn, 404, DeviceStatus::Established));
    }

    #[test]
    fn is_valid_requires_established_and_active() {
        let conn = test_db();
        insert(&conn, 1, "sensor-1").expect("insert");

        // REGISTERED only: not valid.
        assert!(!is_valid(&conn, Some(1)).expect("check"));

        update_status(&conn, 1, DeviceStatus::Established);
        assert!(is_valid(&conn, Some(1)).expect("check"));

        // Deactivated: not valid even when established.
        conn.execute("UPDATE devices SET is_active = 0 WHERE id = 1", [])
            .expect("deactivate");
        assert!(!is_valid(&conn, Some(1)).expect("check"));
    }

    #[test]
    fn is_valid_false_for_absent_id_or_unknown_device() {
        let conn = test_db();
        assert!(!is_valid(&conn, None).expect("check"));
        assert!(!is_valid(&conn, Some(12345)).expect("check"));
    }

    #[test]
    fn list_orders_by_registration() {
        let conn = test_db();
        insert(&conn, 10, "sensor-a").expect("insert");
        insert(&conn, 5, "sensor-b").expect("insert");

        let devices = list(&conn).expect("list");
        assert_eq!(devices.len(), 2);
        // Same created_at second resolves by id.
        assert_eq!(devices[0].id, 5);
        assert_eq!(devices[1].id, 10);
    }

    #[test]
    fn device_status_labels() {
        assert_eq!(DeviceStatus::Registered.to_string(), "REGISTERED");
        assert_eq!(DeviceStatus::Established.to_string(), "ESTABLISHED");
    }
}
