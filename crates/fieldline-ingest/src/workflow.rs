//! Workflow orchestrators for the two inbound message kinds.
//!
//! Each invocation is synchronous and self-contained: resolve the ref,
//! decode the envelope, drive the directory/allocator/recorder modules, and
//! report a typed outcome. The `handle_*` shims preserve the legacy host
//! contract: every invocation returns status code `0`, with rejections and
//! faults visible only in the logs.

use rusqlite::Connection;

use crate::directory::{self, DeviceStatus};
use crate::envelope::{
    self, FIELD_ACTUAL_TIME, FIELD_DEVICE_ID, FIELD_INDIVIDUAL_NAME, FIELD_TEMPERATURE,
};
use crate::error::{DecodeError, IngestError};
use crate::{recorder, source};

/// Result of a single establish-device invocation.
#[derive(Debug)]
pub enum EstablishOutcome {
    /// First sighting of the individual name: row inserted and transitioned
    /// to `ESTABLISHED`.
    Registered {
        /// The device id from the message.
        device_id: i64,
    },
    /// The name was already registered under the same id; status
    /// re-transitioned to `ESTABLISHED`.
    Reconfirmed {
        /// The device id on record.
        device_id: i64,
    },
    /// The supplied id disagrees with the id on record for the name. No
    /// mutation performed.
    IdentityConflict {
        /// The id carried by the message.
        supplied: i64,
        /// The id already registered for the name.
        registered: i64,
    },
    /// The envelope could not be resolved or decoded. No mutation performed.
    Malformed(DecodeError),
}

impl EstablishOutcome {
    /// Short label for logs and API responses.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Registered { .. } => "registered",
            Self::Reconfirmed { .. } => "reconfirmed",
            Self::IdentityConflict { .. } => "identity_conflict",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// Result of a single observe-temperature invocation.
#[derive(Debug)]
pub enum ObserveOutcome {
    /// Observation row created.
    Recorded {
        /// The device the reading was recorded for.
        device_id: i64,
    },
    /// The device is unknown, not yet established, inactive, or the message
    /// carried no usable id at all. No row created.
    InvalidDevice {
        /// The device id carried by the message, when one was present.
        device_id: Option<i64>,
    },
    /// The allocator found no counter row; the insert was skipped entirely.
    AllocationFailed {
        /// The device the reading was meant for.
        device_id: i64,
    },
    /// The envelope could not be resolved or decoded. No row created.
    Malformed(DecodeError),
}

impl ObserveOutcome {
    /// Short label for logs and API responses.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Recorded { .. } => "recorded",
            Self::InvalidDevice { .. } => "invalid_device",
            Self::AllocationFailed { .. } => "allocation_failed",
            Self::Malformed(_) => "malformed",
        }
    }
}

fn resolve_envelope(
    conn: &Connection,
    message_ref: i64,
) -> Result<Result<envelope::Envelope, DecodeError>, IngestError> {
    let Some(raw) = source::fetch_message(conn, message_ref)? else {
        return Ok(Err(DecodeError::UnknownRef(message_ref)));
    };
    Ok(envelope::decode(&raw))
}

/// Runs the establish-device workflow for the message behind `message_ref`.
///
/// Registration is idempotent: a repeat message for a known
/// `(deviceId, individualName)` pair re-confirms the device rather than
/// inserting a second row, and a message whose id disagrees with the id on
/// record is rejected without mutation. Lookup and mutation share one
/// savepoint so concurrent establishment of the same identity cannot observe
/// a partial state.
///
/// # Errors
///
/// Returns [`IngestError::Database`] on store faults, including duplicate-id
/// constraint violations on insert.
pub fn establish_device(
    conn: &mut Connection,
    message_ref: i64,
) -> Result<EstablishOutcome, IngestError> {
    let env = match resolve_envelope(conn, message_ref)? {
        Ok(env) => env,
        Err(e) => {
            tracing::warn!(message_ref, "establish rejected: {e}");
            return Ok(EstablishOutcome::Malformed(e));
        }
    };

    let (individual_name, device_id) = match (
        env.require_str(FIELD_INDIVIDUAL_NAME),
        env.require_i64(FIELD_DEVICE_ID),
    ) {
        (Ok(name), Ok(id)) => (name.to_string(), id),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(message_ref, "establish rejected: {e}");
            return Ok(EstablishOutcome::Malformed(e));
        }
    };

    let sp = conn.savepoint()?;

    let outcome = match directory::find_by_individual_name(&sp, &individual_name)? {
        Some(registered) if registered != device_id => {
            tracing::warn!(
                message_ref,
                individual_name,
                supplied = device_id,
                registered,
                "device id does not match the registered name"
            );
            EstablishOutcome::IdentityConflict {
                supplied: device_id,
                registered,
            }
        }
        Some(registered) => {
            // A false update is logged inside update_status and tolerated;
            // the device stays in whatever state the store left it.
            directory::update_status(&sp, registered, DeviceStatus::Established);
            EstablishOutcome::Reconfirmed {
                device_id: registered,
            }
        }
        None => {
            let inserted = directory::insert(&sp, device_id, &individual_name)?;
            directory::update_status(&sp, inserted, DeviceStatus::Established);
            EstablishOutcome::Registered {
                device_id: inserted,
            }
        }
    };

    sp.commit()?;

    Ok(outcome)
}

/// Runs the observe-temperature workflow for the message behind
/// `message_ref`.
///
/// The device validity gate runs before the reading fields are required,
/// so a message from an invalid device is rejected as such even when its
/// payload is also incomplete.
///
/// # Errors
///
/// Returns [`IngestError::Database`] on store faults.
pub fn observe_temperature(
    conn: &mut Connection,
    message_ref: i64,
) -> Result<ObserveOutcome, IngestError> {
    let env = match resolve_envelope(conn, message_ref)? {
        Ok(env) => env,
        Err(e) => {
            tracing::warn!(message_ref, "observation rejected: {e}");
            return Ok(ObserveOutcome::Malformed(e));
        }
    };

    // An absent or mistyped id is not a malformed-message rejection here:
    // it goes through the validity gate like any other id and fails as an
    // invalid device.
    let device_id = env.require_i64(FIELD_DEVICE_ID).ok();

    if !directory::is_valid(conn, device_id)? {
        tracing::warn!(message_ref, ?device_id, "device is not valid to observe");
        return Ok(ObserveOutcome::InvalidDevice { device_id });
    }
    let Some(device_id) = device_id else {
        // is_valid never passes an absent id.
        return Ok(ObserveOutcome::InvalidDevice { device_id: None });
    };

    let reading = env.require_str(FIELD_TEMPERATURE).map(str::to_string);
    let actual_time = env
        .require_str(FIELD_ACTUAL_TIME)
        .map(str::to_string)
        .and_then(|t| envelope::parse_actual_time(&t).map(|_| t));

    let (temperature, actual_time) = match (reading, actual_time) {
        (Ok(temperature), Ok(actual_time)) => (temperature, actual_time),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(message_ref, device_id, "observation rejected: {e}");
            return Ok(ObserveOutcome::Malformed(e));
        }
    };

    match recorder::record(conn, device_id, &temperature, &actual_time)? {
        Some(device_id) => Ok(ObserveOutcome::Recorded { device_id }),
        None => {
            tracing::warn!(message_ref, device_id, "observation id allocation failed");
            Ok(ObserveOutcome::AllocationFailed { device_id })
        }
    }
}

/// Host-facing entry point for device establishment.
///
/// Always returns `0`: rejections and store faults are logged, never
/// surfaced. Hosts wanting distinguishable outcomes call
/// [`establish_device`] directly.
pub fn handle_establish_device(conn: &mut Connection, message_ref: i64) -> i32 {
    match establish_device(conn, message_ref) {
        Ok(outcome) => {
            tracing::info!(message_ref, outcome = outcome.label(), "establish completed");
        }
        Err(e) => {
            tracing::error!(message_ref, "establish workflow failed: {e}");
        }
    }
    0
}

/// Host-facing entry point for observation ingestion.
///
/// Always returns `0`, mirroring [`handle_establish_device`].
pub fn handle_observe_temperature(conn: &mut Connection, message_ref: i64) -> i32 {
    match observe_temperature(conn, message_ref) {
        Ok(outcome) => {
            tracing::info!(
                message_ref,
                outcome = outcome.label(),
                "observation completed"
            );
        }
        Err(e) => {
            tracing::error!(message_ref, "observation workflow failed: {e}");
        }
    }
    0
}
