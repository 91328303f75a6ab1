//! Typed decoding of inbound envelope messages.
//!
//! An envelope is a JSON object with two required object-valued keys,
//! `header` and `payload`. The header is advisory metadata; the workflows
//! only require its presence. Payload fields are pulled through the
//! `require_*` accessors, which turn an absent or mistyped key into a
//! [`DecodeError`] instead of a silent `None`.

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Payload field carrying the device id on both workflows.
pub const FIELD_DEVICE_ID: &str = "deviceId";
/// Payload field carrying the unique business identifier of a device.
pub const FIELD_INDIVIDUAL_NAME: &str = "individualName";
/// Payload field carrying the string-encoded temperature reading.
pub const FIELD_TEMPERATURE: &str = "temperatureCentigrade";
/// Payload field carrying the observation timestamp.
pub const FIELD_ACTUAL_TIME: &str = "actualTime";

/// A decoded envelope: header and payload objects.
#[derive(Debug, Clone)]
pub struct Envelope {
    header: Map<String, Value>,
    payload: Map<String, Value>,
}

/// Decodes a raw message into an [`Envelope`].
///
/// # Errors
///
/// Returns [`DecodeError::Json`] if the raw text is not valid JSON, and
/// [`DecodeError::MissingField`] if `header` or `payload` is absent or not a
/// JSON object.
pub fn decode(raw: &str) -> Result<Envelope, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;

    let Value::Object(mut root) = value else {
        return Err(DecodeError::MissingField("header"));
    };

    let header = match root.remove("header") {
        Some(Value::Object(map)) => map,
        _ => return Err(DecodeError::MissingField("header")),
    };
    let payload = match root.remove("payload") {
        Some(Value::Object(map)) => map,
        _ => return Err(DecodeError::MissingField("payload")),
    };

    Ok(Envelope { header, payload })
}

impl Envelope {
    /// Returns a required integer payload field.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MissingField`] if the key is absent or not an
    /// integer.
    pub fn require_i64(&self, field: &'static str) -> Result<i64, DecodeError> {
        self.payload
            .get(field)
            .and_then(Value::as_i64)
            .ok_or(DecodeError::MissingField(field))
    }

    /// Returns a required string payload field.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MissingField`] if the key is absent or not a
    /// string.
    pub fn require_str(&self, field: &'static str) -> Result<&str, DecodeError> {
        self.payload
            .get(field)
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingField(field))
    }

    /// Returns an optional string header field. Header contents are advisory
    /// (used for log context only).
    pub fn header_str(&self, field: &str) -> Option<&str> {
        self.header.get(field).and_then(Value::as_str)
    }
}

/// Validates an observation timestamp.
///
/// The stored value is the string as received; validation only guards
/// against timestamps the downstream consumers could not order.
///
/// # Errors
///
/// Returns [`DecodeError::MalformedField`] if the value is not RFC 3339.
pub fn parse_actual_time(value: &str) -> Result<DateTime<FixedOffset>, DecodeError> {
    DateTime::parse_from_rfc3339(value).map_err(|e| DecodeError::MalformedField {
        field: FIELD_ACTUAL_TIME,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_valid_envelope() {
        let env = decode(r#"{"header": {"eventType": "establish"}, "payload": {"deviceId": 42, "individualName": "sensor-7"}}"#)
            .expect("should decode");

        assert_eq!(env.require_i64(FIELD_DEVICE_ID).unwrap(), 42);
        assert_eq!(env.require_str(FIELD_INDIVIDUAL_NAME).unwrap(), "sensor-7");
        assert_eq!(env.header_str("eventType"), Some("establish"));
    }

    #[test]
    fn decode_rejects_invalid_json() {
        assert!(matches!(decode("not json"), Err(DecodeError::Json(_))));
    }

    #[test]
    fn decode_rejects_missing_header() {
        let err = decode(r#"{"payload": {}}"#).expect_err("header is required");
        assert!(matches!(err, DecodeError::MissingField("header")));
    }

    #[test]
    fn decode_rejects_missing_payload() {
        let err = decode(r#"{"header": {}}"#).expect_err("payload is required");
        assert!(matches!(err, DecodeError::MissingField("payload")));
    }

    #[test]
    fn decode_rejects_non_object_header() {
        let err = decode(r#"{"header": "h", "payload": {}}"#).expect_err("header must be an object");
        assert!(matches!(err, DecodeError::MissingField("header")));
    }

    #[test]
    fn require_i64_rejects_wrong_type() {
        let env = decode(r#"{"header": {}, "payload": {"deviceId": "42"}}"#).expect("decode");
        let err = env
            .require_i64(FIELD_DEVICE_ID)
            .expect_err("string is not an integer");
        assert!(matches!(err, DecodeError::MissingField(FIELD_DEVICE_ID)));
    }

    #[test]
    fn require_str_rejects_absent_field() {
        let env = decode(r#"{"header": {}, "payload": {}}"#).expect("decode");
        assert!(env.require_str(FIELD_ACTUAL_TIME).is_err());
    }

    #[test]
    fn actual_time_accepts_rfc3339() {
        assert!(parse_actual_time("2024-05-01T12:30:00Z").is_ok());
        assert!(parse_actual_time("2024-05-01T12:30:00+02:00").is_ok());
    }

    #[test]
    fn actual_time_rejects_garbage() {
        let err = parse_actual_time("yesterday").expect_err("not a timestamp");
        assert!(matches!(
            err,
            DecodeError::MalformedField {
                field: FIELD_ACTUAL_TIME,
                ..
            }
        ));
    }
}
