//! Reverse conversion: JSON payload → Record.
//!
//! Decoding is strictly per message. A malformed payload yields a
//! [`DecodeError`] for that message only; callers skip it and move on.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use sync_core::{FieldDefinition, FieldType, Record, RecordValue, Schema};

/// Maximum number of payload bytes kept in [`DecodeError::raw_excerpt`].
pub const RAW_EXCERPT_LEN: usize = 128;

/// Why a payload could not be decoded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeFailure {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("required field '{0}' is missing")]
    MissingField(String),

    #[error("required field '{0}' is null")]
    NullField(String),

    #[error("field '{field}' expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: &'static str,
    },

    #[error("field '{field}' holds an unparseable timestamp: {value}")]
    InvalidTimestamp { field: String, value: String },
}

/// Decode failure for one message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{reason} (payload: {raw_excerpt})")]
pub struct DecodeError {
    /// What went wrong
    pub reason: DecodeFailure,
    /// Leading bytes of the offending payload, lossily converted to UTF-8
    pub raw_excerpt: String,
}

impl DecodeError {
    fn new(reason: DecodeFailure, raw: &[u8]) -> Self {
        let end = raw.len().min(RAW_EXCERPT_LEN);
        Self {
            reason,
            raw_excerpt: String::from_utf8_lossy(&raw[..end]).into_owned(),
        }
    }
}

/// Decode a raw payload against a schema.
///
/// Fields are emitted in schema order. JSON keys that are not part of the
/// schema are ignored; absent or null nullable fields become
/// [`RecordValue::Null`].
pub fn decode(raw: &[u8], schema: &Schema) -> Result<Record, DecodeError> {
    let json: serde_json::Value = serde_json::from_slice(raw)
        .map_err(|e| DecodeError::new(DecodeFailure::InvalidJson(e.to_string()), raw))?;

    let object = json
        .as_object()
        .ok_or_else(|| DecodeError::new(DecodeFailure::NotAnObject, raw))?;

    let mut record = Record::with_capacity(schema.len());
    for field in schema.fields() {
        let value = match object.get(&field.name) {
            None if field.nullable => RecordValue::Null,
            None => {
                return Err(DecodeError::new(
                    DecodeFailure::MissingField(field.name.clone()),
                    raw,
                ))
            }
            Some(json_value) => {
                convert_field(field, json_value).map_err(|reason| DecodeError::new(reason, raw))?
            }
        };
        record.push(field.name.clone(), value);
    }

    Ok(record)
}

fn convert_field(
    field: &FieldDefinition,
    value: &serde_json::Value,
) -> Result<RecordValue, DecodeFailure> {
    use serde_json::Value;

    let mismatch = |found: &'static str| DecodeFailure::TypeMismatch {
        field: field.name.clone(),
        expected: field.field_type,
        found,
    };

    match (field.field_type, value) {
        (_, Value::Null) if field.nullable => Ok(RecordValue::Null),
        (_, Value::Null) => Err(DecodeFailure::NullField(field.name.clone())),

        (FieldType::String, Value::String(s)) => Ok(RecordValue::String(s.clone())),

        (FieldType::Integer, Value::Number(n)) => n
            .as_i64()
            .map(RecordValue::Integer)
            .ok_or_else(|| mismatch("non-integer number")),

        // Integers are valid doubles
        (FieldType::Double, Value::Number(n)) => n
            .as_f64()
            .map(RecordValue::Double)
            .ok_or_else(|| mismatch("number out of range")),

        (FieldType::Timestamp, Value::String(s)) => parse_datetime_string(s)
            .map(RecordValue::Timestamp)
            .ok_or_else(|| DecodeFailure::InvalidTimestamp {
                field: field.name.clone(),
                value: s.clone(),
            }),

        // Epoch milliseconds
        (FieldType::Timestamp, Value::Number(n)) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .map(RecordValue::Timestamp)
            .ok_or_else(|| DecodeFailure::InvalidTimestamp {
                field: field.name.clone(),
                value: n.to_string(),
            }),

        (_, other) => Err(mismatch(json_kind(other))),
    }
}

/// Parse a datetime string in various formats.
///
/// Supports:
/// - RFC 3339: "2024-01-01T12:00:00Z", "2024-01-01T12:00:00.5+02:00"
/// - ISO 8601 without offset (read as UTC): "2024-01-01T12:00:00.123456"
/// - Space separated (read as UTC): "2024-01-01 12:00:00", "2024-01-01 12:00:00.123456"
fn parse_datetime_string(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
