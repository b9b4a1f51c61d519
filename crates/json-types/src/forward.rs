//! Forward conversion: Record → JSON value.
//!
//! Used by the `schemas` and `checkpoint` CLI output and by test producers
//! that need payloads in the same shape the bus carries.

use chrono::SecondsFormat;
use serde_json::json;
use sync_core::{Record, RecordValue};

/// Wrapper for JSON values.
#[derive(Debug, Clone)]
pub struct JsonValue(pub serde_json::Value);

impl JsonValue {
    /// Get the inner JSON value.
    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }

    /// Get a reference to the inner JSON value.
    pub fn as_inner(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<&RecordValue> for JsonValue {
    fn from(value: &RecordValue) -> Self {
        match value {
            RecordValue::Null => JsonValue(serde_json::Value::Null),
            RecordValue::String(s) => JsonValue(json!(s)),
            RecordValue::Integer(i) => JsonValue(json!(*i)),
            // NaN and infinities have no JSON form
            RecordValue::Double(f) => JsonValue(
                serde_json::Number::from_f64(*f)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
            ),
            RecordValue::Timestamp(ts) => {
                JsonValue(json!(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
            }
        }
    }
}

impl From<&Record> for JsonValue {
    fn from(record: &Record) -> Self {
        let object = record
            .fields()
            .iter()
            .map(|(name, value)| (name.clone(), JsonValue::from(value).into_inner()))
            .collect::<serde_json::Map<_, _>>();
        JsonValue(serde_json::Value::Object(object))
    }
}

/// Serialize a record to a JSON object payload.
pub fn encode(record: &Record) -> Vec<u8> {
    JsonValue::from(record).into_inner().to_string().into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reverse::decode;
    use chrono::{TimeZone, Utc};
    use sync_core::{BuiltinTopic, FieldType, SchemaRegistry};

    #[test]
    fn test_timestamp_is_rfc3339_utc() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let json = JsonValue::from(&RecordValue::Timestamp(ts)).into_inner();
        assert_eq!(json, json!("2024-03-01T08:30:00Z"));
    }

    #[test]
    fn test_non_finite_double_becomes_null() {
        let json = JsonValue::from(&RecordValue::Double(f64::NAN)).into_inner();
        assert!(json.is_null());
    }

    #[test]
    fn test_encoded_record_decodes_back() {
        let schema = SchemaRegistry::builtin().get_schema("emergency_data").unwrap();
        let record = Record::new()
            .field("id", RecordValue::String("e-1".into()))
            .field("vehicle_id", RecordValue::String("Vehicle-1".into()))
            .field("incidentId", RecordValue::String("inc-9".into()))
            .field("type", RecordValue::String("Fire".into()))
            .field(
                "timestamp",
                RecordValue::Timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()),
            )
            .field("location", RecordValue::Null)
            .field("status", RecordValue::String("Active".into()))
            .field("description", RecordValue::Null);

        let decoded = decode(&encode(&record), &schema).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_every_builtin_topic_survives_encode_decode() {
        let ts = Utc
            .with_ymd_and_hms(2024, 1, 1, 10, 0, 0)
            .unwrap()
            .checked_add_signed(chrono::Duration::nanoseconds(123_456_789))
            .unwrap();
        let registry = SchemaRegistry::builtin();

        for topic in BuiltinTopic::ALL {
            let schema = registry.get_schema(topic.name()).unwrap();
            let record = schema.fields().iter().enumerate().fold(
                Record::new(),
                |record, (i, field)| {
                    let value = match field.field_type {
                        FieldType::String => RecordValue::String(format!("{}-{i}", field.name)),
                        FieldType::Integer => RecordValue::Integer(-7 + i as i64),
                        FieldType::Double => RecordValue::Double(0.1 + 0.2 * i as f64),
                        FieldType::Timestamp => RecordValue::Timestamp(ts),
                    };
                    record.field(&field.name, value)
                },
            );

            let payload = encode(&record);
            let decoded = decode(&payload, &schema).unwrap();
            assert_eq!(decoded, record, "{}", topic.name());
            assert_eq!(encode(&decoded), payload, "{}", topic.name());
        }
    }
}
