//! Decoded record values.
//!
//! A [`Record`] is the typed form of one bus message. It only lives inside a
//! pipeline between decode and flush; what gets persisted is the sink's
//! serialized form of it.

use crate::types::FieldType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordValue {
    Null,
    String(String),
    Integer(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
}

impl RecordValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value may be stored in a field of the given type.
    ///
    /// `Null` fits every type; nullability is checked against the schema separately.
    pub fn fits(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (RecordValue::Null, _)
                | (RecordValue::String(_), FieldType::String)
                | (RecordValue::Integer(_), FieldType::Integer)
                | (RecordValue::Double(_), FieldType::Double)
                | (RecordValue::Timestamp(_), FieldType::Timestamp)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// A decoded, schema-ordered record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, RecordValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Append a field. Callers push fields in schema order.
    pub fn push(&mut self, name: impl Into<String>, value: RecordValue) {
        self.fields.push((name.into(), value));
    }

    /// Builder-style variant of [`Record::push`].
    pub fn field(mut self, name: impl Into<String>, value: RecordValue) -> Self {
        self.push(name, value);
        self
    }

    /// Get a value by field name.
    pub fn get(&self, name: &str) -> Option<&RecordValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Event time carried in the given timestamp field, if present and non-null.
    pub fn event_time(&self, field: &str) -> Option<DateTime<Utc>> {
        self.get(field).and_then(RecordValue::as_timestamp)
    }

    /// Fields in schema order.
    pub fn fields(&self) -> &[(String, RecordValue)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
