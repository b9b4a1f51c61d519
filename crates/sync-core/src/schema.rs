//! Schema definitions for the city-sync framework.
//!
//! ## Type Hierarchy
//!
//! - `FieldDefinition` - Single field metadata (name, type, nullability)
//! - `Schema` - Ordered list of fields with unique names
//! - `TopicDescriptor` - Schema plus the event-time settings of one topic
//!
//! Schemas are built once at startup and never mutated afterwards; they are
//! shared between tasks behind an `Arc`.

use crate::types::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Error Types
// ============================================================================

/// Error type for schema operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// Topic is not statically registered
    #[error("No schema defined for topic: {0}")]
    UnknownTopic(String),

    /// Two fields of one schema share a name
    #[error("Duplicate field '{0}' in schema")]
    DuplicateField(String),

    /// A schema must contain at least one field
    #[error("Schema has no fields")]
    EmptySchema,

    /// Field not found in topic schema
    #[error("Field '{field}' not found in schema of topic '{topic}'")]
    FieldNotFound { topic: String, field: String },

    /// The event-time field must be a timestamp
    #[error("Watermark field '{field}' of topic '{topic}' has type {actual}, expected timestamp")]
    InvalidWatermarkField {
        topic: String,
        field: String,
        actual: FieldType,
    },
}

// ============================================================================
// Fields and Schemas
// ============================================================================

/// Field definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDefinition {
    /// Field name (the JSON key on the wire)
    pub name: String,

    /// Field type
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Whether a missing or null value is accepted
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl FieldDefinition {
    /// Create a new nullable field definition.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }

    /// Create a new field definition that rejects missing and null values.
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
        }
    }
}

/// Ordered sequence of uniquely named, typed fields.
///
/// Deserializes from a plain list of fields and validates uniqueness on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldDefinition>", into = "Vec<FieldDefinition>")]
pub struct Schema {
    pub(crate) fields: Vec<FieldDefinition>,
}

impl Schema {
    /// Create a schema, rejecting duplicate field names.
    pub fn new(fields: Vec<FieldDefinition>) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::EmptySchema);
        }
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        Ok(Self { fields })
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get all field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl TryFrom<Vec<FieldDefinition>> for Schema {
    type Error = SchemaError;

    fn try_from(fields: Vec<FieldDefinition>) -> Result<Self, Self::Error> {
        Schema::new(fields)
    }
}

impl From<Schema> for Vec<FieldDefinition> {
    fn from(schema: Schema) -> Self {
        schema.fields
    }
}

// ============================================================================
// Topic Descriptor
// ============================================================================

/// Identifies one data category and how its event time is tracked.
///
/// Immutable once a pipeline has started.
#[derive(Debug, Clone)]
pub struct TopicDescriptor {
    /// Topic name, also the key into the schema registry
    pub name: String,

    /// Record layout of the topic
    pub schema: Arc<Schema>,

    /// Name of the timestamp field used for event time
    pub watermark_field: String,

    /// How far behind the newest event time a record may arrive
    pub allowed_lateness: Duration,
}

impl TopicDescriptor {
    /// Create a descriptor, checking that the watermark field exists and is a timestamp.
    pub fn new(
        name: impl Into<String>,
        schema: Arc<Schema>,
        watermark_field: impl Into<String>,
        allowed_lateness: Duration,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let watermark_field = watermark_field.into();

        let field = schema
            .get_field(&watermark_field)
            .ok_or_else(|| SchemaError::FieldNotFound {
                topic: name.clone(),
                field: watermark_field.clone(),
            })?;
        if field.field_type != FieldType::Timestamp {
            return Err(SchemaError::InvalidWatermarkField {
                topic: name,
                field: watermark_field,
                actual: field.field_type,
            });
        }

        Ok(Self {
            name,
            schema,
            watermark_field,
            allowed_lateness,
        })
    }
}
