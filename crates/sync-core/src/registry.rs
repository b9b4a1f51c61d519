//! Static topic name → schema registry.
//!
//! The set of topics is closed: the five event categories published by the
//! smart-city simulator are enumerated in [`BuiltinTopic`]. Configuration may
//! replace a built-in schema while the registry is being built at startup;
//! once built, the registry is read-only and shared freely between tasks.

use crate::schema::{FieldDefinition, Schema, SchemaError};
use crate::types::FieldType;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The event categories known at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinTopic {
    VehicleData,
    GpsData,
    TrafficData,
    WeatherData,
    EmergencyData,
}

impl BuiltinTopic {
    pub const ALL: [BuiltinTopic; 5] = [
        BuiltinTopic::VehicleData,
        BuiltinTopic::GpsData,
        BuiltinTopic::TrafficData,
        BuiltinTopic::WeatherData,
        BuiltinTopic::EmergencyData,
    ];

    /// Topic name on the bus.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinTopic::VehicleData => "vehicle_data",
            BuiltinTopic::GpsData => "gps_data",
            BuiltinTopic::TrafficData => "traffic_data",
            BuiltinTopic::WeatherData => "weather_data",
            BuiltinTopic::EmergencyData => "emergency_data",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Schema of this topic.
    ///
    /// `id` and `timestamp` are required on every topic; all other fields may be absent.
    pub fn schema(&self) -> Schema {
        use FieldType::{Double, Integer, String, Timestamp};

        let fields = match self {
            BuiltinTopic::VehicleData => vec![
                FieldDefinition::required("id", String),
                FieldDefinition::new("vehicle_id", String),
                FieldDefinition::required("timestamp", Timestamp),
                FieldDefinition::new("location", String),
                FieldDefinition::new("speed", Double),
                FieldDefinition::new("direction", String),
                FieldDefinition::new("make", String),
                FieldDefinition::new("model", String),
                FieldDefinition::new("year", Integer),
                FieldDefinition::new("fuelType", String),
            ],
            BuiltinTopic::GpsData => vec![
                FieldDefinition::required("id", String),
                FieldDefinition::new("vehicle_id", String),
                FieldDefinition::required("timestamp", Timestamp),
                FieldDefinition::new("speed", Double),
                FieldDefinition::new("direction", String),
                FieldDefinition::new("vehicleType", String),
            ],
            BuiltinTopic::TrafficData => vec![
                FieldDefinition::required("id", String),
                FieldDefinition::new("vehicle_id", String),
                FieldDefinition::new("camera_id", String),
                FieldDefinition::new("location", String),
                FieldDefinition::required("timestamp", Timestamp),
                FieldDefinition::new("snapshot", String),
            ],
            BuiltinTopic::WeatherData => vec![
                FieldDefinition::required("id", String),
                FieldDefinition::new("vehicle_id", String),
                FieldDefinition::new("location", String),
                FieldDefinition::required("timestamp", Timestamp),
                FieldDefinition::new("temperature", Double),
                FieldDefinition::new("weatherCondition", String),
                FieldDefinition::new("precipitation", Double),
                FieldDefinition::new("windSpeed", Double),
                FieldDefinition::new("humidity", Integer),
                FieldDefinition::new("airQualityIndex", Double),
            ],
            BuiltinTopic::EmergencyData => vec![
                FieldDefinition::required("id", String),
                FieldDefinition::new("vehicle_id", String),
                FieldDefinition::new("incidentId", String),
                FieldDefinition::new("type", String),
                FieldDefinition::required("timestamp", Timestamp),
                FieldDefinition::new("location", String),
                FieldDefinition::new("status", String),
                FieldDefinition::new("description", String),
            ],
        };

        Schema { fields }
    }
}

/// Read-only mapping from topic name to schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    /// Registry holding the five built-in topics.
    pub fn builtin() -> Self {
        let schemas = BuiltinTopic::ALL
            .iter()
            .map(|t| (t.name().to_string(), Arc::new(t.schema())))
            .collect();
        Self { schemas }
    }

    /// Replace the schema of a built-in topic.
    ///
    /// Consumes the registry so overrides can only happen while it is being built.
    pub fn with_override(mut self, topic: &str, schema: Schema) -> Result<Self, SchemaError> {
        if BuiltinTopic::from_name(topic).is_none() {
            return Err(SchemaError::UnknownTopic(topic.to_string()));
        }
        self.schemas.insert(topic.to_string(), Arc::new(schema));
        Ok(self)
    }

    /// Look up the schema of a topic.
    pub fn get_schema(&self, topic: &str) -> Result<Arc<Schema>, SchemaError> {
        self.schemas
            .get(topic)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownTopic(topic.to_string()))
    }

    /// Registered topic names, sorted.
    pub fn topics(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_has_all_topics() {
        let registry = SchemaRegistry::builtin();
        assert_eq!(
            registry.topics(),
            vec![
                "emergency_data",
                "gps_data",
                "traffic_data",
                "vehicle_data",
                "weather_data"
            ]
        );
    }

    #[test]
    fn test_builtin_schemas_are_valid() {
        for topic in BuiltinTopic::ALL {
            let schema = topic.schema();
            assert!(Schema::new(schema.fields().to_vec()).is_ok(), "{topic:?}");
            let ts = schema.get_field("timestamp").unwrap();
            assert_eq!(ts.field_type, FieldType::Timestamp);
            assert!(!ts.nullable);
        }
    }

    #[test]
    fn test_weather_schema_matches_wire_names() {
        let schema = SchemaRegistry::builtin().get_schema("weather_data").unwrap();
        assert_eq!(
            schema.field_names(),
            vec![
                "id",
                "vehicle_id",
                "location",
                "timestamp",
                "temperature",
                "weatherCondition",
                "precipitation",
                "windSpeed",
                "humidity",
                "airQualityIndex"
            ]
        );
        assert_eq!(
            schema.get_field("humidity").unwrap().field_type,
            FieldType::Integer
        );
    }

    #[test]
    fn test_unknown_topic() {
        let registry = SchemaRegistry::builtin();
        assert_eq!(
            registry.get_schema("parking_data").unwrap_err(),
            SchemaError::UnknownTopic("parking_data".to_string())
        );
    }

    #[test]
    fn test_override_only_known_topics() {
        let schema = Schema::new(vec![FieldDefinition::required(
            "timestamp",
            FieldType::Timestamp,
        )])
        .unwrap();

        let registry = SchemaRegistry::builtin()
            .with_override("gps_data", schema.clone())
            .unwrap();
        assert_eq!(registry.get_schema("gps_data").unwrap().len(), 1);

        let err = SchemaRegistry::builtin()
            .with_override("parking_data", schema)
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownTopic(_)));
    }
}
