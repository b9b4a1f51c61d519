//! Field types supported by topic schemas.
//!
//! The type universe is deliberately small: every event category on the bus
//! is a flat JSON object made of strings, integers, doubles and timestamps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of a single schema field.
///
/// # YAML / TOML Format
///
/// Types are written as lowercase strings:
/// ```toml
/// type = "string"
/// type = "integer"
/// type = "double"
/// type = "timestamp"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 text
    String,

    /// 64-bit signed integer
    Integer,

    /// 64-bit IEEE 754 floating point
    Double,

    /// Instant in UTC (microsecond precision once persisted)
    Timestamp,
}

impl FieldType {
    /// Get the string representation of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Double => "double",
            FieldType::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "text" => Ok(FieldType::String),
            "integer" | "int" => Ok(FieldType::Integer),
            "double" | "float" => Ok(FieldType::Double),
            "timestamp" => Ok(FieldType::Timestamp),
            other => Err(format!("Unknown field type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_from_str() {
        assert_eq!("string".parse::<FieldType>().unwrap(), FieldType::String);
        assert_eq!("INT".parse::<FieldType>().unwrap(), FieldType::Integer);
        assert_eq!("double".parse::<FieldType>().unwrap(), FieldType::Double);
        assert_eq!(
            "timestamp".parse::<FieldType>().unwrap(),
            FieldType::Timestamp
        );
        assert!("geometry".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_field_type_serde() {
        let json = serde_json::to_string(&FieldType::Timestamp).unwrap();
        assert_eq!(json, "\"timestamp\"");
        let parsed: FieldType = serde_json::from_str("\"double\"").unwrap();
        assert_eq!(parsed, FieldType::Double);
    }
}
