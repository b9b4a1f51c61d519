//! The `schemas` command.

use sync_core::SchemaRegistry;

/// Render every registered topic with its fields, one field per line.
pub fn describe_registry(registry: &SchemaRegistry) -> String {
    let mut out = String::new();
    for topic in registry.topics() {
        out.push_str(topic);
        out.push('\n');
        if let Ok(schema) = registry.get_schema(topic) {
            for field in schema.fields() {
                let nullability = if field.nullable { "" } else { " NOT NULL" };
                out.push_str(&format!(
                    "  {:<18} {}{}\n",
                    field.name, field.field_type, nullability
                ));
            }
        }
    }
    out
}
