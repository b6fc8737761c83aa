//! JSON Schema construction for tool parameters.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// JSON Schema-based parameter definition for a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    /// JSON Schema object describing the parameters.
    pub schema: Value,
}

impl ToolParameters {
    /// Builder: create an object schema with properties.
    pub fn object() -> ParameterBuilder {
        ParameterBuilder {
            properties: Map::new(),
            required: Vec::new(),
        }
    }
}

/// Builder for constructing tool parameter schemas.
pub struct ParameterBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    fn property(mut self, name: &str, schema: Value, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add a string property.
    pub fn string(self, name: &str, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "string", "description": description }),
            required,
        )
    }

    /// Add an integer property.
    pub fn integer(self, name: &str, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "integer", "description": description }),
            required,
        )
    }

    /// Add a boolean property.
    pub fn boolean(self, name: &str, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "boolean", "description": description }),
            required,
        )
    }

    /// Add an enum (string) property.
    pub fn string_enum(self, name: &str, description: &str, values: &[&str], required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "string", "description": description, "enum": values }),
            required,
        )
    }

    /// Add a list-of-strings property.
    pub fn string_array(self, name: &str, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({
                "type": "array",
                "description": description,
                "items": { "type": "string" },
            }),
            required,
        )
    }

    /// Build into [`ToolParameters`].
    pub fn build(self) -> ToolParameters {
        ToolParameters {
            schema: json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_tracks_required_fields() {
        let params = ToolParameters::object()
            .string("path", "File path", true)
            .integer("start_line", "First line", false)
            .boolean("recursive", "Recurse", false)
            .build();

        assert_eq!(params.schema["type"], "object");
        assert_eq!(params.schema["properties"]["start_line"]["type"], "integer");
        assert_eq!(params.schema["required"], json!(["path"]));
    }

    #[test]
    fn string_array_declares_item_type() {
        let params = ToolParameters::object()
            .string_array("questions", "Questions", true)
            .build();

        assert_eq!(params.schema["properties"]["questions"]["items"]["type"], "string");
    }

    #[test]
    fn string_enum_lists_values() {
        let params = ToolParameters::object()
            .string_enum("status", "Outcome", &["completed", "failed"], false)
            .build();

        let values = params.schema["properties"]["status"]["enum"]
            .as_array()
            .expect("enum array");
        assert_eq!(values.len(), 2);
    }
}
