//! Validate sealed tool-call arguments against a tool's JSON Schema.

use serde_json::Value;

/// Validate tool arguments against a JSON Schema.
///
/// Checks the top-level type, required field presence, property types,
/// string enums, and the item type of array properties. Returns `Err(message)`
/// describing the first violation found.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), String> {
    if let Some(schema_type) = schema.get("type").and_then(Value::as_str) {
        if schema_type == "object" && !args.is_object() {
            return Err(format!(
                "expected object arguments, got {}",
                json_type_name(args)
            ));
        }
    }

    let Some(obj) = args.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(name) {
                return Err(format!("missing required field '{name}'"));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (key, value) in obj {
        if let Some(prop_schema) = properties.get(key) {
            check_property(key, value, prop_schema)?;
        }
    }

    Ok(())
}

fn check_property(key: &str, value: &Value, prop_schema: &Value) -> Result<(), String> {
    if let Some(expected) = prop_schema.get("type").and_then(Value::as_str) {
        if !value_matches_type(value, expected) {
            return Err(format!(
                "field '{}' expected type '{}', got {}",
                key,
                expected,
                json_type_name(value)
            ));
        }
    }

    if let (Some(allowed), Some(actual)) = (
        prop_schema.get("enum").and_then(Value::as_array),
        value.as_str(),
    ) {
        if !allowed.iter().any(|v| v.as_str() == Some(actual)) {
            return Err(format!("field '{key}' has unsupported value '{actual}'"));
        }
    }

    if let (Some(items), Some(elements)) = (prop_schema.get("items"), value.as_array()) {
        if let Some(expected) = items.get("type").and_then(Value::as_str) {
            if let Some((idx, bad)) = elements
                .iter()
                .enumerate()
                .find(|(_, el)| !value_matches_type(el, expected))
            {
                return Err(format!(
                    "field '{}[{}]' expected type '{}', got {}",
                    key,
                    idx,
                    expected,
                    json_type_name(bad)
                ));
            }
        }
    }

    Ok(())
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reasoning_like_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "current_situation": { "type": "string" },
                "remaining_steps": { "type": "array", "items": { "type": "string" } },
                "task_completed": { "type": "boolean" },
                "status": { "type": "string", "enum": ["completed", "failed"] },
            },
            "required": ["current_situation", "task_completed"],
        })
    }

    #[test]
    fn rejects_non_object_args_when_schema_expects_object() {
        let result = validate_arguments(&json!("not an object"), &reasoning_like_schema());

        assert!(result.unwrap_err().contains("expected object"));
    }

    #[test]
    fn rejects_missing_required_field() {
        let args = json!({ "current_situation": "reading files" });

        let result = validate_arguments(&args, &reasoning_like_schema());

        assert!(result
            .unwrap_err()
            .contains("missing required field 'task_completed'"));
    }

    #[test]
    fn accepts_valid_args() {
        let args = json!({
            "current_situation": "done",
            "task_completed": true,
            "remaining_steps": ["report"],
        });

        assert!(validate_arguments(&args, &reasoning_like_schema()).is_ok());
    }

    #[test]
    fn rejects_field_with_wrong_type() {
        let args = json!({ "current_situation": "x", "task_completed": "yes" });

        let err = validate_arguments(&args, &reasoning_like_schema()).unwrap_err();

        assert!(err.contains("field 'task_completed'"));
        assert!(err.contains("expected type 'boolean'"));
    }

    #[test]
    fn rejects_array_item_with_wrong_type() {
        let args = json!({
            "current_situation": "x",
            "task_completed": false,
            "remaining_steps": ["ok", 3],
        });

        let err = validate_arguments(&args, &reasoning_like_schema()).unwrap_err();

        assert!(err.contains("remaining_steps[1]"));
    }

    #[test]
    fn rejects_value_outside_enum() {
        let args = json!({
            "current_situation": "x",
            "task_completed": true,
            "status": "maybe",
        });

        let err = validate_arguments(&args, &reasoning_like_schema()).unwrap_err();

        assert!(err.contains("unsupported value 'maybe'"));
    }

    #[test]
    fn accepts_extra_fields_not_in_schema_properties() {
        let args = json!({ "current_situation": "x", "task_completed": true, "extra": 1 });

        assert!(validate_arguments(&args, &reasoning_like_schema()).is_ok());
    }

    #[test]
    fn accepts_anything_when_schema_is_empty() {
        assert!(validate_arguments(&json!({ "anything": 42 }), &json!({})).is_ok());
        assert!(validate_arguments(&Value::Null, &json!({})).is_ok());
    }
}
