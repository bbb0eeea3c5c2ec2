//! Argument validation against a tool's declared JSON parameter contract.
//!
//! Supports the subset of JSON Schema the built-in tools declare: an
//! `object` with `properties`, `required`, `additionalProperties: false`,
//! primitive `type`s, string `enum`s and typed `array` items.

use serde_json::{Map, Value};

/// Check `args` against `schema`. Returns a human-readable reason on mismatch.
pub fn validate_args(schema: &Value, args: &Value) -> Result<(), String> {
    let obj = args
        .as_object()
        .ok_or_else(|| format!("arguments must be a JSON object, got {}", type_name(args)))?;

    let empty = Map::new();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            match obj.get(key) {
                None | Some(Value::Null) => {
                    return Err(format!("missing required argument '{}'", key))
                }
                Some(_) => {}
            }
        }
    }

    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));
    for (key, value) in obj {
        match properties.get(key) {
            Some(prop) => check_property(key, prop, value)?,
            None if closed => return Err(format!("unexpected argument '{}'", key)),
            None => {}
        }
    }
    Ok(())
}

fn check_property(key: &str, prop: &Value, value: &Value) -> Result<(), String> {
    if value.is_null() {
        // Optional arguments may be sent as explicit nulls.
        return Ok(());
    }
    if let Some(expected) = prop.get("type").and_then(Value::as_str) {
        if !matches_type(expected, value) {
            return Err(format!(
                "argument '{}' must be of type {}, got {}",
                key,
                expected,
                type_name(value)
            ));
        }
    }
    if let Some(allowed) = prop.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            let options = allowed
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(format!("argument '{}' must be one of [{}]", key, options));
        }
    }
    if let (Some(items), Some(elements)) = (prop.get("items"), value.as_array()) {
        if let Some(item_type) = items.get("type").and_then(Value::as_str) {
            if let Some(bad) = elements.iter().find(|e| !matches_type(item_type, e)) {
                return Err(format!(
                    "every element of '{}' must be of type {}, got {}",
                    key,
                    item_type,
                    type_name(bad)
                ));
            }
        }
    }
    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "limit": { "type": "integer" },
                "mode": { "type": "string", "enum": ["sequential", "parallel"] },
                "targets": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["path"],
            "additionalProperties": false
        })
    }

    #[test]
    fn test_accepts_well_formed_args() {
        let args = json!({"path": "a.txt", "limit": 3, "mode": "parallel", "targets": ["A", "B"]});
        assert!(validate_args(&schema(), &args).is_ok());
    }

    #[test]
    fn test_rejects_missing_required() {
        let err = validate_args(&schema(), &json!({"limit": 1})).unwrap_err();
        assert!(err.contains("missing required argument 'path'"));
    }

    #[test]
    fn test_rejects_wrong_types_and_unknown_keys() {
        assert!(validate_args(&schema(), &json!({"path": 7})).is_err());
        assert!(validate_args(&schema(), &json!({"path": "a", "limit": 1.5})).is_err());
        assert!(validate_args(&schema(), &json!({"path": "a", "extra": true})).is_err());
        assert!(validate_args(&schema(), &json!({"path": "a", "targets": ["A", 2]})).is_err());
        assert!(validate_args(&schema(), &json!("a.txt")).is_err());
    }

    #[test]
    fn test_rejects_value_outside_enum() {
        let err = validate_args(&schema(), &json!({"path": "a", "mode": "broadcast"})).unwrap_err();
        assert!(err.contains("must be one of"));
    }

    #[test]
    fn test_optional_null_is_allowed() {
        assert!(validate_args(&schema(), &json!({"path": "a", "limit": null})).is_ok());
    }
}
