//! Structural checks of tool arguments against a declared input schema.
//!
//! Only the top level is checked: object shape, required fields and primitive
//! types. Value constraints (`enum`, ranges, formats) and nested schemas are
//! left to the tool, which reports them as an in-band failure.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeViolation {
    #[error("arguments must be a JSON object")]
    NotAnObject,

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' must be of type {expected}")]
    WrongType { field: String, expected: String },
}

/// Validate `arguments` against `schema`. A missing or null argument value is
/// treated as an empty object.
pub fn check_arguments(schema: &Value, arguments: &Value) -> Result<(), ShapeViolation> {
    let empty = Map::new();
    let args = match arguments {
        Value::Null => &empty,
        Value::Object(map) => map,
        _ => return Err(ShapeViolation::NotAnObject),
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(field) {
                return Err(ShapeViolation::MissingField(field.to_string()));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (field, value) in args {
        let Some(property) = properties.get(field) else {
            continue;
        };

        if let Some(expected) = property.get("type").and_then(Value::as_str)
            && !has_type(value, expected)
        {
            return Err(ShapeViolation::WrongType {
                field: field.clone(),
                expected: expected.to_string(),
            });
        }
    }

    Ok(())
}

fn has_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        // Unknown type keywords are not checked.
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn calculate_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "operation": {"type": "string", "enum": ["add", "subtract", "multiply", "divide"]},
                "a": {"type": "number"},
                "b": {"type": "number"},
                "days": {"type": "integer"}
            },
            "required": ["operation", "a", "b"]
        })
    }

    #[test]
    fn test_valid_arguments() {
        let args = json!({"operation": "divide", "a": 5, "b": 0.5});
        assert_eq!(check_arguments(&calculate_schema(), &args), Ok(()));
    }

    #[test]
    fn test_missing_required_field() {
        let args = json!({"operation": "add", "a": 1});
        assert_eq!(
            check_arguments(&calculate_schema(), &args),
            Err(ShapeViolation::MissingField("b".into()))
        );
    }

    #[test]
    fn test_wrong_type() {
        let args = json!({"operation": "add", "a": "1", "b": 2});
        assert!(matches!(
            check_arguments(&calculate_schema(), &args),
            Err(ShapeViolation::WrongType { field, .. }) if field == "a"
        ));
    }

    #[test]
    fn test_integer_accepts_whole_floats_only() {
        let schema = calculate_schema();
        let base = json!({"operation": "add", "a": 1, "b": 2, "days": 3.0});
        assert!(check_arguments(&schema, &base).is_ok());

        let fractional = json!({"operation": "add", "a": 1, "b": 2, "days": 3.5});
        assert!(check_arguments(&schema, &fractional).is_err());
    }

    #[test]
    fn test_enum_membership_is_not_checked() {
        let args = json!({"operation": "modulo", "a": 1, "b": 2});
        assert_eq!(check_arguments(&calculate_schema(), &args), Ok(()));

        let args = json!({"operation": 7, "a": 1, "b": 2});
        assert!(check_arguments(&calculate_schema(), &args).is_err());
    }

    #[test]
    fn test_null_arguments_is_empty_object() {
        let schema = json!({"type": "object", "properties": {"path": {"type": "string"}}});
        assert!(check_arguments(&schema, &Value::Null).is_ok());
        assert_eq!(
            check_arguments(&schema, &json!([1])),
            Err(ShapeViolation::NotAnObject)
        );
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let args = json!({"operation": "add", "a": 1, "b": 2, "extra": true});
        assert!(check_arguments(&calculate_schema(), &args).is_ok());
    }
}
