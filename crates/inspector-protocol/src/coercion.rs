//! Schema-driven argument coercion (spec §4.4 "Invocation methods").
//!
//! Generalizes the source's string-comparison dispatch into a match over
//! [`SchemaType`], per SPEC_FULL's "Schema-driven coercion → tagged
//! variant" redesign note.

use inspector_core::{InputSchema, SchemaType};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Coerce a map of raw string arguments (as a UI form would produce) into
/// JSON values typed per `schema`. Unknown argument names pass through as
/// strings; known ones follow the per-type rules below.
pub fn coerce_arguments(schema: &InputSchema, raw: &HashMap<String, String>) -> Value {
    let mut out = Map::new();
    for (name, raw_value) in raw {
        let value = match schema.properties.get(name) {
            Some(prop) => coerce_one(prop.schema_type, raw_value, prop.default.as_ref()),
            None => Value::String(raw_value.clone()),
        };
        out.insert(name.clone(), value);
    }
    Value::Object(out)
}

/// Coerce a single raw string value per the declared schema type.
pub fn coerce_one(schema_type: SchemaType, raw_value: &str, default: Option<&Value>) -> Value {
    if raw_value.is_empty() {
        return default.cloned().unwrap_or(Value::Null);
    }

    match schema_type {
        SchemaType::String => Value::String(raw_value.to_string()),
        SchemaType::Integer => match raw_value.parse::<i64>() {
            Ok(n) => Value::Number(n.into()),
            Err(_) => {
                tracing::warn!(raw_value, "could not parse integer argument, passing through");
                Value::String(raw_value.to_string())
            }
        },
        SchemaType::Number => match raw_value.parse::<f64>() {
            Ok(n) => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw_value.to_string())),
            Err(_) => {
                tracing::warn!(raw_value, "could not parse number argument, passing through");
                Value::String(raw_value.to_string())
            }
        },
        SchemaType::Boolean => match raw_value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Value::Bool(true),
            "false" | "0" | "no" => Value::Bool(false),
            _ => {
                tracing::warn!(raw_value, "ambiguous boolean argument, passing through");
                Value::String(raw_value.to_string())
            }
        },
        SchemaType::Array => match serde_json::from_str::<Value>(raw_value) {
            Ok(v @ Value::Array(_)) => v,
            _ => Value::Array(
                raw_value
                    .split(',')
                    .map(|s| Value::String(s.trim().to_string()))
                    .collect(),
            ),
        },
        SchemaType::Object => {
            serde_json::from_str::<Value>(raw_value).unwrap_or_else(|_| Value::String(raw_value.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspector_core::SchemaProperty;
    use std::collections::HashMap as Map2;

    fn schema_with(name: &str, schema_type: SchemaType) -> InputSchema {
        let mut properties = Map2::new();
        properties.insert(
            name.to_string(),
            SchemaProperty {
                schema_type,
                description: None,
                r#enum: None,
                default: None,
            },
        );
        InputSchema {
            properties,
            required: vec![],
        }
    }

    #[test]
    fn integer_parses_truncating_decimal_input_by_failing_and_passing_through() {
        // "3.7" is not a valid base-10 integer literal: the spec pins the
        // warning-plus-pass-through branch for this case (spec §8).
        let schema = schema_with("count", SchemaType::Integer);
        let mut raw = HashMap::new();
        raw.insert("count".to_string(), "3.7".to_string());
        let result = coerce_arguments(&schema, &raw);
        assert_eq!(result["count"], Value::String("3.7".to_string()));
    }

    #[test]
    fn integer_parses_clean_value() {
        let schema = schema_with("count", SchemaType::Integer);
        let mut raw = HashMap::new();
        raw.insert("count".to_string(), "42".to_string());
        let result = coerce_arguments(&schema, &raw);
        assert_eq!(result["count"], Value::Number(42.into()));
    }

    #[test]
    fn boolean_accepts_yes_no_variants_case_insensitively() {
        assert_eq!(coerce_one(SchemaType::Boolean, "YES", None), Value::Bool(true));
        assert_eq!(coerce_one(SchemaType::Boolean, "No", None), Value::Bool(false));
        assert_eq!(coerce_one(SchemaType::Boolean, "1", None), Value::Bool(true));
        assert_eq!(coerce_one(SchemaType::Boolean, "0", None), Value::Bool(false));
    }

    #[test]
    fn coercion_example_from_spec_scenario_5() {
        let mut properties = Map2::new();
        properties.insert(
            "count".to_string(),
            SchemaProperty {
                schema_type: SchemaType::Integer,
                description: None,
                r#enum: None,
                default: None,
            },
        );
        properties.insert(
            "enabled".to_string(),
            SchemaProperty {
                schema_type: SchemaType::Boolean,
                description: None,
                r#enum: None,
                default: None,
            },
        );
        let schema = InputSchema {
            properties,
            required: vec![],
        };
        let mut raw = HashMap::new();
        raw.insert("count".to_string(), "42".to_string());
        raw.insert("enabled".to_string(), "yes".to_string());
        let result = coerce_arguments(&schema, &raw);
        assert_eq!(result["count"], Value::Number(42.into()));
        assert_eq!(result["enabled"], Value::Bool(true));
    }

    #[test]
    fn array_falls_back_to_comma_split_on_invalid_json() {
        let value = coerce_one(SchemaType::Array, "a, b,c", None);
        assert_eq!(
            value,
            Value::Array(vec![
                Value::String("a".to_string()),
                Value::String("b".to_string()),
                Value::String("c".to_string())
            ])
        );
    }

    #[test]
    fn array_parses_valid_json_array() {
        let value = coerce_one(SchemaType::Array, "[1,2,3]", None);
        assert_eq!(
            value,
            Value::Array(vec![1.into(), 2.into(), 3.into()])
        );
    }

    #[test]
    fn empty_string_falls_back_to_schema_default() {
        let default = Value::String("fallback".to_string());
        let value = coerce_one(SchemaType::String, "", Some(&default));
        assert_eq!(value, default);
    }

    #[test]
    fn empty_string_without_default_becomes_null() {
        let value = coerce_one(SchemaType::String, "", None);
        assert_eq!(value, Value::Null);
    }
}
