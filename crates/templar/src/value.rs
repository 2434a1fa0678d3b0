//! Helpers over `serde_json::Value` as seen from templates.

use serde_json::{Map, Value};

use crate::error::TemplateError;

/// Formats a value for output.
///
/// Strings are written as-is, `null` as nothing, arrays and objects as JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Template truthiness: `null`, `false`, zero and empty strings, arrays and
/// objects are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Equality where `1` and `1.0` compare equal.
pub fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => lhs == rhs,
    }
}

/// `value.name`: object key, or array index when `name` is numeric.
pub fn get_attr(value: &Value, name: &str) -> Value {
    match value {
        Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Null),
        Value::Array(items) => name
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// `value[index]`.
pub fn get_index(value: &Value, index: &Value) -> Value {
    match (value, index) {
        (Value::Object(map), Value::String(key)) => map.get(key).cloned().unwrap_or(Value::Null),
        (Value::Array(items), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| items.get(i as usize))
            .cloned()
            .unwrap_or(Value::Null),
        (_, Value::String(key)) => get_attr(value, key),
        _ => Value::Null,
    }
}

/// Converts render data into a variable scope.
///
/// Objects become the scope directly; `null` (for example from `()`) is an
/// empty scope. Anything else is rejected.
pub fn into_scope(data: Value) -> Result<Map<String, Value>, TemplateError> {
    match data {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(TemplateError::Context(format!(
            "expected a map of variables, got {}",
            kind(&other)
        ))),
    }
}

/// Short type name used in error messages.
pub fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}
