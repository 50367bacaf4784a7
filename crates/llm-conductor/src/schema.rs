//! Keyword-subset schema validation.
//!
//! [`validate`] checks a decoded JSON value against a schema node and
//! returns every violation it finds as a human-readable string. An empty
//! list means the value is valid. It is a pure function: no I/O, no
//! allocation beyond the returned messages.
//!
//! Supported keywords:
//!
//! | Keyword | Applies to | Check |
//! |---------|-----------|-------|
//! | `type` | any | `string`, `integer`, `number`, `boolean`, `array`, `object`, `null`, or an array of these |
//! | `enum` | any | exact membership |
//! | `minLength` / `maxLength` | strings | length in code points |
//! | `minimum` / `maximum` | numbers | inclusive bounds |
//! | `required` | objects | named fields present |
//! | `properties` | objects | recurse per field, path `.<field>` |
//! | `items` | arrays | recurse per element, path `[<index>]` |
//!
//! A `type` mismatch short-circuits the node: no other keyword is checked
//! and nothing below it is visited. Unrecognized `type` names always
//! match. All other keywords (`$schema`, `format`, `description`, ...)
//! are ignored.
//!
//! ```rust
//! use llm_conductor::schema::validate;
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "required": ["score"],
//!     "properties": { "score": { "type": "integer", "maximum": 10 } }
//! });
//!
//! let violations = validate(&json!({"score": 15}), &schema, "$");
//! assert_eq!(violations, vec!["$.score: value 15 is greater than maximum 10"]);
//! ```

use serde_json::{Map, Value};

/// The path prefix used for the root of a validated value.
pub const ROOT_PATH: &str = "$";

/// Validates `value` against `schema`, reporting violations relative to
/// `path`.
///
/// A schema node that is not a JSON object places no constraints.
pub fn validate(value: &Value, schema: &Value, path: &str) -> Vec<String> {
    let mut violations = Vec::new();
    if let Value::Object(node) = schema {
        check_node(value, node, path, &mut violations);
    }
    violations
}

fn check_node(value: &Value, node: &Map<String, Value>, path: &str, out: &mut Vec<String>) {
    if let Some(expected) = node.get("type") {
        if !matches_type(value, expected) {
            out.push(format!(
                "{path}: expected type {}, got {}",
                describe_type(expected),
                type_name(value)
            ));
            return;
        }
    }

    if let Some(Value::Array(allowed)) = node.get("enum") {
        if !allowed.contains(value) {
            out.push(format!(
                "{path}: value {value} is not one of {}",
                Value::Array(allowed.clone())
            ));
        }
    }

    match value {
        Value::String(s) => check_string(s, node, path, out),
        Value::Number(n) => {
            if let Some(n) = n.as_f64() {
                check_number(n, value, node, path, out);
            }
        }
        Value::Object(fields) if is_object_shaped(node, value) => {
            check_object(fields, node, path, out);
        }
        Value::Array(items) => {
            if let Some(item_schema @ Value::Object(_)) = node.get("items") {
                for (index, item) in items.iter().enumerate() {
                    out.extend(validate(item, item_schema, &format!("{path}[{index}]")));
                }
            }
        }
        _ => {}
    }
}

fn check_string(s: &str, node: &Map<String, Value>, path: &str, out: &mut Vec<String>) {
    let length = s.chars().count();
    if let Some(min) = node.get("minLength").and_then(Value::as_u64) {
        if (length as u64) < min {
            out.push(format!(
                "{path}: string length {length} is less than minLength {min}"
            ));
        }
    }
    if let Some(max) = node.get("maxLength").and_then(Value::as_u64) {
        if (length as u64) > max {
            out.push(format!(
                "{path}: string length {length} is greater than maxLength {max}"
            ));
        }
    }
}

fn check_number(
    n: f64,
    value: &Value,
    node: &Map<String, Value>,
    path: &str,
    out: &mut Vec<String>,
) {
    if let Some(min) = node.get("minimum").filter(|m| m.is_number()) {
        if min.as_f64().is_some_and(|min| n < min) {
            out.push(format!("{path}: value {value} is less than minimum {min}"));
        }
    }
    if let Some(max) = node.get("maximum").filter(|m| m.is_number()) {
        if max.as_f64().is_some_and(|max| n > max) {
            out.push(format!("{path}: value {value} is greater than maximum {max}"));
        }
    }
}

fn check_object(
    fields: &Map<String, Value>,
    node: &Map<String, Value>,
    path: &str,
    out: &mut Vec<String>,
) {
    if let Some(Value::Array(required)) = node.get("required") {
        for name in required.iter().filter_map(Value::as_str) {
            if !fields.contains_key(name) {
                out.push(format!("{path}: missing required field '{name}'"));
            }
        }
    }

    if let Some(Value::Object(properties)) = node.get("properties") {
        for (name, child) in properties {
            if let Some(field) = fields.get(name) {
                out.extend(validate(field, child, &format!("{path}.{name}")));
            }
        }
    }
}

/// A value is object-shaped when its schema says so (`type: object`, or
/// declares `properties` / `required`) or when it is an empty mapping.
fn is_object_shaped(node: &Map<String, Value>, value: &Value) -> bool {
    node.get("type").and_then(Value::as_str) == Some("object")
        || node.contains_key("properties")
        || node.contains_key("required")
        || value.as_object().is_some_and(Map::is_empty)
}

fn matches_type(value: &Value, expected: &Value) -> bool {
    match expected {
        Value::String(name) => matches_type_name(value, name),
        Value::Array(names) => {
            let names: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
            names.is_empty() || names.iter().any(|name| matches_type_name(value, name))
        }
        _ => true,
    }
}

fn matches_type_name(value: &Value, name: &str) -> bool {
    match name {
        "string" => value.is_string(),
        "integer" => is_integer(value),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
        }
        _ => false,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) if is_integer(value) => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn describe_type(expected: &Value) -> String {
    match expected {
        Value::String(name) => name.clone(),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" | "),
        other => other.to_string(),
    }
}
