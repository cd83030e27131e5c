// assay-core/src/domain/identity/json.rs
//
// JSON helpers shared by every serializable batch type.

use serde_json::{Map, Value};

/// Human readable name of a JSON value's type, used in type error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns a copy of `value` whose objects have their keys sorted, recursively.
///
/// Maps preserve insertion order in this crate, so serializing the result
/// yields a canonical text independent of how the input was built.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Strips null values, then nested objects and arrays left empty, in place.
///
/// Empty strings, `false` and `0` are real values and are kept.
pub fn deep_filter_properties(properties: &mut Map<String, Value>) {
    properties.retain(|_, value| {
        filter_value(value);
        !is_vacant(value)
    });
}

fn filter_value(value: &mut Value) {
    match value {
        Value::Object(map) => deep_filter_properties(map),
        Value::Array(items) => {
            for item in items.iter_mut() {
                filter_value(item);
            }
            items.retain(|item| !is_vacant(item));
        }
        _ => {}
    }
}

fn is_vacant(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Filters an optional mapping and collapses it to `None` when nothing is left.
pub fn filtered_or_none(map: Option<Map<String, Value>>) -> Option<Map<String, Value>> {
    map.map(|mut m| {
        deep_filter_properties(&mut m);
        m
    })
    .filter(|m| !m.is_empty())
}
