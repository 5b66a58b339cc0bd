//! Core data types for layerflow
//!
//! Node payloads and pipeline bags are both [`Bag`]s: insertion-ordered
//! string-keyed maps of JSON values. The merge rule only distinguishes
//! sequences (`Value::Array`) from everything else, which it treats as
//! scalars.

use serde_json::{Map, Value};
use std::fmt;

/// Key/value mapping threaded through stages and pushed between nodes.
pub type Bag = Map<String, Value>;

/// Build a [`Bag`] from a `serde_json::json!` object literal.
///
/// Any non-object value yields an empty bag.
pub fn bag_from(value: Value) -> Bag {
    match value {
        Value::Object(map) => map,
        _ => Bag::new(),
    }
}

/// Whether a value counts as a sequence for merging.
#[inline]
pub fn is_sequence(value: &Value) -> bool {
    value.is_array()
}

/// Short type label used in error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Renders a bag as compact JSON in log lines.
pub struct BagDisplay<'a>(pub &'a Bag);

impl fmt::Display for BagDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self.0).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}
