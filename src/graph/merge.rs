//! The fan-in merge rule.
//!
//! Keys are combined over the union of both mappings, first mapping's keys
//! first:
//!
//! | first      | second     | result                      |
//! |------------|------------|-----------------------------|
//! | scalar     | scalar     | `[first, second]`           |
//! | sequence   | scalar     | `first` with `second` appended |
//! | scalar     | sequence   | `[first]` followed by `second` |
//! | sequence   | sequence   | concatenation               |
//! | only one side present   || copied as-is                |
//!
//! Inputs are never aliased; every sequence in the result is a fresh copy.

use crate::types::{is_sequence, Bag};
use serde_json::Value;

/// Merge two payloads with the fan-in rule.
pub fn merge_data(first: &Bag, second: &Bag) -> Bag {
    let mut merged = Bag::with_capacity(first.len() + second.len());

    for (key, value) in first {
        let combined = match second.get(key) {
            Some(incoming) => combine(value.clone(), incoming),
            None => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }
    for (key, value) in second {
        if !first.contains_key(key) {
            merged.insert(key.clone(), value.clone());
        }
    }

    merged
}

fn combine(existing: Value, incoming: &Value) -> Value {
    let mut out = match existing {
        Value::Array(items) => items,
        scalar => vec![scalar],
    };
    if is_sequence(incoming) {
        out.extend(incoming.as_array().into_iter().flatten().cloned());
    } else {
        out.push(incoming.clone());
    }
    Value::Array(out)
}
