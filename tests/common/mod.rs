//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use layerflow::{bag_from, Bag};
use serde_json::Value;

/// Shorthand for a bag holding only `passthrough`
pub fn passthrough(value: impl Into<Value>) -> Bag {
    bag_from(serde_json::json!({ "passthrough": value.into() }))
}

/// Assert a history matches the given JSON objects in order
pub fn assert_history(actual: &[Bag], expected: &[Value]) {
    let actual: Vec<Value> = actual.iter().cloned().map(Value::Object).collect();
    assert_eq!(
        actual, expected,
        "history mismatch: got {:?}, expected {:?}",
        actual, expected
    );
}
