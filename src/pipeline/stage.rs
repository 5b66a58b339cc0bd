//! The stage contract.
//!
//! A stage receives the pipeline's bag entries as its named arguments and
//! returns a value. The pipeline accepts that value only if it is a mapping;
//! anything else is a contract violation. Returning `Err` means the stage
//! raised.

use crate::types::Bag;
use serde_json::Value;
use std::fmt;

/// A named transformation step consumed by a [`Pipeline`](super::Pipeline).
pub trait Stage {
    /// Name recorded in traces and error messages.
    fn name(&self) -> &str;

    /// Run the stage against the current bag.
    fn call(&self, bag: &Bag) -> anyhow::Result<Value>;
}

impl fmt::Debug for dyn Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage").field("name", &self.name()).finish()
    }
}

/// A stage backed by a closure.
pub struct FnStage<F> {
    name: String,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&Bag) -> anyhow::Result<Value>,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Stage for FnStage<F>
where
    F: Fn(&Bag) -> anyhow::Result<Value>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, bag: &Bag) -> anyhow::Result<Value> {
        (self.func)(bag)
    }
}

impl<S: Stage + ?Sized> Stage for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn call(&self, bag: &Bag) -> anyhow::Result<Value> {
        (**self).call(bag)
    }
}
