//! Pipeline executor: runs stages in order over a shared bag.
//!
//! Each run:
//! 1. Call every stage in append order with the current bag.
//! 2. Reject any result that is not a mapping.
//! 3. Merge the mapping into the bag (later keys overwrite).
//! 4. Record a trace entry when tracing is enabled.
//!
//! The first failure aborts the run. Mutations from stages that already ran
//! stay in the bag.

use crate::error::{FlowError, FlowResult};
use crate::pipeline::stage::{FnStage, Stage};
use crate::scripting::{ScriptEngine, ScriptStage};
use crate::types::{value_kind, Bag};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Name of the snapshot recorded when tracing is switched on.
pub const TRACE_INPUT: &str = "input";

/// One positional entry of a pipeline trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub stage: String,
    pub output: Bag,
}

/// An ordered list of stages plus the mutable bag they share.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    bag: Bag,
    trace: Option<Vec<TraceEntry>>,
}

impl Pipeline {
    /// Create a pipeline whose bag starts as `bag`.
    pub fn new(bag: Bag) -> Self {
        Self {
            stages: Vec::new(),
            bag,
            trace: None,
        }
    }

    /// Enable tracing. The first trace entry is a snapshot of the bag as it is now.
    pub fn traced(mut self) -> Self {
        self.trace = Some(vec![TraceEntry {
            stage: TRACE_INPUT.to_string(),
            output: self.bag.clone(),
        }]);
        self
    }

    /// Append a stage (fluent).
    pub fn with(mut self, stage: impl Stage + 'static) -> Self {
        self.push(stage);
        self
    }

    /// Append a closure stage (fluent).
    pub fn with_fn<F>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Bag) -> anyhow::Result<Value> + 'static,
    {
        self.with(FnStage::new(name, func))
    }

    /// Compile `source` and append it as a script stage.
    ///
    /// Fails with [`FlowError::InvalidStage`] if the script does not compile.
    pub fn with_script(
        self,
        engine: &Arc<ScriptEngine>,
        name: impl Into<String>,
        source: &str,
    ) -> FlowResult<Self> {
        let stage = ScriptStage::compile(engine, name, source)?;
        Ok(self.with(stage))
    }

    /// Append a stage in place.
    pub fn push(&mut self, stage: impl Stage + 'static) {
        tracing::debug!("Pipeline: appended stage '{}'", stage.name());
        self.stages.push(Box::new(stage));
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Current bag contents.
    pub fn bag(&self) -> &Bag {
        &self.bag
    }

    /// Merge `data` into the bag, overwriting existing keys.
    pub fn merge_into_bag(&mut self, data: &Bag) {
        for (key, value) in data {
            self.bag.insert(key.clone(), value.clone());
        }
    }

    /// Replace the bag wholesale.
    pub fn replace_bag(&mut self, bag: Bag) {
        self.bag = bag;
    }

    /// Recorded trace, if tracing is enabled.
    pub fn trace(&self) -> Option<&[TraceEntry]> {
        self.trace.as_deref()
    }

    /// Execute every stage in order.
    ///
    /// Returns a copy of the bag on success. On the first stage that raises
    /// or returns a non-mapping the failure is logged and returned; stages
    /// after it do not run.
    pub fn run(&mut self) -> FlowResult<Bag> {
        for stage in &self.stages {
            let name = stage.name();
            let output = match stage.call(&self.bag) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    let err = FlowError::StageContractViolation {
                        stage: name.to_string(),
                        found: value_kind(&other).to_string(),
                    };
                    tracing::error!("Error in pipeline execution at stage {}: {}", name, err);
                    return Err(err);
                }
                Err(e) => {
                    let err = FlowError::StageExecutionFailure {
                        stage: name.to_string(),
                        message: format!("{:#}", e),
                    };
                    tracing::error!("Error in pipeline execution at stage {}: {}", name, err);
                    return Err(err);
                }
            };

            if let Some(trace) = self.trace.as_mut() {
                trace.push(TraceEntry {
                    stage: name.to_string(),
                    output: output.clone(),
                });
            }
            for (key, value) in output {
                self.bag.insert(key, value);
            }
            tracing::debug!("Pipeline: stage '{}' applied", name);
        }

        Ok(self.bag.clone())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("bag", &self.bag)
            .field("traced", &self.trace.is_some())
            .finish()
    }
}
