//! Error handling for layerflow
//!
//! This module defines the error taxonomy shared by the pipeline engine and
//! the graph model, plus a Result alias for use throughout the crate.

use crate::graph::{LayerId, NodeId};
use thiserror::Error;

/// Main error type for layerflow operations
#[derive(Error, Debug)]
pub enum FlowError {
    /// A stage could not be built (unknown builtin, script that does not compile)
    #[error("Invalid stage '{name}': {reason}")]
    InvalidStage { name: String, reason: String },

    /// A stage returned something other than a mapping
    #[error("Stage '{stage}' must return a mapping, got {found}")]
    StageContractViolation { stage: String, found: String },

    /// A stage raised while executing
    #[error("Stage '{stage}' failed: {message}")]
    StageExecutionFailure { stage: String, message: String },

    /// A merge node was processed with fewer than two input edges
    #[error("Node '{node}' requires at least two inputs to merge, found {found}")]
    InsufficientInputs { node: String, found: usize },

    /// A merge input had no data to combine
    #[error("Node '{node}' cannot merge: input '{input}' has no data")]
    MissingInputData { node: String, input: String },

    /// Propagation reached a node that is already on the current push path
    #[error("Cycle detected: node '{node}' is already on the push path")]
    CycleDetected { node: String },

    /// A node id that is not part of the graph
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    /// A layer id that is not part of the graph
    #[error("Layer {0} not found")]
    LayerNotFound(LayerId),

    /// Node names must be unique within a graph
    #[error("Node name '{0}' is already in use")]
    DuplicateNode(String),

    /// Edge rejected by the graph
    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    /// Errors related to Rhai script execution
    #[error("Script error: {0}")]
    Script(String),

    /// Errors related to configuration loading
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FlowError>,
    },
}

impl FlowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FlowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        FlowError::Script(err.to_string())
    }

    /// True for the errors a pipeline run absorbs at its boundary.
    pub fn is_stage_failure(&self) -> bool {
        match self {
            FlowError::StageContractViolation { .. } | FlowError::StageExecutionFailure { .. } => {
                true
            }
            FlowError::WithContext { source, .. } => source.is_stage_failure(),
            _ => false,
        }
    }
}

/// Result type alias for layerflow operations
pub type FlowResult<T> = std::result::Result<T, FlowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> FlowResult<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> FlowResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for FlowResult<T> {
    fn context(self, context: impl Into<String>) -> FlowResult<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> FlowResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, Box<rhai::EvalAltResult>> {
    fn context(self, context: impl Into<String>) -> FlowResult<T> {
        self.map_err(|e| FlowError::from_rhai_error(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> FlowResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| FlowError::from_rhai_error(e).with_context(f()))
    }
}
