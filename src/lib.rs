//! # layerflow: layered dataflow graphs
//!
//! A small engine for pushing key/value data through a graph of processing
//! nodes arranged in layers.
//!
//! ## Architecture
//!
//! - **Pipeline**: ordered stages sharing a mutable bag, fail-fast, optionally traced
//! - **Graph**: arena of data, transform and merge nodes with symmetric edges
//! - **Scripting**: Rhai-based stages for transformations defined in config
//! - **Config**: TOML graph definitions
//!
//! ## Example
//!
//! ```
//! use layerflow::{builtin_stage, bag_from, FlowGraph, Pipeline};
//! use serde_json::json;
//!
//! # fn main() -> layerflow::FlowResult<()> {
//! let mut graph = FlowGraph::new();
//! let input = graph.add_data_node("Input", Some(bag_from(json!({"passthrough": 10}))))?;
//!
//! let mut adder = Pipeline::default();
//! adder.push(builtin_stage("add", bag_from(json!({"value": 5})))?);
//! let adder = graph.add_transform_node("Adder", Some(adder))?;
//! let output = graph.add_data_node("Output", None)?;
//!
//! for nodes in [vec![input], vec![adder], vec![output]] {
//!     graph.add_layer(nodes)?;
//! }
//! graph.chain_layers()?;
//!
//! let report = graph.run()?;
//! assert!(report.is_clean());
//! assert_eq!(graph.history(output)?[0]["passthrough"], json!(15));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod scripting;
pub mod types;

// Re-export commonly used types
pub use config::GraphDefinition;
pub use error::{FlowError, FlowResult};
pub use graph::{
    ExecutionReport, FlowGraph, GraphLayout, LayerId, NodeId, NodeKind, NodeOutcome,
};
pub use pipeline::{builtin_stage, FnStage, Pipeline, Stage, TraceEntry};
pub use scripting::{ScriptEngine, ScriptStage};
pub use types::{bag_from, Bag};
