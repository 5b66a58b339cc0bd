//! Layered dataflow graph.
//!
//! ```text
//! layer 0        layer 1              layer 2
//! [Input] ──┬──► [Adder] ──────┬──► [Subtractor] ──┐
//!           └──► [Multiplier] ─┴──► [Squarer] ─────┴──► [Mixer] ──► [Output]
//! ```
//!
//! # Design
//!
//! - **Arena storage**: nodes live in a `Vec`, edges are `NodeId` lists on both ends.
//! - **Enum dispatch**: `NodeKind` covers the fixed set of data, transform and merge nodes.
//! - **Push propagation**: processing a node immediately processes its outputs, depth-first.
//! - **Reported, not raised**: per-node outcomes land in an [`ExecutionReport`].

pub mod flow;
pub mod id;
pub mod layout;
pub mod merge;
pub mod node;
pub mod report;

pub use flow::{FlowGraph, Layer};
pub use id::{LayerId, NodeId};
pub use layout::{Bounds, GraphLayout, LayoutEdge, NodePosition};
pub use merge::merge_data;
pub use node::{DataNode, MergeNode, NodeKind, NodeSlot, TransformNode};
pub use report::{ExecutionReport, NodeOutcome, NodeVisit};
