//! The layered node graph and its push propagation.
//!
//! Nodes live in an arena (`Vec<NodeSlot>`) and refer to each other by
//! [`NodeId`]. Edges are stored on both endpoints as ordered, deduplicated
//! id lists, so neither endpoint owns the other.
//!
//! Processing a layer visits its nodes in order. Each visit runs the node's
//! own step and then pushes a copy of its data to every output, recursing
//! depth-first before the next output is handled.
//!
//! # Cycles
//!
//! Every push keeps the chain of nodes that led to the current visit. A push
//! into a node already on that chain is refused and recorded against the
//! pushing node as [`FlowError::CycleDetected`]; it is not a visit. Reaching the same node again along a
//! different path (a diamond) is a normal visit.

use crate::error::{FlowError, FlowResult};
use crate::graph::id::{LayerId, NodeId};
use crate::graph::node::{DataNode, MergeNode, NodeKind, NodeSlot, Step, TransformNode};
use crate::graph::report::{ExecutionReport, NodeOutcome};
use crate::pipeline::Pipeline;
use crate::types::Bag;
use std::collections::HashMap;

/// An ordered group of nodes forming one propagation wavefront.
#[derive(Debug, Clone)]
pub struct Layer {
    id: LayerId,
    nodes: Vec<NodeId>,
}

impl Layer {
    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Arena-backed dataflow graph organised into layers.
#[derive(Debug, Default)]
pub struct FlowGraph {
    slots: Vec<NodeSlot>,
    layers: Vec<Layer>,
    names: HashMap<String, NodeId>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Graph building ──

    /// Add a node. Names must be unique within the graph.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        kind: impl Into<NodeKind>,
        data: Option<Bag>,
    ) -> FlowResult<NodeId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(FlowError::DuplicateNode(name));
        }

        let id = NodeId(self.slots.len() as u32);
        let kind = kind.into();
        tracing::debug!("Graph: added {} node '{}' as {}", kind.kind_name(), name, id);
        self.names.insert(name.clone(), id);
        self.slots.push(NodeSlot::new(id, name, kind, data));
        Ok(id)
    }

    pub fn add_data_node(&mut self, name: impl Into<String>, data: Option<Bag>) -> FlowResult<NodeId> {
        self.add_node(name, DataNode::new(), data)
    }

    pub fn add_transform_node(
        &mut self,
        name: impl Into<String>,
        pipeline: Option<Pipeline>,
    ) -> FlowResult<NodeId> {
        let node = match pipeline {
            Some(pipeline) => TransformNode::new(pipeline),
            None => TransformNode::unconfigured(),
        };
        self.add_node(name, node, None)
    }

    pub fn add_merge_node(&mut self, name: impl Into<String>) -> FlowResult<NodeId> {
        self.add_node(name, MergeNode, None)
    }

    /// Attach or replace the pipeline of a transform node.
    pub fn set_pipeline(&mut self, id: NodeId, pipeline: Pipeline) -> FlowResult<()> {
        let slot = self.slot_mut(id)?;
        match &mut slot.kind {
            NodeKind::Transform(node) => {
                node.set_pipeline(pipeline);
                Ok(())
            }
            other => Err(FlowError::Config(format!(
                "node '{}' is a {} node and cannot hold a pipeline",
                slot.name,
                other.kind_name()
            ))),
        }
    }

    /// Replace a node's payload.
    pub fn set_data(&mut self, id: NodeId, data: Option<Bag>) -> FlowResult<()> {
        self.slot_mut(id)?.data = data;
        Ok(())
    }

    /// Connect `from → to`, updating both edge lists together.
    ///
    /// Returns `false` if the edge already existed. Self-loops are rejected.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> FlowResult<bool> {
        self.slot(from)?;
        self.slot(to)?;
        if from == to {
            return Err(FlowError::InvalidEdge(format!(
                "node '{}' cannot be connected to itself",
                self.slots[from.index()].name
            )));
        }

        let added_output = push_unique(&mut self.slots[from.index()].outputs, to);
        let added_input = push_unique(&mut self.slots[to.index()].inputs, from);
        debug_assert_eq!(added_output, added_input, "edge lists out of sync");

        if added_output {
            tracing::debug!(
                "Graph: connected '{}' -> '{}'",
                self.slots[from.index()].name,
                self.slots[to.index()].name
            );
        }
        Ok(added_output)
    }

    /// Add a layer. Membership is fixed from here on.
    pub fn add_layer(&mut self, nodes: Vec<NodeId>) -> FlowResult<LayerId> {
        for &id in &nodes {
            self.slot(id)?;
        }
        let id = LayerId(self.layers.len() as u32);
        self.layers.push(Layer { id, nodes });
        Ok(id)
    }

    /// Wire every node of `from` to every node of `to`.
    ///
    /// A node that belongs to both layers is not wired to itself. Returns the
    /// number of edges that were new.
    pub fn connect_layers(&mut self, from: LayerId, to: LayerId) -> FlowResult<usize> {
        let sources = self.layer(from)?.nodes.clone();
        let targets = self.layer(to)?.nodes.clone();

        let mut added = 0;
        for &source in &sources {
            for &target in &targets {
                if source == target {
                    continue;
                }
                if self.connect(source, target)? {
                    added += 1;
                }
            }
        }
        tracing::debug!("Graph: {} -> {} added {} edges", from, to, added);
        Ok(added)
    }

    /// Connect each layer to the one after it.
    pub fn chain_layers(&mut self) -> FlowResult<usize> {
        let mut added = 0;
        for index in 1..self.layers.len() {
            added += self.connect_layers(LayerId(index as u32 - 1), LayerId(index as u32))?;
        }
        Ok(added)
    }

    // ── Processing ──

    /// Process every node of a layer in order.
    ///
    /// A failure in one node is logged and recorded in the report; the
    /// remaining nodes of the layer still run.
    pub fn process_layer(&mut self, layer: LayerId) -> FlowResult<ExecutionReport> {
        let nodes = self.layer(layer)?.nodes.clone();
        let mut report = ExecutionReport::new();

        for id in nodes {
            let mut path = Vec::new();
            if let Err(e) = self.visit(id, &mut path, &mut report) {
                let name = self.slot(id).map(|s| s.name.clone()).unwrap_or_default();
                tracing::error!("Error processing node {}: {}", name, e);
                report.record_failure(id, e);
            }
        }
        Ok(report)
    }

    /// Process the first layer; everything downstream follows by push.
    pub fn run(&mut self) -> FlowResult<ExecutionReport> {
        if self.layers.is_empty() {
            return Err(FlowError::LayerNotFound(LayerId(0)));
        }
        self.process_layer(LayerId(0))
    }

    fn visit(
        &mut self,
        id: NodeId,
        path: &mut Vec<NodeId>,
        report: &mut ExecutionReport,
    ) -> FlowResult<()> {
        let step = self.step(id)?;
        let slot = self.slot(id)?;
        let targets = slot.outputs.clone();
        let data = slot.data.clone();

        let outcome = match step {
            Step::Halt(reason) => {
                report.record(id, NodeOutcome::Halted { reason });
                return Ok(());
            }
            Step::Forward => NodeOutcome::Forwarded {
                targets: targets.clone(),
            },
            Step::ForwardStale(error) => NodeOutcome::ForwardedStale {
                error,
                targets: targets.clone(),
            },
        };
        report.record(id, outcome);

        path.push(id);
        for target in targets {
            if path.contains(&target) {
                self.refuse_cycle(id, target, report)?;
                continue;
            }
            self.slot_mut(target)?.data = data.clone();
            self.visit(target, path, report)?;
        }
        path.pop();
        Ok(())
    }

    fn refuse_cycle(
        &self,
        from: NodeId,
        target: NodeId,
        report: &mut ExecutionReport,
    ) -> FlowResult<()> {
        let name = self.slot(target)?.name.clone();
        tracing::warn!(
            "{} is already on the push path, not re-entering from {}",
            name,
            self.slot(from)?.name
        );
        report.record_cycle(from, FlowError::CycleDetected { node: name });
        Ok(())
    }

    fn step(&mut self, id: NodeId) -> FlowResult<Step> {
        let merge_inputs: Option<Vec<(NodeId, String, Option<Bag>)>> =
            match &self.slot(id)?.kind {
                NodeKind::Merge(_) => Some(
                    self.slots[id.index()]
                        .inputs
                        .iter()
                        .map(|&input| {
                            let s = &self.slots[input.index()];
                            (input, s.name.clone(), s.data.clone())
                        })
                        .collect(),
                ),
                _ => None,
            };

        let slot = self.slot_mut(id)?;
        let step = match &mut slot.kind {
            NodeKind::Data(node) => node.process(&slot.name, slot.data.as_ref()),
            NodeKind::Transform(node) => node.process(&slot.name, &mut slot.data),
            NodeKind::Merge(node) => {
                let inputs = merge_inputs.unwrap_or_default();
                let borrowed: Vec<_> = inputs
                    .iter()
                    .map(|(input, name, data)| (*input, name.as_str(), data.as_ref()))
                    .collect();
                node.process(&slot.name, &borrowed, &mut slot.data)
            }
        };
        Ok(step)
    }

    // ── Queries ──

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> FlowResult<&Layer> {
        self.layers
            .get(id.index())
            .ok_or(FlowError::LayerNotFound(id))
    }

    pub fn node(&self, id: NodeId) -> FlowResult<&NodeSlot> {
        self.slot(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeSlot> {
        self.slots.iter()
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn node_by_name(&self, name: &str) -> FlowResult<&NodeSlot> {
        let id = self
            .find(name)
            .ok_or_else(|| FlowError::Config(format!("unknown node '{}'", name)))?;
        self.slot(id)
    }

    pub fn data(&self, id: NodeId) -> FlowResult<Option<&Bag>> {
        Ok(self.slot(id)?.data.as_ref())
    }

    pub fn history(&self, id: NodeId) -> FlowResult<&[Bag]> {
        Ok(self.slot(id)?.history())
    }

    pub fn inputs(&self, id: NodeId) -> FlowResult<&[NodeId]> {
        Ok(&self.slot(id)?.inputs)
    }

    pub fn outputs(&self, id: NodeId) -> FlowResult<&[NodeId]> {
        Ok(&self.slot(id)?.outputs)
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.slots.iter().map(|s| s.outputs.len()).sum()
    }

    pub fn node_count(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, id: NodeId) -> FlowResult<&NodeSlot> {
        self.slots.get(id.index()).ok_or(FlowError::NodeNotFound(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> FlowResult<&mut NodeSlot> {
        self.slots
            .get_mut(id.index())
            .ok_or(FlowError::NodeNotFound(id))
    }
}

fn push_unique(list: &mut Vec<NodeId>, id: NodeId) -> bool {
    if list.contains(&id) {
        false
    } else {
        list.push(id);
        true
    }
}
