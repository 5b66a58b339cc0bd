//! Node variants.
//!
//! The variant set is closed, so nodes are an enum rather than trait objects.
//! Each variant implements only its own processing step here. Pushing data
//! to neighbours is shared and lives in [`FlowGraph`](super::FlowGraph).

use crate::error::FlowError;
use crate::graph::id::NodeId;
use crate::graph::merge::merge_data;
use crate::pipeline::Pipeline;
use crate::types::{Bag, BagDisplay};

/// Result of a node's own processing step, before propagation.
#[derive(Debug)]
pub(crate) enum Step {
    /// Push current data to every output.
    Forward,
    /// The transform failed; push the unchanged (stale) data anyway.
    ForwardStale(FlowError),
    /// Stop here; outputs are not visited.
    Halt(FlowError),
}

/// Pass-through node that keeps an audit trail of everything it saw.
#[derive(Debug, Clone, Default)]
pub struct DataNode {
    history: Vec<Bag>,
}

impl DataNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots of every payload this node has processed, oldest first.
    pub fn history(&self) -> &[Bag] {
        &self.history
    }

    pub(crate) fn process(&mut self, name: &str, data: Option<&Bag>) -> Step {
        if let Some(data) = data {
            self.history.push(data.clone());
            tracing::info!("{} processing data: {}", name, BagDisplay(data));
        }
        Step::Forward
    }
}

/// Node that runs its data through a [`Pipeline`].
#[derive(Debug, Default)]
pub struct TransformNode {
    pipeline: Option<Pipeline>,
}

impl TransformNode {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Some(pipeline),
        }
    }

    /// A transform without a pipeline behaves as a pass-through.
    pub fn unconfigured() -> Self {
        Self::default()
    }

    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }

    pub fn set_pipeline(&mut self, pipeline: Pipeline) {
        self.pipeline = Some(pipeline);
    }

    pub(crate) fn process(&mut self, name: &str, data: &mut Option<Bag>) -> Step {
        let (Some(current), Some(pipeline)) = (data.as_mut(), self.pipeline.as_mut()) else {
            return Step::Forward;
        };

        pipeline.merge_into_bag(current);
        match pipeline.run() {
            Ok(result) => {
                *current = result;
                tracing::info!("{} processed data: {}", name, BagDisplay(current));
                Step::Forward
            }
            Err(e) => {
                tracing::debug!("{} keeps its previous data after a failed run", name);
                Step::ForwardStale(e)
            }
        }
    }
}

/// Fan-in node combining the data of its first two inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeNode;

impl MergeNode {
    /// `inputs` are the node's input neighbours in insertion order, paired
    /// with their names and current data.
    pub(crate) fn process(
        &self,
        name: &str,
        inputs: &[(NodeId, &str, Option<&Bag>)],
        data: &mut Option<Bag>,
    ) -> Step {
        if inputs.len() < 2 {
            tracing::warn!("{} requires at least two inputs to combine data.", name);
            return Step::Halt(FlowError::InsufficientInputs {
                node: name.to_string(),
                found: inputs.len(),
            });
        }

        let (first, second) = (&inputs[0], &inputs[1]);
        for (_, input_name, input_data) in [first, second] {
            if input_data.is_none() {
                tracing::debug!("{} waits: input {} has no data yet", name, input_name);
                return Step::Halt(FlowError::MissingInputData {
                    node: name.to_string(),
                    input: input_name.to_string(),
                });
            }
        }

        if let (Some(a), Some(b)) = (first.2, second.2) {
            let combined = merge_data(a, b);
            tracing::info!("{} combined data: {}", name, BagDisplay(&combined));
            *data = Some(combined);
        }
        Step::Forward
    }
}

/// The closed set of node behaviours.
#[derive(Debug)]
pub enum NodeKind {
    Data(DataNode),
    Transform(TransformNode),
    Merge(MergeNode),
}

impl NodeKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Data(_) => "data",
            NodeKind::Transform(_) => "transform",
            NodeKind::Merge(_) => "merge",
        }
    }
}

impl From<DataNode> for NodeKind {
    fn from(node: DataNode) -> Self {
        NodeKind::Data(node)
    }
}

impl From<TransformNode> for NodeKind {
    fn from(node: TransformNode) -> Self {
        NodeKind::Transform(node)
    }
}

impl From<MergeNode> for NodeKind {
    fn from(node: MergeNode) -> Self {
        NodeKind::Merge(node)
    }
}

/// Arena slot: one node, its payload, and its edges.
///
/// `inputs` and `outputs` are ordered and deduplicated. Edge symmetry is
/// maintained by [`FlowGraph::connect`](super::FlowGraph::connect), the only
/// writer.
#[derive(Debug)]
pub struct NodeSlot {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) data: Option<Bag>,
    pub(crate) inputs: Vec<NodeId>,
    pub(crate) outputs: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

impl NodeSlot {
    pub(crate) fn new(id: NodeId, name: String, kind: NodeKind, data: Option<Bag>) -> Self {
        Self {
            id,
            name,
            data,
            inputs: Vec::new(),
            outputs: Vec::new(),
            kind,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> Option<&Bag> {
        self.data.as_ref()
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// History of a data node; empty for the other variants.
    pub fn history(&self) -> &[Bag] {
        match &self.kind {
            NodeKind::Data(node) => node.history(),
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FnStage;
    use crate::types::bag_from;
    use serde_json::json;

    #[test]
    fn test_data_node_records_only_present_data() {
        let mut node = DataNode::new();
        assert!(matches!(node.process("d", None), Step::Forward));
        let data = bag_from(json!({"passthrough": 1}));
        node.process("d", Some(&data));
        assert_eq!(node.history(), &[data]);
    }

    #[test]
    fn test_transform_without_pipeline_passes_through() {
        let mut node = TransformNode::unconfigured();
        let mut data = Some(bag_from(json!({"a": 1})));
        assert!(matches!(node.process("t", &mut data), Step::Forward));
        assert_eq!(data, Some(bag_from(json!({"a": 1}))));
    }

    #[test]
    fn test_transform_failure_keeps_stale_data() {
        let pipeline = Pipeline::default()
            .with(FnStage::new("boom", |_: &Bag| Err(anyhow::anyhow!("boom"))));
        let mut node = TransformNode::new(pipeline);
        let mut data = Some(bag_from(json!({"passthrough": 4})));

        let step = node.process("t", &mut data);
        assert!(matches!(step, Step::ForwardStale(FlowError::StageExecutionFailure { .. })));
        assert_eq!(data, Some(bag_from(json!({"passthrough": 4}))));
    }

    #[test]
    fn test_merge_needs_two_inputs() {
        let a = bag_from(json!({"a": 1}));
        let mut data = None;
        let step = MergeNode.process("m", &[(NodeId(0), "a", Some(&a))], &mut data);
        assert!(matches!(step, Step::Halt(FlowError::InsufficientInputs { found: 1, .. })));
        assert!(data.is_none());
    }

    #[test]
    fn test_merge_waits_for_missing_data() {
        let a = bag_from(json!({"a": 1}));
        let mut data = None;
        let step = MergeNode.process(
            "m",
            &[(NodeId(0), "a", Some(&a)), (NodeId(1), "b", None)],
            &mut data,
        );
        assert!(matches!(step, Step::Halt(FlowError::MissingInputData { ref input, .. }) if input == "b"));
    }

    #[test]
    fn test_merge_uses_first_two_inputs() {
        let a = bag_from(json!({"v": 1}));
        let b = bag_from(json!({"v": 2}));
        let c = bag_from(json!({"v": 3}));
        let mut data = None;
        MergeNode.process(
            "m",
            &[
                (NodeId(0), "a", Some(&a)),
                (NodeId(1), "b", Some(&b)),
                (NodeId(2), "c", Some(&c)),
            ],
            &mut data,
        );
        assert_eq!(data, Some(bag_from(json!({"v": [1, 2]}))));
    }
}
