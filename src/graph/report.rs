//! Execution reports.
//!
//! Nothing that goes wrong inside a propagation escapes it as an error.
//! Instead every visit is recorded here, in depth-first order, so callers
//! can tell a clean push from a stale one or a halted branch.

use crate::error::FlowError;
use crate::graph::id::NodeId;

/// What happened when a node was visited.
#[derive(Debug)]
pub enum NodeOutcome {
    /// Processed and pushed to `targets`.
    Forwarded { targets: Vec<NodeId> },
    /// The pipeline failed; previous data was pushed to `targets`.
    ForwardedStale {
        error: FlowError,
        targets: Vec<NodeId>,
    },
    /// Propagation stopped at this node.
    Halted { reason: FlowError },
}

/// A single visit in the depth-first log.
#[derive(Debug)]
pub struct NodeVisit {
    pub node: NodeId,
    pub outcome: NodeOutcome,
}

/// Depth-first visit log of one layer run.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    visits: Vec<NodeVisit>,
    failures: Vec<(NodeId, FlowError)>,
    cycles: Vec<(NodeId, FlowError)>,
}

impl ExecutionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, node: NodeId, outcome: NodeOutcome) {
        self.visits.push(NodeVisit { node, outcome });
    }

    pub(crate) fn record_cycle(&mut self, from: NodeId, error: FlowError) {
        self.cycles.push((from, error));
    }

    pub(crate) fn record_failure(&mut self, node: NodeId, error: FlowError) {
        self.failures.push((node, error));
    }

    /// Visits in the order they happened.
    pub fn visits(&self) -> &[NodeVisit] {
        &self.visits
    }

    /// Visits of a single node.
    pub fn visits_of(&self, node: NodeId) -> impl Iterator<Item = &NodeVisit> {
        self.visits.iter().filter(move |v| v.node == node)
    }

    /// Order in which nodes were entered.
    pub fn visit_order(&self) -> Vec<NodeId> {
        self.visits.iter().map(|v| v.node).collect()
    }

    /// Visits whose branch stopped, with the reason.
    pub fn halted(&self) -> impl Iterator<Item = (NodeId, &FlowError)> {
        self.visits.iter().filter_map(|v| match &v.outcome {
            NodeOutcome::Halted { reason } => Some((v.node, reason)),
            _ => None,
        })
    }

    /// Visits that forwarded stale data after a pipeline failure.
    pub fn stale(&self) -> impl Iterator<Item = (NodeId, &FlowError)> {
        self.visits.iter().filter_map(|v| match &v.outcome {
            NodeOutcome::ForwardedStale { error, .. } => Some((v.node, error)),
            _ => None,
        })
    }

    /// Errors caught at the layer boundary, one per failed entry node.
    pub fn failures(&self) -> &[(NodeId, FlowError)] {
        &self.failures
    }

    /// Pushes refused because the target was already on the push path,
    /// keyed by the pushing node.
    pub fn cycles(&self) -> &[(NodeId, FlowError)] {
        &self.cycles
    }

    /// True when every visit forwarded fresh data, no push closed a cycle
    /// and no entry node failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
            && self.cycles.is_empty()
            && self
                .visits
                .iter()
                .all(|v| matches!(v.outcome, NodeOutcome::Forwarded { .. }))
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}
