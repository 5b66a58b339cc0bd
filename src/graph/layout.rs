//! Node positions and edges for an external renderer.
//!
//! Each layer is a column at `x = layer index`; nodes in a layer are spaced
//! one unit apart and centred on `y = 0`. No drawing happens here.

use crate::graph::flow::FlowGraph;
use crate::graph::id::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub id: NodeId,
    pub name: String,
    pub kind: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub from: NodeId,
    pub to: NodeId,
}

/// Axis ranges a renderer should use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLayout {
    pub nodes: Vec<NodePosition>,
    pub edges: Vec<LayoutEdge>,
    pub bounds: Bounds,
}

impl GraphLayout {
    /// Compute positions for every node that belongs to a layer.
    ///
    /// A node listed in several layers takes the position of the last one.
    /// Edges are kept only when both endpoints are positioned.
    pub fn compute(graph: &FlowGraph) -> Self {
        let mut positions: HashMap<NodeId, (f64, f64)> = HashMap::new();
        let mut order: Vec<NodeId> = Vec::new();

        for (layer_index, layer) in graph.layers().iter().enumerate() {
            let count = layer.len();
            if count == 0 {
                continue;
            }
            let x = layer_index as f64;
            let y_start = -((count - 1) as f64) / 2.0;
            for (i, &id) in layer.nodes().iter().enumerate() {
                if positions.insert(id, (x, y_start + i as f64)).is_none() {
                    order.push(id);
                }
            }
        }

        let nodes: Vec<NodePosition> = order
            .iter()
            .filter_map(|&id| {
                let slot = graph.node(id).ok()?;
                let (x, y) = positions[&id];
                Some(NodePosition {
                    id,
                    name: slot.name().to_string(),
                    kind: slot.kind().kind_name().to_string(),
                    x,
                    y,
                })
            })
            .collect();

        let mut edges = Vec::new();
        for &id in &order {
            let Ok(slot) = graph.node(id) else { continue };
            for &to in slot.outputs() {
                if positions.contains_key(&to) {
                    edges.push(LayoutEdge { from: id, to });
                }
            }
        }

        let (y_min, y_max) = nodes.iter().fold((0.0f64, 0.0f64), |(lo, hi), n| {
            (lo.min(n.y), hi.max(n.y))
        });
        let bounds = Bounds {
            x_min: -1.0,
            x_max: graph.layers().len() as f64,
            y_min: y_min - 1.0,
            y_max: y_max + 1.0,
        };

        Self {
            nodes,
            edges,
            bounds,
        }
    }

    pub fn position(&self, id: NodeId) -> Option<(f64, f64)> {
        self.nodes.iter().find(|n| n.id == id).map(|n| (n.x, n.y))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_and_centering() {
        let mut graph = FlowGraph::new();
        let a = graph.add_data_node("a", None).unwrap();
        let b = graph.add_data_node("b", None).unwrap();
        let c = graph.add_data_node("c", None).unwrap();
        let l0 = graph.add_layer(vec![a]).unwrap();
        let l1 = graph.add_layer(vec![b, c]).unwrap();
        graph.connect_layers(l0, l1).unwrap();

        let layout = GraphLayout::compute(&graph);

        assert_eq!(layout.position(a), Some((0.0, 0.0)));
        assert_eq!(layout.position(b), Some((1.0, -0.5)));
        assert_eq!(layout.position(c), Some((1.0, 0.5)));
        assert_eq!(layout.edges.len(), 2);
        assert_eq!(
            layout.bounds,
            Bounds {
                x_min: -1.0,
                x_max: 2.0,
                y_min: -1.5,
                y_max: 1.5
            }
        );
    }

    #[test]
    fn test_last_layer_wins() {
        let mut graph = FlowGraph::new();
        let a = graph.add_data_node("a", None).unwrap();
        let b = graph.add_data_node("b", None).unwrap();
        graph.add_layer(vec![a, b]).unwrap();
        graph.add_layer(vec![a]).unwrap();

        let layout = GraphLayout::compute(&graph);
        assert_eq!(layout.nodes.len(), 2);
        assert_eq!(layout.position(a), Some((1.0, 0.0)));
    }

    #[test]
    fn test_unlayered_nodes_are_skipped() {
        let mut graph = FlowGraph::new();
        let a = graph.add_data_node("a", None).unwrap();
        let loose = graph.add_data_node("loose", None).unwrap();
        graph.connect(a, loose).unwrap();
        graph.add_layer(vec![a]).unwrap();

        let layout = GraphLayout::compute(&graph);
        assert!(layout.position(loose).is_none());
        assert!(layout.edges.is_empty());
    }

    #[test]
    fn test_json_export() {
        let mut graph = FlowGraph::new();
        let a = graph.add_merge_node("mix").unwrap();
        graph.add_layer(vec![a]).unwrap();

        let json = GraphLayout::compute(&graph).to_json().unwrap();
        assert!(json.contains("\"kind\": \"merge\""));
        assert!(json.contains("\"name\": \"mix\""));
    }
}
