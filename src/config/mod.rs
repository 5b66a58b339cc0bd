//! Graph definition files
//!
//! A graph is described in TOML: an optional `[engine]` section, ordered
//! `[[layers]]` each holding `[[layers.nodes]]`, and optional explicit
//! `[[edges]]` between node names.
//!
//! # Example
//!
//! ```toml
//! [engine]
//! trace = true
//!
//! [[layers]]
//! [[layers.nodes]]
//! name = "Input"
//! kind = "data"
//! data = { passthrough = 10 }
//!
//! [[layers]]
//! [[layers.nodes]]
//! name = "Adder"
//! kind = "transform"
//! stages = [{ kind = "builtin", name = "add", params = { value = 5 } }]
//! ```
//!
//! With `chain_layers` (the default) every layer is fully connected to the
//! next one, mirroring how graphs are wired by hand.

use crate::error::{FlowError, FlowResult, ResultExt};
use crate::graph::{DataNode, FlowGraph, MergeNode, NodeKind, TransformNode};
use crate::pipeline::{builtin_stage, Pipeline};
use crate::scripting::{ScriptEngine, ScriptStage};
use crate::types::Bag;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Default `tracing` filter for the command-line driver
pub const DEFAULT_LOG_FILTER: &str = "info,layerflow=debug";

/// The graph shipped with the crate, wired like the classic mixer example
pub const DEMO_GRAPH: &str = include_str!("../../demos/layered_mixer.toml");

/// Engine-wide switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Record pipeline traces on every transform node
    pub trace: bool,
    /// Connect each layer to the next one
    pub chain_layers: bool,
    /// `tracing` filter used when `RUST_LOG` is unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trace: false,
            chain_layers: true,
            log_filter: None,
        }
    }
}

impl EngineConfig {
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKindDefinition {
    Data,
    Transform,
    Merge,
}

/// One pipeline stage in a transform node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StageDefinition {
    Builtin {
        name: String,
        #[serde(default, skip_serializing_if = "Bag::is_empty")]
        params: Bag,
    },
    Script {
        name: String,
        source: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub name: String,
    pub kind: NodeKindDefinition,
    /// Initial payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bag>,
    /// Initial pipeline bag (transform nodes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bag: Option<Bag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageDefinition>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDefinition {
    pub from: String,
    pub to: String,
}

/// A complete graph description
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphDefinition {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub layers: Vec<LayerDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<EdgeDefinition>,
}

impl GraphDefinition {
    /// Load a definition from a TOML file
    pub fn load(path: impl AsRef<Path>) -> FlowResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowError::Config(format!("Failed to read graph file {:?}: {}", path, e))
        })?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load graph file {:?}", path))
    }

    /// Parse a definition from TOML text
    pub fn from_toml_str(content: &str) -> FlowResult<Self> {
        toml::from_str(content)
            .map_err(|e| FlowError::Config(format!("Failed to parse graph definition: {}", e)))
    }

    /// The bundled demo graph
    pub fn demo() -> FlowResult<Self> {
        Self::from_toml_str(DEMO_GRAPH).context("Bundled demo graph is invalid")
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> FlowResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| FlowError::Config(format!("Failed to serialize graph definition: {}", e)))
    }

    /// Save the definition as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> FlowResult<()> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| {
            FlowError::Config(format!("Failed to write graph file {:?}: {}", path, e))
        })
    }

    /// Build a graph with a fresh script engine
    pub fn build(&self) -> FlowResult<FlowGraph> {
        self.build_with_engine(&ScriptEngine::shared())
    }

    /// Build a graph, compiling script stages on `engine`
    pub fn build_with_engine(&self, engine: &Arc<ScriptEngine>) -> FlowResult<FlowGraph> {
        if self.layers.is_empty() {
            return Err(FlowError::Config("graph has no layers".to_string()));
        }

        let mut graph = FlowGraph::new();
        for (index, layer) in self.layers.iter().enumerate() {
            let mut ids = Vec::with_capacity(layer.nodes.len());
            for node in &layer.nodes {
                let kind = self.node_kind(node, engine)?;
                let id = graph
                    .add_node(node.name.clone(), kind, node.data.clone())
                    .with_context(|| format!("Layer {} is invalid", index))?;
                ids.push(id);
            }
            graph.add_layer(ids)?;
        }

        if self.engine.chain_layers {
            graph.chain_layers()?;
        }

        for edge in &self.edges {
            let from = lookup(&graph, &edge.from)?;
            let to = lookup(&graph, &edge.to)?;
            graph
                .connect(from, to)
                .with_context(|| format!("Edge {} -> {} is invalid", edge.from, edge.to))?;
        }

        tracing::info!(
            "Built graph: {} nodes, {} layers, {} edges",
            graph.node_count(),
            graph.layers().len(),
            graph.edge_count()
        );
        Ok(graph)
    }

    fn node_kind(&self, node: &NodeDefinition, engine: &Arc<ScriptEngine>) -> FlowResult<NodeKind> {
        if node.kind != NodeKindDefinition::Transform && (node.bag.is_some() || !node.stages.is_empty()) {
            return Err(FlowError::Config(format!(
                "node '{}': only transform nodes take a bag or stages",
                node.name
            )));
        }

        let kind = match node.kind {
            NodeKindDefinition::Data => NodeKind::Data(DataNode::new()),
            NodeKindDefinition::Merge => NodeKind::Merge(MergeNode),
            NodeKindDefinition::Transform if node.stages.is_empty() && node.bag.is_none() => {
                NodeKind::Transform(TransformNode::unconfigured())
            }
            NodeKindDefinition::Transform => {
                let pipeline = self
                    .pipeline(node, engine)
                    .with_context(|| format!("node '{}' has an invalid pipeline", node.name))?;
                NodeKind::Transform(TransformNode::new(pipeline))
            }
        };
        Ok(kind)
    }

    fn pipeline(&self, node: &NodeDefinition, engine: &Arc<ScriptEngine>) -> FlowResult<Pipeline> {
        let mut pipeline = Pipeline::new(node.bag.clone().unwrap_or_default());
        if self.engine.trace {
            pipeline = pipeline.traced();
        }

        for stage in &node.stages {
            match stage {
                StageDefinition::Builtin { name, params } => {
                    pipeline.push(builtin_stage(name, params.clone())?);
                }
                StageDefinition::Script { name, source } => {
                    pipeline.push(ScriptStage::compile(engine, name.clone(), source)?);
                }
            }
        }
        Ok(pipeline)
    }
}

fn lookup(graph: &FlowGraph, name: &str) -> FlowResult<crate::graph::NodeId> {
    graph
        .find(name)
        .ok_or_else(|| FlowError::Config(format!("edge refers to unknown node '{}'", name)))
}
