//! Test data builders for creating graphs and pipelines

use layerflow::{
    bag_from, builtin_stage, Bag, FlowGraph, FnStage, LayerId, NodeId, Pipeline,
};
use serde_json::Value;

/// Builder for pipelines made of built-in and closure stages
#[derive(Default)]
pub struct PipelineBuilder {
    bag: Bag,
    traced: bool,
    stages: Vec<StageSpec>,
}

enum StageSpec {
    Builtin(String, Bag),
    Raising(String),
    Returning(String, Value),
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bag(mut self, bag: Value) -> Self {
        self.bag = bag_from(bag);
        self
    }

    pub fn traced(mut self) -> Self {
        self.traced = true;
        self
    }

    pub fn builtin(mut self, name: &str, params: Value) -> Self {
        self.stages
            .push(StageSpec::Builtin(name.to_string(), bag_from(params)));
        self
    }

    /// A stage that always raises
    pub fn raising(mut self, name: &str) -> Self {
        self.stages.push(StageSpec::Raising(name.to_string()));
        self
    }

    /// A stage that always returns `value`, mapping or not
    pub fn returning(mut self, name: &str, value: Value) -> Self {
        self.stages
            .push(StageSpec::Returning(name.to_string(), value));
        self
    }

    pub fn build(self) -> Pipeline {
        let mut pipeline = Pipeline::new(self.bag);
        if self.traced {
            pipeline = pipeline.traced();
        }
        for stage in self.stages {
            match stage {
                StageSpec::Builtin(name, params) => {
                    pipeline.push(builtin_stage(&name, params).unwrap());
                }
                StageSpec::Raising(name) => {
                    let message = format!("{} exploded", name);
                    pipeline.push(FnStage::new(name, move |_: &Bag| {
                        Err(anyhow::anyhow!(message.clone()))
                    }));
                }
                StageSpec::Returning(name, value) => {
                    pipeline.push(FnStage::new(name, move |_: &Bag| Ok(value.clone())));
                }
            }
        }
        pipeline
    }
}

/// Builder for layered graphs, one layer per `layer` call
pub struct GraphBuilder {
    graph: FlowGraph,
    layers: Vec<LayerId>,
    current: Vec<NodeId>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: FlowGraph::new(),
            layers: Vec::new(),
            current: Vec::new(),
        }
    }

    pub fn data(mut self, name: &str, data: Option<Value>) -> Self {
        let id = self
            .graph
            .add_data_node(name, data.map(bag_from))
            .unwrap();
        self.current.push(id);
        self
    }

    pub fn transform(mut self, name: &str, pipeline: PipelineBuilder) -> Self {
        let id = self
            .graph
            .add_transform_node(name, Some(pipeline.build()))
            .unwrap();
        self.current.push(id);
        self
    }

    pub fn merge(mut self, name: &str) -> Self {
        let id = self.graph.add_merge_node(name).unwrap();
        self.current.push(id);
        self
    }

    /// Close the current layer
    pub fn layer(mut self) -> Self {
        let nodes = std::mem::take(&mut self.current);
        let id = self.graph.add_layer(nodes).unwrap();
        self.layers.push(id);
        self
    }

    /// Connect every layer to the next and return the graph
    pub fn chained(mut self) -> FlowGraph {
        if !self.current.is_empty() {
            self = self.layer();
        }
        self.graph.chain_layers().unwrap();
        self.graph
    }

    /// Return the graph without wiring any layers
    pub fn unwired(mut self) -> FlowGraph {
        if !self.current.is_empty() {
            self = self.layer();
        }
        self.graph
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_graph_builder_layers() {
        let graph = GraphBuilder::new()
            .data("a", Some(json!({"x": 1})))
            .layer()
            .data("b", None)
            .data("c", None)
            .chained();

        assert_eq!(graph.layers().len(), 2);
        assert_eq!(graph.edge_count(), 2);
    }
}
