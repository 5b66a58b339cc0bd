//! Loading graph definitions from disk

mod common;

use common::assert_history;
use layerflow::{config::StageDefinition, FlowError, GraphDefinition, GraphLayout};
use serde_json::json;
use std::io::Write;

const FAN_IN: &str = r##"
[engine]
trace = true

[[layers]]
[[layers.nodes]]
name = "Left"
kind = "data"
data = { tags = ["l"] }

[[layers.nodes]]
name = "Right"
kind = "data"
data = { tags = "r" }

[[layers]]
[[layers.nodes]]
name = "Mixer"
kind = "merge"

[[layers]]
[[layers.nodes]]
name = "Label"
kind = "transform"
bag = { suffix = "!" }
stages = [{ kind = "script", name = "count", source = "#{ count: tags.len() }" }]

[[layers]]
[[layers.nodes]]
name = "Sink"
kind = "data"
"##;

fn write_graph(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_build_and_run_from_file() {
    let file = write_graph(FAN_IN);
    let definition = GraphDefinition::load(file.path()).unwrap();
    assert!(definition.engine.trace);

    let mut graph = definition.build().unwrap();
    let report = graph.run().unwrap();

    let sink = graph.find("Sink").unwrap();
    // The mixer runs once per arriving input; Right has data from the start
    assert_history(
        graph.history(sink).unwrap(),
        &[
            json!({"tags": ["l", "r"], "suffix": "!", "count": 2}),
            json!({"tags": ["l", "r"], "suffix": "!", "count": 2}),
        ],
    );
    assert!(report.failures().is_empty());
}

#[test]
fn test_traced_definition_records_traces() {
    let mut graph = GraphDefinition::from_toml_str(FAN_IN).unwrap().build().unwrap();
    graph.run().unwrap();

    let label = graph.node_by_name("Label").unwrap();
    let layerflow::NodeKind::Transform(transform) = label.kind() else {
        panic!("Label should be a transform node");
    };
    let trace = transform.pipeline().unwrap().trace().unwrap();
    assert_eq!(trace[0].stage, "input");
    assert_eq!(trace[0].output, layerflow::bag_from(json!({"suffix": "!"})));
    assert_eq!(trace.len(), 3);
}

#[test]
fn test_duplicate_node_names() {
    let toml = r#"
[[layers]]
[[layers.nodes]]
name = "Same"
kind = "data"

[[layers]]
[[layers.nodes]]
name = "Same"
kind = "merge"
"#;
    let err = GraphDefinition::from_toml_str(toml).unwrap().build().unwrap_err();
    assert!(err.to_string().contains("Same"));
    assert!(matches!(err, FlowError::WithContext { .. }));
}

#[test]
fn test_unknown_node_kind_is_parse_error() {
    let toml = r#"
[[layers]]
[[layers.nodes]]
name = "X"
kind = "teleport"
"#;
    let err = GraphDefinition::from_toml_str(toml).unwrap_err();
    assert!(matches!(err, FlowError::Config(_)));
}

#[test]
fn test_script_stage_round_trip() {
    let definition = GraphDefinition::from_toml_str(FAN_IN).unwrap();
    let stage = &definition.layers[2].nodes[0].stages[0];
    assert!(matches!(stage, StageDefinition::Script { name, .. } if name == "count"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fan_in.toml");
    definition.save(&path).unwrap();
    assert_eq!(GraphDefinition::load(&path).unwrap(), definition);
}

#[test]
fn test_demo_layout() {
    let graph = GraphDefinition::demo().unwrap().build().unwrap();
    let layout = GraphLayout::compute(&graph);

    let position = |name: &str| layout.position(graph.find(name).unwrap()).unwrap();
    assert_eq!(position("InputNode"), (0.0, 0.0));
    assert_eq!(position("AdderNode"), (1.0, -0.5));
    assert_eq!(position("MultiplierNode"), (1.0, 0.5));
    assert_eq!(position("OutputNode"), (4.0, 0.0));
    assert_eq!(layout.edges.len(), graph.edge_count());
    assert_eq!(layout.bounds.x_max, 5.0);
}
