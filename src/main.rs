//! layerflow - Main Entry Point
//!
//! Loads a graph definition (or the bundled demo), pushes data through it
//! from the first layer, and logs what reached the first and last layers.

use anyhow::{Context, Result};
use clap::Parser;
use layerflow::{
    config::GraphDefinition,
    graph::{GraphLayout, NodeKind},
    types::BagDisplay,
    FlowGraph,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Run a layered dataflow graph
#[derive(Parser)]
#[command(name = "layerflow")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Graph definition (TOML). Runs the bundled demo when omitted.
    graph: Option<PathBuf>,

    /// Print node positions and edges as JSON after the run
    #[arg(long)]
    layout_json: bool,

    /// Record and log pipeline traces
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut definition = match &cli.graph {
        Some(path) => GraphDefinition::load(path)?,
        None => GraphDefinition::demo()?,
    };
    if cli.trace {
        definition.engine.trace = true;
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(definition.engine.log_filter())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &cli.graph {
        Some(path) => tracing::info!("Running graph from {:?}", path),
        None => tracing::info!("Running bundled demo graph"),
    }

    let mut graph = definition.build().context("Failed to build graph")?;
    let report = graph.run().context("Failed to run graph")?;

    tracing::info!(
        "Run finished: {} visits, {} halted, {} stale, {} cycles, {} failed",
        report.len(),
        report.halted().count(),
        report.stale().count(),
        report.cycles().len(),
        report.failures().len()
    );

    log_layer_histories(&graph);
    if cli.trace {
        log_traces(&graph);
    }

    if cli.layout_json {
        let layout = GraphLayout::compute(&graph);
        println!("{}", layout.to_json()?);
    }

    Ok(())
}

fn log_layer_histories(graph: &FlowGraph) {
    let layers = graph.layers();
    let ends = [layers.first(), layers.last()];
    for layer in ends.into_iter().flatten() {
        for &id in layer.nodes() {
            let Ok(node) = graph.node(id) else { continue };
            let history: Vec<String> = node
                .history()
                .iter()
                .map(|entry| BagDisplay(entry).to_string())
                .collect();
            tracing::info!("Data history in {}: [{}]", node.name(), history.join(", "));
        }
        if layers.len() == 1 {
            break;
        }
    }
}

fn log_traces(graph: &FlowGraph) {
    for node in graph.nodes() {
        let NodeKind::Transform(transform) = node.kind() else {
            continue;
        };
        let Some(trace) = transform.pipeline().and_then(|p| p.trace()) else {
            continue;
        };
        for (step, entry) in trace.iter().enumerate() {
            tracing::info!(
                "Trace {}[{}] {}: {}",
                node.name(),
                step,
                entry.stage,
                BagDisplay(&entry.output)
            );
        }
    }
}
