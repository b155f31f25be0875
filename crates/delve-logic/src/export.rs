//! Graphviz DOT export for offline inspection of a level.
//!
//! Not a stable format: labels and sizes are cosmetic. Nodes on the
//! critical path are drawn red.

use std::fmt::Write;

use crate::graph::Graph;

/// Render the full graph, ignoring visibility, as a `digraph`.
pub fn export_dot(graph: &Graph) -> String {
    let mut body = String::new();

    for node in graph.nodes() {
        let label = match node.difficulty() {
            Some(level) => format!("Level {}", level),
            None => node.id().to_string(),
        };
        let color = if node.on_critical_path() { "red" } else { "black" };
        let (width, height) = node.footprint();
        let _ = writeln!(
            body,
            "  {:?}[label={:?}, shape=square, width={:.2}, height={:.2}, color={}];",
            node.id().as_str(),
            label,
            width,
            height,
            color
        );
    }

    for node in graph.nodes() {
        for edge in node.edges() {
            let _ = writeln!(
                body,
                "  {:?} -> {:?};",
                node.id().as_str(),
                edge.target().as_str()
            );
        }
    }

    format!("digraph G {{\n{}}}\n", body)
}
