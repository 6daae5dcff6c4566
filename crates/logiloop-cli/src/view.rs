//! Plain-text rendering of snapshot records.

use logiloop_core::engine::LoopError;
use logiloop_core::presenter::LoopView;
use logiloop_core::query::{ContainerRow, ViewNode};
use std::io::Write;

/// Format one snapshot record as a single line.
pub fn describe(node: &ViewNode) -> String {
    let place = format!(
        "{} {} ({}, {})",
        node.node_id, node.node_type, node.coordinates.x, node.coordinates.y
    );
    match &node.container {
        Some(c) => format!(
            "{place}: {} \"{}\" -> {}",
            c.transport_unit(),
            c.content(),
            c.destination()
        ),
        None => format!("{place}: empty"),
    }
}

pub fn describe_row(row: &ContainerRow) -> String {
    format!(
        "{:>8}  {:<12} {:<14} {} {}",
        row.transport_unit, row.content, row.destination, row.node_id, row.node_type
    )
}

/// Writes every change as a line to the wrapped writer.
pub struct TextView<W: Write> {
    out: W,
}

impl<W: Write> TextView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            tracing::warn!(error = %e, "could not write view output");
        }
    }
}

impl<W: Write> LoopView for TextView<W> {
    fn initialize(&mut self, nodes: &[ViewNode]) {
        self.line(&format!("loop with {} nodes", nodes.len()));
        for node in nodes {
            let following: Vec<String> = node.following.iter().map(ToString::to_string).collect();
            self.line(&format!("  {} -> [{}]", describe(node), following.join(", ")));
        }
    }

    fn update(&mut self, changed: &[ViewNode]) {
        for node in changed {
            self.line(&format!("  {}", describe(node)));
        }
    }

    fn show_error(&mut self, error: &LoopError) {
        self.line(&format!("error: {error}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logiloop_core::command::Command;
    use logiloop_core::engine::LoopEngine;
    use logiloop_core::id::NodeId;
    use logiloop_core::presenter::Presenter;

    #[test]
    fn describes_empty_and_occupied_nodes() {
        let mut engine = LoopEngine::new();
        engine.retrieve_container(NodeId(14), "Apples").unwrap();
        let view = engine.view_nodes();
        assert_eq!(describe(&view[8]), "#8 CONVEYOR (3, 1): empty");
        assert_eq!(
            describe(&view[14]),
            "#14 RETRIEVAL (3, 0): 10001 \"Apples\" -> COMMISSIONING"
        );
    }

    #[test]
    fn presenter_output_lists_changes_and_errors() {
        let mut presenter = Presenter::new(LoopEngine::new(), TextView::new(Vec::new()));
        presenter
            .receive_input(Command::retrieve(NodeId(14), "Apples"))
            .unwrap();
        let _ = presenter.receive_input(Command::retrieve(NodeId(14), "Pears"));

        let text = String::from_utf8(presenter.view_mut().out.clone()).unwrap();
        assert!(text.starts_with("loop with 16 nodes"));
        assert!(text.contains("  #14 RETRIEVAL (3, 0): 10001 \"Apples\" -> COMMISSIONING"));
        assert!(text.contains(
            "error: The retrieval node is not empty thus could not retrieve container from warehouse."
        ));
    }
}
