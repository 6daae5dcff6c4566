//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::engine::LoopEngine;
use crate::id::{NodeId, TransportUnitNumber};
use crate::node::{Container, GraphNode, NodeType};

// ===========================================================================
// Built-in layout landmarks
// ===========================================================================

pub const COMMISSIONING: NodeId = NodeId(0);
pub const STORAGE: NodeId = NodeId(13);
pub const RETRIEVAL: NodeId = NodeId(14);
pub const WAREHOUSE: NodeId = NodeId(15);

/// The conveyor the retrieval spur feeds.
pub const RETRIEVAL_ENTRY: NodeId = NodeId(8);

// ===========================================================================
// Queries
// ===========================================================================

/// Node currently holding the container with this number.
pub fn position_of(engine: &LoopEngine, transport_unit: TransportUnitNumber) -> Option<NodeId> {
    engine
        .nodes()
        .iter()
        .find(|n| n.container().is_some_and(|c| c.transport_unit() == transport_unit))
        .map(GraphNode::id)
}

/// Transport unit number on `node`, if any.
pub fn occupant(engine: &LoopEngine, node: NodeId) -> Option<TransportUnitNumber> {
    engine
        .node(node)
        .and_then(GraphNode::container)
        .map(Container::transport_unit)
}

/// Ids of all occupied graph nodes, ascending.
pub fn occupied_nodes(engine: &LoopEngine) -> Vec<NodeId> {
    engine
        .nodes()
        .iter()
        .filter(|n| !n.is_empty())
        .map(GraphNode::id)
        .collect()
}

/// Every container number on the loop, in node order.
pub fn container_numbers(engine: &LoopEngine) -> Vec<TransportUnitNumber> {
    engine
        .nodes()
        .iter()
        .filter_map(GraphNode::container)
        .map(Container::transport_unit)
        .collect()
}

// ===========================================================================
// Builders
// ===========================================================================

/// Fill the given nodes with containers bound for `destination`.
pub fn fill(engine: &mut LoopEngine, nodes: &[NodeId], destination: NodeType) -> Vec<TransportUnitNumber> {
    nodes
        .iter()
        .filter_map(|&node| engine.place_container(node, "Apples", destination))
        .collect()
}

/// Step `ticks` times, recording the position of `transport_unit` after each.
pub fn trace_path(
    engine: &mut LoopEngine,
    transport_unit: TransportUnitNumber,
    ticks: usize,
) -> Vec<Option<NodeId>> {
    (0..ticks)
        .map(|_| {
            engine.step().ok()?;
            position_of(engine, transport_unit)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_and_find() {
        let mut engine = LoopEngine::new();
        let tuns = fill(&mut engine, &[NodeId(2), NodeId(5)], NodeType::Storage);
        assert_eq!(tuns.len(), 2);
        assert_eq!(position_of(&engine, tuns[1]), Some(NodeId(5)));
        assert_eq!(occupant(&engine, NodeId(2)), Some(tuns[0]));
        assert_eq!(occupied_nodes(&engine), vec![NodeId(2), NodeId(5)]);
        assert_eq!(container_numbers(&engine), tuns);
    }

    #[test]
    fn fill_skips_occupied_nodes() {
        let mut engine = LoopEngine::new();
        fill(&mut engine, &[NodeId(2)], NodeType::Storage);
        assert!(fill(&mut engine, &[NodeId(2)], NodeType::Storage).is_empty());
    }
}
