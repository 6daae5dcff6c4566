//! Read-only snapshot records for views.
//!
//! All types are owned copies with no references into engine storage. A view
//! keeps the previous snapshot and asks [`changed_nodes`] which records need
//! redrawing.

use crate::id::{NodeId, TransportUnitNumber};
use crate::node::{Container, Coordinates, NodeType};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// ViewNode
// ---------------------------------------------------------------------------

/// One node as a view sees it.
///
/// Equality is what a view needs for redraw decisions: same type, same id
/// and the same container (by transport unit number). Coordinates and
/// `following` are fixed by the layout and do not take part.
#[derive(Debug, Clone)]
pub struct ViewNode {
    pub node_type: NodeType,
    pub node_id: NodeId,
    pub coordinates: Coordinates,
    /// Successor ids. Storage nodes also list the warehouse they feed.
    pub following: Vec<NodeId>,
    pub container: Option<Container>,
}

impl PartialEq for ViewNode {
    fn eq(&self, other: &Self) -> bool {
        self.node_type == other.node_type
            && self.node_id == other.node_id
            && self.container == other.container
    }
}

impl Eq for ViewNode {}

/// Records of `current` that have no equal record at the same id in
/// `previous`. With no previous snapshot everything counts as changed.
pub fn changed_nodes(previous: Option<&[ViewNode]>, current: &[ViewNode]) -> Vec<ViewNode> {
    let Some(previous) = previous else {
        return current.to_vec();
    };
    let by_id: HashMap<NodeId, &ViewNode> = previous.iter().map(|v| (v.node_id, v)).collect();
    current
        .iter()
        .filter(|v| by_id.get(&v.node_id).is_none_or(|old| *old != *v))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Container table
// ---------------------------------------------------------------------------

/// One line of the container table: where each active container sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRow {
    pub transport_unit: TransportUnitNumber,
    pub content: String,
    pub destination: NodeType,
    pub node_id: NodeId,
    pub node_type: NodeType,
}

/// All containers in a snapshot ordered by transport unit number.
pub fn container_table(nodes: &[ViewNode]) -> Vec<ContainerRow> {
    let mut rows: Vec<ContainerRow> = nodes
        .iter()
        .filter_map(|v| {
            v.container.as_ref().map(|c| ContainerRow {
                transport_unit: c.transport_unit(),
                content: c.content().to_owned(),
                destination: c.destination(),
                node_id: v.node_id,
                node_type: v.node_type,
            })
        })
        .collect();
    rows.sort_by_key(|row| row.transport_unit);
    rows
}
