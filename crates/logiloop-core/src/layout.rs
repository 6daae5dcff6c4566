//! Layout tables and their validation.
//!
//! A [`LayoutConfig`] is the plain data describing a loop: graph nodes, the
//! edge table, and the warehouse overlay. Validation turns it into a
//! [`Layout`] the engine can run, computing the conveyor ring once since the
//! topology never changes afterwards.

use crate::graph::{AdjacencyGraph, EdgeSpec, GraphError};
use crate::id::NodeId;
use crate::node::{Coordinates, GraphNode, NodeType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a layout table cannot be turned into a runnable loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("layout has no graph nodes")]
    Empty,
    #[error("node at position {position} has id {found}; ids must be dense and ordered")]
    NonDenseId { position: usize, found: NodeId },
    #[error("node {0} is a warehouse; warehouses belong in the overlay, not the graph")]
    WarehouseInGraph(NodeId),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("layout has no commissioning node")]
    NoCommissioning,
    #[error("commissioning node {0} has no adjacent conveyor")]
    NoLoopEntry(NodeId),
    #[error("conveyor {node} has {count} conveyor successors, expected exactly one")]
    BrokenLoop { node: NodeId, count: usize },
    #[error("conveyor loop starting at {start} never returns to it")]
    OpenLoop { start: NodeId },
    #[error("conveyor {0} is not part of the loop")]
    DetachedConveyor(NodeId),
    #[error("warehouse {0} collides with a graph node id")]
    WarehouseIdCollision(NodeId),
    #[error("warehouse {warehouse} links to unknown node {node}")]
    UnknownWarehouseLink { warehouse: NodeId, node: NodeId },
}

// ---------------------------------------------------------------------------
// Layout tables
// ---------------------------------------------------------------------------

/// One graph node of a layout table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    pub node_type: NodeType,
    pub coordinates: Coordinates,
}

impl NodeSpec {
    const fn new(id: u32, node_type: NodeType, x: i32, y: i32) -> Self {
        Self {
            id: NodeId(id),
            node_type,
            coordinates: Coordinates::new(x, y),
        }
    }
}

/// A presentation-only warehouse node. It is not part of the graph and never
/// holds a container; `fed_by` lists the storage nodes that hand containers
/// to it and `following` the retrieval nodes it supplies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseSpec {
    pub id: NodeId,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub following: Vec<NodeId>,
    #[serde(default)]
    pub fed_by: Vec<NodeId>,
}

/// The plain-data description of a loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
    #[serde(default)]
    pub warehouses: Vec<WarehouseSpec>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::basic_loop()
    }
}

impl LayoutConfig {
    /// The built-in layout: one commissioning station, a twelve-conveyor
    /// ring, one storage spur, one retrieval spur and a warehouse between
    /// them.
    ///
    /// ```text
    ///      13(S)  15(W)  14(R)
    ///        ^             |
    ///        |             v
    ///   5 -> 6 -> 7 -> 8 -> 9
    ///   ^                   |
    ///   4                   10
    ///   ^                   v
    ///   3 <- 2 <- 1 <- 12 <- 11
    ///            ^|
    ///            |v
    ///            0(K)
    /// ```
    pub fn basic_loop() -> Self {
        use NodeType::*;
        let nodes = vec![
            NodeSpec::new(0, Commissioning, 2, 4),
            NodeSpec::new(1, Conveyor, 2, 3),
            NodeSpec::new(2, Conveyor, 1, 3),
            NodeSpec::new(3, Conveyor, 0, 3),
            NodeSpec::new(4, Conveyor, 0, 2),
            NodeSpec::new(5, Conveyor, 0, 1),
            NodeSpec::new(6, Conveyor, 1, 1),
            NodeSpec::new(7, Conveyor, 2, 1),
            NodeSpec::new(8, Conveyor, 3, 1),
            NodeSpec::new(9, Conveyor, 4, 1),
            NodeSpec::new(10, Conveyor, 4, 2),
            NodeSpec::new(11, Conveyor, 4, 3),
            NodeSpec::new(12, Conveyor, 3, 3),
            NodeSpec::new(13, Storage, 1, 0),
            NodeSpec::new(14, Retrieval, 3, 0),
        ];
        let edges = vec![
            EdgeSpec::new(1, 0),
            EdgeSpec::new(0, 1),
            EdgeSpec::new(1, 2),
            EdgeSpec::new(2, 3),
            EdgeSpec::new(3, 4),
            EdgeSpec::new(4, 5),
            EdgeSpec::new(5, 6),
            EdgeSpec::new(6, 7),
            EdgeSpec::new(7, 8),
            EdgeSpec::new(8, 9),
            EdgeSpec::new(9, 10),
            EdgeSpec::new(10, 11),
            EdgeSpec::new(11, 12),
            EdgeSpec::new(12, 1),
            EdgeSpec::new(6, 13),
            EdgeSpec::new(14, 8),
        ];
        let warehouses = vec![WarehouseSpec {
            id: NodeId(15),
            coordinates: Coordinates::new(2, 0),
            following: vec![NodeId(14)],
            fed_by: vec![NodeId(13)],
        }];
        Self {
            nodes,
            edges,
            warehouses,
        }
    }

    /// Check the table and compute the conveyor ring.
    pub fn validate(&self) -> Result<Layout, LayoutError> {
        if self.nodes.is_empty() {
            return Err(LayoutError::Empty);
        }
        for (position, row) in self.nodes.iter().enumerate() {
            if row.id.index() != position {
                return Err(LayoutError::NonDenseId {
                    position,
                    found: row.id,
                });
            }
            if row.node_type == NodeType::Warehouse {
                return Err(LayoutError::WarehouseInGraph(row.id));
            }
        }

        let graph = AdjacencyGraph::from_edges(self.nodes.len(), &self.edges)?;
        let types: Vec<NodeType> = self.nodes.iter().map(|n| n.node_type).collect();
        let ring = compute_ring(&graph, &types)?;

        for warehouse in &self.warehouses {
            if warehouse.id.index() < self.nodes.len() {
                return Err(LayoutError::WarehouseIdCollision(warehouse.id));
            }
            for &node in warehouse.following.iter().chain(&warehouse.fed_by) {
                if node.index() >= self.nodes.len() {
                    return Err(LayoutError::UnknownWarehouseLink {
                        warehouse: warehouse.id,
                        node,
                    });
                }
            }
        }

        let nodes = self
            .nodes
            .iter()
            .map(|row| GraphNode::new(row.id, row.node_type, row.coordinates))
            .collect();

        Ok(Layout {
            graph,
            nodes,
            warehouses: self.warehouses.clone(),
            ring,
        })
    }
}

// ---------------------------------------------------------------------------
// Validated layout
// ---------------------------------------------------------------------------

/// A validated layout, ready to be owned by an engine.
#[derive(Debug, Clone)]
pub struct Layout {
    pub(crate) graph: AdjacencyGraph,
    pub(crate) nodes: Vec<GraphNode>,
    pub(crate) warehouses: Vec<WarehouseSpec>,
    pub(crate) ring: Vec<NodeId>,
}

impl Layout {
    /// The conveyor ring in travel order, starting at the conveyor that the
    /// commissioning node feeds.
    pub fn ring(&self) -> &[NodeId] {
        &self.ring
    }

    pub fn graph(&self) -> &AdjacencyGraph {
        &self.graph
    }
}

/// Walk the conveyor ring from the commissioning node's entry conveyor.
///
/// Every conveyor must have exactly one conveyor successor and the walk must
/// come back to its start after visiting every conveyor once.
fn compute_ring(graph: &AdjacencyGraph, types: &[NodeType]) -> Result<Vec<NodeId>, LayoutError> {
    let commissioning = types
        .iter()
        .position(|&t| t == NodeType::Commissioning)
        .map(|i| NodeId(i as u32))
        .ok_or(LayoutError::NoCommissioning)?;

    let start = graph
        .adjacent_nodes(commissioning)?
        .find(|n| types[n.index()] == NodeType::Conveyor)
        .ok_or(LayoutError::NoLoopEntry(commissioning))?;

    let conveyor_count = types.iter().filter(|&&t| t == NodeType::Conveyor).count();
    let mut ring = Vec::with_capacity(conveyor_count);
    let mut visited = BTreeSet::new();
    let mut current = start;

    loop {
        ring.push(current);
        visited.insert(current);

        let successors: Vec<NodeId> = graph
            .adjacent_nodes(current)?
            .filter(|n| types[n.index()] == NodeType::Conveyor)
            .collect();
        if successors.len() != 1 {
            return Err(LayoutError::BrokenLoop {
                node: current,
                count: successors.len(),
            });
        }

        let next = successors[0];
        if next == start {
            break;
        }
        if visited.contains(&next) {
            return Err(LayoutError::OpenLoop { start });
        }
        current = next;
    }

    if let Some(detached) = types
        .iter()
        .enumerate()
        .map(|(i, &t)| (NodeId(i as u32), t))
        .find(|(id, t)| *t == NodeType::Conveyor && !visited.contains(id))
        .map(|(id, _)| id)
    {
        return Err(LayoutError::DetachedConveyor(detached));
    }

    Ok(ring)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_loop() -> LayoutConfig {
        use NodeType::*;
        LayoutConfig {
            nodes: vec![
                NodeSpec::new(0, Commissioning, 0, 2),
                NodeSpec::new(1, Conveyor, 0, 1),
                NodeSpec::new(2, Conveyor, 1, 1),
                NodeSpec::new(3, Conveyor, 1, 0),
            ],
            edges: vec![
                EdgeSpec::new(0, 1),
                EdgeSpec::new(1, 0),
                EdgeSpec::new(1, 2),
                EdgeSpec::new(2, 3),
                EdgeSpec::new(3, 1),
            ],
            warehouses: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Built-in layout
    // -----------------------------------------------------------------------

    #[test]
    fn basic_loop_is_valid() {
        let layout = LayoutConfig::basic_loop().validate().unwrap();
        assert_eq!(layout.nodes.len(), 15);
        assert_eq!(layout.graph().edge_count(), 16);
        assert_eq!(layout.warehouses.len(), 1);
    }

    #[test]
    fn basic_loop_ring_order() {
        let layout = LayoutConfig::basic_loop().validate().unwrap();
        let expected: Vec<NodeId> = (1..=12).map(NodeId).collect();
        assert_eq!(layout.ring(), expected.as_slice());
    }

    #[test]
    fn small_loop_ring_order() {
        let layout = small_loop().validate().unwrap();
        assert_eq!(layout.ring(), &[NodeId(1), NodeId(2), NodeId(3)]);
    }

    // -----------------------------------------------------------------------
    // Rejections
    // -----------------------------------------------------------------------

    #[test]
    fn rejects_empty_layout() {
        let config = LayoutConfig {
            nodes: Vec::new(),
            edges: Vec::new(),
            warehouses: Vec::new(),
        };
        assert_eq!(config.validate().unwrap_err(), LayoutError::Empty);
    }

    #[test]
    fn rejects_sparse_ids() {
        let mut config = small_loop();
        config.nodes[2].id = NodeId(7);
        assert_eq!(
            config.validate().unwrap_err(),
            LayoutError::NonDenseId {
                position: 2,
                found: NodeId(7)
            }
        );
    }

    #[test]
    fn rejects_warehouse_in_graph() {
        let mut config = small_loop();
        config.nodes[3].node_type = NodeType::Warehouse;
        assert_eq!(
            config.validate().unwrap_err(),
            LayoutError::WarehouseInGraph(NodeId(3))
        );
    }

    #[test]
    fn rejects_out_of_range_edge() {
        let mut config = small_loop();
        config.edges.push(EdgeSpec::new(3, 9));
        assert!(matches!(
            config.validate().unwrap_err(),
            LayoutError::Graph(GraphError::NodeOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_missing_commissioning() {
        let mut config = small_loop();
        config.nodes[0].node_type = NodeType::Retrieval;
        assert_eq!(config.validate().unwrap_err(), LayoutError::NoCommissioning);
    }

    #[test]
    fn rejects_broken_ring() {
        let mut config = small_loop();
        config.edges.retain(|e| *e != EdgeSpec::new(3, 1));
        assert_eq!(
            config.validate().unwrap_err(),
            LayoutError::BrokenLoop {
                node: NodeId(3),
                count: 0
            }
        );
    }

    #[test]
    fn rejects_ring_that_skips_entry() {
        // 1 -> 2 -> 3 -> 2: the walk never returns to 1.
        let mut config = small_loop();
        config.edges.retain(|e| *e != EdgeSpec::new(3, 1));
        config.edges.push(EdgeSpec::new(3, 2));
        assert_eq!(
            config.validate().unwrap_err(),
            LayoutError::OpenLoop { start: NodeId(1) }
        );
    }

    #[test]
    fn rejects_detached_conveyor() {
        let mut config = small_loop();
        config
            .nodes
            .push(NodeSpec::new(4, NodeType::Conveyor, 5, 5));
        assert_eq!(
            config.validate().unwrap_err(),
            LayoutError::DetachedConveyor(NodeId(4))
        );
    }

    #[test]
    fn rejects_warehouse_id_collision() {
        let mut config = LayoutConfig::basic_loop();
        config.warehouses[0].id = NodeId(3);
        assert_eq!(
            config.validate().unwrap_err(),
            LayoutError::WarehouseIdCollision(NodeId(3))
        );
    }

    #[test]
    fn rejects_unknown_warehouse_link() {
        let mut config = LayoutConfig::basic_loop();
        config.warehouses[0].following = vec![NodeId(40)];
        assert_eq!(
            config.validate().unwrap_err(),
            LayoutError::UnknownWarehouseLink {
                warehouse: NodeId(15),
                node: NodeId(40)
            }
        );
    }
}
