use crate::id::NodeId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node {node} is outside the graph (node count {node_count})")]
    NodeOutOfRange { node: NodeId, node_count: usize },
    #[error("edge weight must be at least 1, got {weight}")]
    InvalidWeight { weight: u32 },
}

// ---------------------------------------------------------------------------
// Edge table entry
// ---------------------------------------------------------------------------

/// One row of an edge table: a directed edge and its weight.
///
/// The weight only marks the edge as present; it is never used as a cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl EdgeSpec {
    pub const fn new(from: u32, to: u32) -> Self {
        Self {
            from: NodeId(from),
            to: NodeId(to),
            weight: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// AdjacencyGraph
// ---------------------------------------------------------------------------

/// A directed graph over the dense node IDs `0..node_count`, stored as an
/// adjacency matrix. Row `from`, column `to` holds the edge weight; 0 means
/// no edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyGraph {
    node_count: usize,
    matrix: Vec<u32>,
}

impl AdjacencyGraph {
    /// Create a graph with `node_count` nodes and no edges.
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            matrix: vec![0; node_count * node_count],
        }
    }

    /// Create a graph with `node_count` nodes and the given edges.
    pub fn from_edges(node_count: usize, edges: &[EdgeSpec]) -> Result<Self, GraphError> {
        let mut graph = Self::new(node_count);
        for edge in edges {
            graph.add_edge(edge.from, edge.to, edge.weight)?;
        }
        Ok(graph)
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of directed edges with a positive weight.
    pub fn edge_count(&self) -> usize {
        self.matrix.iter().filter(|&&w| w > 0).count()
    }

    /// Set (or overwrite) the weight of the directed edge `from -> to`.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, weight: u32) -> Result<(), GraphError> {
        self.check(from)?;
        self.check(to)?;
        if weight < 1 {
            return Err(GraphError::InvalidWeight { weight });
        }
        let cell = self.cell(from, to);
        self.matrix[cell] = weight;
        Ok(())
    }

    /// Weight of the edge `from -> to`, or 0 if there is none.
    pub fn edge_weight(&self, from: NodeId, to: NodeId) -> Result<u32, GraphError> {
        self.check(from)?;
        self.check(to)?;
        Ok(self.matrix[self.cell(from, to)])
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edge_weight(from, to).is_ok_and(|w| w > 0)
    }

    /// All nodes reachable over one edge from `node`, in ascending ID order.
    ///
    /// The returned iterator is `Clone`, so a caller can restart the walk.
    pub fn adjacent_nodes(&self, node: NodeId) -> Result<Adjacent<'_>, GraphError> {
        self.check(node)?;
        let start = node.index() * self.node_count;
        Ok(Adjacent {
            row: &self.matrix[start..start + self.node_count],
            next: 0,
        })
    }

    /// All nodes with an edge into `node`, in ascending ID order.
    pub fn predecessors(&self, node: NodeId) -> Result<Vec<NodeId>, GraphError> {
        self.check(node)?;
        Ok((0..self.node_count)
            .filter(|&from| self.matrix[from * self.node_count + node.index()] > 0)
            .map(|from| NodeId(from as u32))
            .collect())
    }

    /// Every edge in row-major (from, then to) order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeSpec> + '_ {
        self.matrix
            .iter()
            .enumerate()
            .filter(|(_, w)| **w > 0)
            .map(|(cell, &weight)| EdgeSpec {
                from: NodeId((cell / self.node_count) as u32),
                to: NodeId((cell % self.node_count) as u32),
                weight,
            })
    }

    fn check(&self, node: NodeId) -> Result<(), GraphError> {
        if node.index() < self.node_count {
            Ok(())
        } else {
            Err(GraphError::NodeOutOfRange {
                node,
                node_count: self.node_count,
            })
        }
    }

    fn cell(&self, from: NodeId, to: NodeId) -> usize {
        from.index() * self.node_count + to.index()
    }
}

/// Iterator over the successors of one node. See
/// [`AdjacencyGraph::adjacent_nodes`].
#[derive(Debug, Clone)]
pub struct Adjacent<'a> {
    row: &'a [u32],
    next: usize,
}

impl Iterator for Adjacent<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while self.next < self.row.len() {
            let index = self.next;
            self.next += 1;
            if self.row[index] > 0 {
                return Some(NodeId(index as u32));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.row.len() - self.next))
    }
}
