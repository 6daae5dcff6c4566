//! Node and container model.
//!
//! A [`GraphNode`] is a fixed slot in the layout. Its type decides which
//! transfers into and out of it are legal; its single mutable field is the
//! optional [`Container`] sitting on it.

use crate::id::{NodeId, TransportUnitNumber};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

// ---------------------------------------------------------------------------
// Node type
// ---------------------------------------------------------------------------

/// The role of a node in the material-handling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// A loop segment. Containers circulate over conveyors.
    Conveyor,
    /// Entry point where containers arrive from the warehouse.
    Retrieval,
    /// Exit point; containers placed here are handed to the warehouse.
    Storage,
    /// Work station where a container is picked and sent back to storage.
    Commissioning,
    /// Presentation-only placeholder. Never holds a container.
    Warehouse,
}

impl NodeType {
    /// Whether a container may move from a node of this type onto a node of
    /// type `to`.
    pub fn can_transfer_to(self, to: NodeType) -> bool {
        matches!(
            (self, to),
            (NodeType::Retrieval, NodeType::Conveyor)
                | (NodeType::Conveyor, NodeType::Conveyor)
                | (NodeType::Conveyor, NodeType::Commissioning)
                | (NodeType::Conveyor, NodeType::Storage)
                | (NodeType::Commissioning, NodeType::Conveyor)
        )
    }

    /// Short uppercase label used by text views.
    pub fn label(self) -> &'static str {
        match self {
            NodeType::Conveyor => "CONVEYOR",
            NodeType::Retrieval => "RETRIEVAL",
            NodeType::Storage => "STORAGE",
            NodeType::Commissioning => "COMMISSIONING",
            NodeType::Warehouse => "WAREHOUSE",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raster position of a node, used only by views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
}

impl Coordinates {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// The token moving through the loop.
///
/// Two containers are equal when their transport unit numbers match; content
/// and destination do not take part in equality or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    transport_unit: TransportUnitNumber,
    content: String,
    destination: NodeType,
}

impl Container {
    pub fn new(
        transport_unit: TransportUnitNumber,
        content: impl Into<String>,
        destination: NodeType,
    ) -> Self {
        Self {
            transport_unit,
            content: content.into(),
            destination,
        }
    }

    pub fn transport_unit(&self) -> TransportUnitNumber {
        self.transport_unit
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// The node type this container is heading for.
    pub fn destination(&self) -> NodeType {
        self.destination
    }

    pub(crate) fn set_destination(&mut self, destination: NodeType) {
        self.destination = destination;
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.transport_unit == other.transport_unit
    }
}

impl Eq for Container {}

impl Hash for Container {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.transport_unit.hash(state);
    }
}

// ---------------------------------------------------------------------------
// GraphNode
// ---------------------------------------------------------------------------

/// A slot in the layout holding at most one container.
#[derive(Debug, Clone)]
pub struct GraphNode {
    id: NodeId,
    node_type: NodeType,
    coordinates: Coordinates,
    slot: Option<Container>,
}

impl GraphNode {
    pub fn new(id: NodeId, node_type: NodeType, coordinates: Coordinates) -> Self {
        Self {
            id,
            node_type,
            coordinates,
            slot: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    pub fn container(&self) -> Option<&Container> {
        self.slot.as_ref()
    }

    pub(crate) fn container_mut(&mut self) -> Option<&mut Container> {
        self.slot.as_mut()
    }

    /// Remove and return the container, leaving the slot empty.
    pub(crate) fn take(&mut self) -> Option<Container> {
        self.slot.take()
    }

    /// Put a container on an empty slot. Hands the container back if the slot
    /// is occupied.
    pub(crate) fn put(&mut self, container: Container) -> Result<(), Container> {
        if self.slot.is_some() {
            return Err(container);
        }
        self.slot = Some(container);
        Ok(())
    }
}
