use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node in the loop layout. Node IDs are dense: a layout with
/// `N` graph nodes uses exactly `0..N`, so the ID doubles as an arena index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The arena index for this node.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The transport unit number that identifies a container for its whole life.
/// Unique per engine and assigned in strictly increasing order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TransportUnitNumber(pub u32);

impl fmt::Display for TransportUnitNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_index_matches_value() {
        assert_eq!(NodeId(0).index(), 0);
        assert_eq!(NodeId(14).index(), 14);
    }

    #[test]
    fn ids_order_by_value() {
        assert!(NodeId(3) < NodeId(12));
        assert!(TransportUnitNumber(10001) < TransportUnitNumber(10002));
    }

    #[test]
    fn display_formats() {
        assert_eq!(NodeId(8).to_string(), "#8");
        assert_eq!(TransportUnitNumber(10001).to_string(), "10001");
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(NodeId(0), "commissioning");
        map.insert(NodeId(14), "retrieval");
        assert_eq!(map[&NodeId(14)], "retrieval");
    }
}
