//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// External site identifier, as it appears in the network source.
///
/// Ids are stable across loads and are what callers, logs, and trajectory
/// output refer to. They need not be dense.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Dense arena index of a node inside a loaded [`Graph`](crate::Graph).
///
/// Assigned in load order. Only meaningful for the graph that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    /// The index as a `usize`, for slice access.
    #[inline]
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Dense arena index of an edge inside a loaded [`Graph`](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeIndex(pub u32);

impl EdgeIndex {
    /// The index as a `usize`, for slice access.
    #[inline]
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EdgeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Edge({})", self.0)
    }
}

/// Carrier identifier, unique within one simulation state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CarrierId(pub u64);

impl CarrierId {
    /// The first id handed out by a fresh state.
    pub const FIRST: Self = CarrierId(0);

    /// Get the next carrier id.
    pub fn next(self) -> Self {
        CarrierId(self.0 + 1)
    }
}

impl fmt::Display for CarrierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Carrier({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carrier_id_next() {
        assert_eq!(CarrierId::FIRST.next(), CarrierId(1));
        assert_eq!(CarrierId(41).next(), CarrierId(42));
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeId(7).to_string(), "Node(7)");
        assert_eq!(NodeIndex(3).to_string(), "#3");
        assert_eq!(EdgeIndex(2).to_string(), "Edge(2)");
        assert_eq!(CarrierId(5).to_string(), "Carrier(5)");
    }

    #[test]
    fn test_index_get() {
        assert_eq!(NodeIndex(9).get(), 9);
        assert_eq!(EdgeIndex(0).get(), 0);
    }
}
