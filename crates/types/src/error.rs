//! Error types for graph lookup and loading.

use crate::NodeId;
use thiserror::Error;

/// Errors from querying a loaded graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// No node with this id was loaded.
    #[error("node {0} not found")]
    NotFound(NodeId),
}

/// Errors while populating a graph from a [`GraphSource`](crate::GraphSource).
///
/// All of these are fatal: a run never starts on a partially loaded graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    /// The source itself could not be read or parsed.
    #[error("graph source unreadable: {0}")]
    Source(String),

    /// A pair references a node id absent from the node list.
    #[error("pair ({a}, {b}) references missing node {missing}")]
    MissingNode {
        a: NodeId,
        b: NodeId,
        missing: NodeId,
    },

    /// Two node records share an id.
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),

    /// The same unordered pair was listed twice.
    #[error("duplicate pair ({a}, {b})")]
    DuplicatePair { a: NodeId, b: NodeId },

    /// A pair connects a node to itself.
    #[error("pair connects {0} to itself")]
    SelfLoop(NodeId),

    /// A rate is negative or not finite.
    #[error("invalid rate on pair ({a}, {b})")]
    InvalidRate { a: NodeId, b: NodeId },

    /// A position or displacement has non-finite components.
    #[error("non-finite geometry on {0}")]
    InvalidGeometry(NodeId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let e = GraphError::NotFound(NodeId(12));
        assert_eq!(e.to_string(), "node Node(12) not found");
    }

    #[test]
    fn test_error_display_missing_node() {
        let e = LoadError::MissingNode {
            a: NodeId(1),
            b: NodeId(9),
            missing: NodeId(9),
        };
        let s = e.to_string();
        assert!(s.contains("Node(9)"));
        assert!(s.contains("missing"));
    }

    #[test]
    fn test_error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(LoadError::Source("gone".into()));
        assert!(e.to_string().contains("gone"));
    }
}
