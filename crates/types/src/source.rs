//! The graph source interface.
//!
//! Where site data actually lives (a state database, a TOML file, a
//! generator) is the caller's concern. A source only has to hand back two
//! record lists; [`Graph::load`](crate::Graph::load) does the validation.

use crate::{LoadError, NodeId, Vec3};
use serde::{Deserialize, Serialize};

/// A single hopping site as read from a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Stable external id.
    pub id: NodeId,

    /// Position in simulation length units.
    pub position: Vec3,
}

/// A neighbour pair as read from a source.
///
/// One record describes both hop directions between `a` and `b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRecord {
    pub a: NodeId,
    pub b: NodeId,

    /// Minimum-image displacement from `a` to `b`.
    ///
    /// This is not necessarily `position(b) - position(a)`: when the pair
    /// straddles the periodic box boundary it is the wrapped vector.
    pub displacement: Vec3,

    /// Hop rate a → b.
    pub rate_ab: f64,

    /// Hop rate b → a.
    pub rate_ba: f64,
}

/// Anything that can produce site and pair records.
pub trait GraphSource {
    /// Human-readable description for logs.
    fn describe(&self) -> String;

    /// All site records, in the order they should be indexed.
    fn node_records(&self) -> Result<Vec<NodeRecord>, LoadError>;

    /// All pair records, in the order edges should be indexed.
    fn pair_records(&self) -> Result<Vec<PairRecord>, LoadError>;
}

/// A source backed by records already in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    nodes: Vec<NodeRecord>,
    pairs: Vec<PairRecord>,
}

impl InMemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source from existing record lists.
    pub fn from_records(nodes: Vec<NodeRecord>, pairs: Vec<PairRecord>) -> Self {
        Self { nodes, pairs }
    }

    /// Add a site.
    pub fn with_node(mut self, id: u64, position: Vec3) -> Self {
        self.nodes.push(NodeRecord {
            id: NodeId(id),
            position,
        });
        self
    }

    /// Add a pair with independent forward and backward rates.
    pub fn with_pair(
        mut self,
        a: u64,
        b: u64,
        displacement: Vec3,
        rate_ab: f64,
        rate_ba: f64,
    ) -> Self {
        self.pairs.push(PairRecord {
            a: NodeId(a),
            b: NodeId(b),
            displacement,
            rate_ab,
            rate_ba,
        });
        self
    }
}

impl GraphSource for InMemorySource {
    fn describe(&self) -> String {
        format!(
            "in-memory ({} nodes, {} pairs)",
            self.nodes.len(),
            self.pairs.len()
        )
    }

    fn node_records(&self) -> Result<Vec<NodeRecord>, LoadError> {
        Ok(self.nodes.clone())
    }

    fn pair_records(&self) -> Result<Vec<PairRecord>, LoadError> {
        Ok(self.pairs.clone())
    }
}
