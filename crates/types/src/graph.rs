//! The static site graph.
//!
//! A [`Graph`] is loaded once per frame and never mutated afterwards. Nodes
//! live in an arena addressed by [`NodeIndex`]; a side table maps the
//! external [`NodeId`] to its index so lookups by id are O(1) while ids
//! stay exactly as the source wrote them.
//!
//! Every pair record becomes one [`Edge`] plus two directional [`Hop`]s, one
//! in each endpoint's outgoing list. Hops carry a copy of the rate and the
//! signed displacement so the scheduler never has to consult the edge to
//! enumerate moves.

use crate::{EdgeIndex, GraphError, GraphSource, LoadError, NodeId, NodeIndex, PairRecord, Vec3};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::info;

/// One direction of travel along an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hop {
    /// The edge this hop belongs to.
    pub edge: EdgeIndex,

    /// Destination node.
    pub to: NodeIndex,

    /// Minimum-image displacement from the hop's source to `to`.
    pub displacement: Vec3,

    /// Base hop rate in this direction.
    pub rate: f64,
}

/// A hopping site.
#[derive(Debug, Clone)]
pub struct Node {
    /// Stable external id.
    pub id: NodeId,

    /// Position in simulation length units.
    pub position: Vec3,

    /// Outgoing hops, in pair-load order.
    hops: Vec<Hop>,
}

impl Node {
    fn new(id: NodeId, position: Vec3) -> Self {
        Self {
            id,
            position,
            hops: Vec::new(),
        }
    }

    /// Outgoing hops from this node.
    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    /// Number of neighbours.
    pub fn degree(&self) -> usize {
        self.hops.len()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} with {} neighbours",
            self.id,
            self.position,
            self.hops.len()
        )
    }
}

/// An undirected neighbour relation with two directional rates.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub a: NodeIndex,
    pub b: NodeIndex,

    /// Minimum-image displacement from `a` to `b`.
    pub displacement: Vec3,

    /// Rate a → b.
    pub rate_ab: f64,

    /// Rate b → a.
    pub rate_ba: f64,
}

impl Edge {
    /// The other endpoint, or `None` if `from` is not on this edge.
    pub fn opposite(&self, from: NodeIndex) -> Option<NodeIndex> {
        if from == self.a {
            Some(self.b)
        } else if from == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// Displacement when travelling away from `from`.
    pub fn displacement_from(&self, from: NodeIndex) -> Option<Vec3> {
        if from == self.a {
            Some(self.displacement)
        } else if from == self.b {
            Some(-self.displacement)
        } else {
            None
        }
    }
}

/// Counts describing a loaded graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub mean_degree: f64,
    pub max_degree: usize,
}

/// The site network for one frame.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index: HashMap<NodeId, NodeIndex>,
    pairs_seen: HashSet<(NodeId, NodeId)>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate a graph from a source.
    ///
    /// Fails on the first malformed record; nothing partial is returned.
    pub fn load(source: &impl GraphSource) -> Result<Self, LoadError> {
        let mut graph = Graph::new();

        for record in source.node_records()? {
            graph.add_node(record.id, record.position)?;
        }

        for record in source.pair_records()? {
            graph.add_pair(&record)?;
        }

        let summary = graph.summary();
        info!(
            source = %source.describe(),
            nodes = summary.nodes,
            edges = summary.edges,
            mean_degree = summary.mean_degree,
            "Loaded graph"
        );

        Ok(graph)
    }

    /// Register a fresh node and return it for further set-up.
    ///
    /// Only meant for use while a graph is being built.
    pub fn add_node(&mut self, id: NodeId, position: Vec3) -> Result<&mut Node, LoadError> {
        if !position.is_finite() {
            return Err(LoadError::InvalidGeometry(id));
        }
        if self.index.contains_key(&id) {
            return Err(LoadError::DuplicateNode(id));
        }

        let index = NodeIndex(self.nodes.len() as u32);
        self.index.insert(id, index);
        self.nodes.push(Node::new(id, position));
        Ok(&mut self.nodes[index.get()])
    }

    /// Register a neighbour pair, creating the edge and both hops.
    pub fn add_pair(&mut self, record: &PairRecord) -> Result<EdgeIndex, LoadError> {
        let (a_id, b_id) = (record.a, record.b);

        if a_id == b_id {
            return Err(LoadError::SelfLoop(a_id));
        }
        let valid_rate = |r: f64| r.is_finite() && r >= 0.0;
        if !valid_rate(record.rate_ab) || !valid_rate(record.rate_ba) {
            return Err(LoadError::InvalidRate { a: a_id, b: b_id });
        }
        if !record.displacement.is_finite() {
            return Err(LoadError::InvalidGeometry(a_id));
        }

        let missing = |missing| LoadError::MissingNode {
            a: a_id,
            b: b_id,
            missing,
        };
        let a = *self.index.get(&a_id).ok_or_else(|| missing(a_id))?;
        let b = *self.index.get(&b_id).ok_or_else(|| missing(b_id))?;

        let key = if a_id < b_id { (a_id, b_id) } else { (b_id, a_id) };
        if !self.pairs_seen.insert(key) {
            return Err(LoadError::DuplicatePair { a: a_id, b: b_id });
        }

        let edge = EdgeIndex(self.edges.len() as u32);
        self.edges.push(Edge {
            a,
            b,
            displacement: record.displacement,
            rate_ab: record.rate_ab,
            rate_ba: record.rate_ba,
        });

        self.nodes[a.get()].hops.push(Hop {
            edge,
            to: b,
            displacement: record.displacement,
            rate: record.rate_ab,
        });
        self.nodes[b.get()].hops.push(Hop {
            edge,
            to: a,
            displacement: -record.displacement,
            rate: record.rate_ba,
        });

        Ok(edge)
    }

    /// Look up a node by external id.
    pub fn get_node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.index_of(id).map(|index| &self.nodes[index.get()])
    }

    /// Resolve an external id to its arena index.
    pub fn index_of(&self, id: NodeId) -> Result<NodeIndex, GraphError> {
        self.index.get(&id).copied().ok_or(GraphError::NotFound(id))
    }

    /// Node at an arena index.
    ///
    /// # Panics
    ///
    /// Panics if `index` was not issued by this graph.
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.get()]
    }

    /// Outgoing hops of the node at `index`.
    pub fn hops(&self, index: NodeIndex) -> &[Hop] {
        self.nodes[index.get()].hops()
    }

    /// Edge at an arena index.
    pub fn edge(&self, index: EdgeIndex) -> &Edge {
        &self.edges[index.get()]
    }

    /// All nodes in index order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges in index order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Iterate over `(index, node)` pairs.
    pub fn indexed_nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeIndex(i as u32), node))
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if no nodes were loaded.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Size and connectivity counts.
    pub fn summary(&self) -> GraphSummary {
        let max_degree = self.nodes.iter().map(Node::degree).max().unwrap_or(0);
        let mean_degree = if self.nodes.is_empty() {
            0.0
        } else {
            2.0 * self.edges.len() as f64 / self.nodes.len() as f64
        };
        GraphSummary {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            mean_degree,
            max_degree,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemorySource;

    fn triangle() -> InMemorySource {
        InMemorySource::new()
            .with_node(10, Vec3::new(0.0, 0.0, 0.0))
            .with_node(20, Vec3::new(1.0, 0.0, 0.0))
            .with_node(30, Vec3::new(0.0, 1.0, 0.0))
            .with_pair(10, 20, Vec3::new(1.0, 0.0, 0.0), 1.0, 2.0)
            .with_pair(20, 30, Vec3::new(-1.0, 1.0, 0.0), 3.0, 4.0)
    }

    #[test]
    fn test_load_builds_both_hop_directions() {
        let graph = Graph::load(&triangle()).unwrap();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.edge_count(), 2);

        let a = graph.index_of(NodeId(10)).unwrap();
        let b = graph.index_of(NodeId(20)).unwrap();

        let forward = graph.hops(a);
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].to, b);
        assert_eq!(forward[0].rate, 1.0);
        assert_eq!(forward[0].displacement, Vec3::new(1.0, 0.0, 0.0));

        let backward: Vec<_> = graph.hops(b).iter().filter(|h| h.to == a).collect();
        assert_eq!(backward.len(), 1);
        assert_eq!(backward[0].rate, 2.0);
        assert_eq!(backward[0].displacement, Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ids_are_preserved_and_indexed() {
        let graph = Graph::load(&triangle()).unwrap();
        for (index, node) in graph.indexed_nodes() {
            assert_eq!(graph.index_of(node.id).unwrap(), index);
            assert_eq!(graph.get_node(node.id).unwrap().id, node.id);
        }
        assert_eq!(graph.node(NodeIndex(2)).id, NodeId(30));
    }

    #[test]
    fn test_get_node_not_found() {
        let graph = Graph::load(&triangle()).unwrap();
        assert_eq!(
            graph.get_node(NodeId(99)).unwrap_err(),
            GraphError::NotFound(NodeId(99))
        );
    }

    #[test]
    fn test_missing_node_is_load_error() {
        let source = triangle().with_pair(10, 40, Vec3::ZERO, 1.0, 1.0);
        let err = Graph::load(&source).unwrap_err();
        assert_eq!(
            err,
            LoadError::MissingNode {
                a: NodeId(10),
                b: NodeId(40),
                missing: NodeId(40),
            }
        );
    }

    #[test]
    fn test_duplicate_records_rejected() {
        let dup_node = triangle().with_node(20, Vec3::ZERO);
        assert_eq!(
            Graph::load(&dup_node).unwrap_err(),
            LoadError::DuplicateNode(NodeId(20))
        );

        // Reversed orientation is still the same pair.
        let dup_pair = triangle().with_pair(20, 10, Vec3::ZERO, 1.0, 1.0);
        assert!(matches!(
            Graph::load(&dup_pair).unwrap_err(),
            LoadError::DuplicatePair { .. }
        ));
    }

    #[test]
    fn test_invalid_pairs_rejected() {
        let self_loop = triangle().with_pair(30, 30, Vec3::ZERO, 1.0, 1.0);
        assert_eq!(
            Graph::load(&self_loop).unwrap_err(),
            LoadError::SelfLoop(NodeId(30))
        );

        let negative = triangle().with_pair(10, 30, Vec3::ZERO, -1.0, 1.0);
        assert!(matches!(
            Graph::load(&negative).unwrap_err(),
            LoadError::InvalidRate { .. }
        ));

        let nan = triangle().with_pair(10, 30, Vec3::ZERO, 1.0, f64::NAN);
        assert!(matches!(
            Graph::load(&nan).unwrap_err(),
            LoadError::InvalidRate { .. }
        ));
    }

    #[test]
    fn test_edge_opposite_and_displacement() {
        let graph = Graph::load(&triangle()).unwrap();
        let edge = graph.edge(EdgeIndex(1));
        let b = graph.index_of(NodeId(20)).unwrap();
        let c = graph.index_of(NodeId(30)).unwrap();
        let a = graph.index_of(NodeId(10)).unwrap();

        assert_eq!(edge.opposite(b), Some(c));
        assert_eq!(edge.opposite(c), Some(b));
        assert_eq!(edge.opposite(a), None);
        assert_eq!(edge.displacement_from(c), Some(Vec3::new(1.0, -1.0, 0.0)));
    }

    #[test]
    fn test_summary() {
        let graph = Graph::load(&triangle()).unwrap();
        let summary = graph.summary();
        assert_eq!(summary.nodes, 3);
        assert_eq!(summary.edges, 2);
        assert_eq!(summary.max_degree, 2);
        assert!((summary.mean_degree - 4.0 / 3.0).abs() < 1e-12);

        let empty = Graph::new().summary();
        assert_eq!(empty.mean_degree, 0.0);
    }
}
