//! Core types for hopping-transport kinetic Monte Carlo.
//!
//! This crate holds the read-only side of a simulation: identifiers, 3D
//! vectors, and the per-frame site [`Graph`] together with the
//! [`GraphSource`] interface it is loaded through.

mod error;
mod graph;
mod identifiers;
mod source;
mod vector;

pub use error::{GraphError, LoadError};
pub use graph::{Edge, Graph, GraphSummary, Hop, Node};
pub use identifiers::{CarrierId, EdgeIndex, NodeId, NodeIndex};
pub use source::{GraphSource, InMemorySource, NodeRecord, PairRecord};
pub use vector::Vec3;
