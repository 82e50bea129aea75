//! Error types for carriers, events, and state mutation.

use kmc_types::{CarrierId, NodeIndex};
use thiserror::Error;

/// A registry lookup failed.
///
/// Always a configuration bug; the run cannot start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Nothing is registered under this name.
    #[error("unknown {registry} type '{name}'")]
    UnknownType {
        /// Which registry was consulted (`"carrier"` or `"event"`).
        registry: &'static str,
        name: String,
    },
}

/// An occupancy-table mutation was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The node already holds a carrier.
    #[error("node {node} is already occupied by {occupant}")]
    Occupied { node: NodeIndex, occupant: CarrierId },

    /// The carrier is not in the live roster.
    #[error("{0} is not a live carrier")]
    UnknownCarrier(CarrierId),

    /// The carrier is already sitting on a node.
    #[error("{0} is already placed")]
    AlreadyPlaced(CarrierId),

    /// The node index is outside the state's node table.
    #[error("node {0} is out of range")]
    NodeOutOfRange(NodeIndex),

    /// The occupancy tables disagree with each other.
    #[error("occupancy tables inconsistent: {0}")]
    Inconsistent(String),
}

/// A selected event could not be applied.
///
/// Both variants are recoverable: the scheduler drops the event and
/// selects again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// The destination was taken since the event was enabled.
    #[error("{carrier} cannot hop to {destination}: occupied by {occupant}")]
    Stale {
        carrier: CarrierId,
        destination: NodeIndex,
        occupant: CarrierId,
    },

    /// The carrier is gone or no longer on the event's source node.
    #[error("{carrier} is no longer on {expected}")]
    Displaced {
        carrier: CarrierId,
        expected: NodeIndex,
    },
}
