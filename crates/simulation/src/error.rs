//! Error types for setting up and driving a simulation.

use kmc_core::{CarrierKind, RegistryError, StateError};
use kmc_types::{CarrierId, EdgeIndex, GraphError, LoadError};
use thiserror::Error;

/// Fatal simulation errors.
///
/// Recoverable conditions (stale events, a stalled network) never surface
/// here; the scheduler handles them in its loop.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The graph could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A node id was not found in the graph.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// An unregistered carrier or event type was requested.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An occupancy mutation was rejected.
    #[error(transparent)]
    State(#[from] StateError),

    /// A live carrier's species has no event kind bound to it.
    #[error("no transition bound for {0} carriers")]
    UnboundCarrier(CarrierKind),

    /// The rate model produced a negative or non-finite rate.
    #[error("rate model gave {rate} for {carrier} along {edge}")]
    InvalidRate {
        carrier: CarrierId,
        edge: EdgeIndex,
        rate: f64,
    },

    /// Random placement asked for more carriers than free nodes.
    #[error("cannot place {requested} carriers on {free} free nodes")]
    NotEnoughSites { requested: usize, free: usize },

    /// The run configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The incrementally maintained event set differs from a full rebuild.
    #[error("enabled events diverged from rebuild: {0}")]
    Diverged(String),
}
