//! Errors from loading scenarios and running replicas.

use kmc_simulation::SimulationError;
use kmc_types::LoadError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// The scenario names no network file and none was given.
    #[error("no network file given")]
    MissingNetwork,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to write trajectory: {0}")]
    Trajectory(#[source] std::io::Error),

    #[error("hop histogram: {0}")]
    Histogram(String),
}
