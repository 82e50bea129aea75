//! KMC Simulator
//!
//! Scenario runner built on top of the VSSM scheduler. Reads a network and a
//! scenario from TOML, runs independent replicas in parallel, and reports
//! transport metrics.
//!
//! # Architecture
//!
//! The simulator builds on `kmc-simulation` to provide:
//!
//! - **Network files**: TOML site/pair lists and a periodic lattice generator
//! - **Scenarios**: run parameters, carrier seeds, and replica count
//! - **Replicas**: `seed + i` runs over one shared graph, fanned out with rayon
//! - **Metrics**: drift velocity, mobility, hop-count percentiles
//! - **Trajectories**: JSON-lines snapshots of the first replica
//!
//! # Example
//!
//! ```ignore
//! use kmc_simulator::{Simulator, SimulatorConfig};
//!
//! let config = SimulatorConfig::load("demos/scenario.toml")?;
//! let simulator = Simulator::load(config)?;
//! let report = simulator.run()?;
//!
//! println!("Mobility: {:?}", report.mobility());
//! ```

pub mod config;
pub mod error;
pub mod network;
pub mod report;
pub mod runner;
pub mod trajectory;

pub use config::SimulatorConfig;
pub use error::SimulatorError;
pub use network::{LatticeSpec, NetworkFile, TomlNetworkSource};
pub use report::{ReplicaReport, TransportReport};
pub use runner::Simulator;
pub use trajectory::JsonLinesSink;
