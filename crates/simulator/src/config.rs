//! Configuration types for the simulator.

use crate::SimulatorError;
use kmc_simulation::RunConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A scenario: which network, how many replicas, and the run parameters
/// every replica shares.
///
/// ```toml
/// network = "network.toml"
/// replicas = 4
///
/// [run]
/// runtime = 100.0
/// seed = 42
/// field = { x = 0.01, y = 0.0, z = 0.0 }
///
/// [[run.carriers]]
/// species = "electron"
/// mode = "random"
/// count = 20
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Network file. Relative paths in a scenario file are resolved against
    /// the scenario's directory.
    pub network: Option<PathBuf>,

    /// Number of independent replicas.
    pub replicas: usize,

    /// Parameters shared by every replica.
    pub run: RunConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            network: None,
            replicas: 1,
            run: RunConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Create a new simulator configuration.
    pub fn new(run: RunConfig) -> Self {
        Self {
            run,
            ..Default::default()
        }
    }

    /// Parse a scenario from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read a scenario file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimulatorError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SimulatorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text).map_err(|source| SimulatorError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let (Some(network), Some(dir)) = (&config.network, path.parent()) {
            if network.is_relative() {
                config.network = Some(dir.join(network));
            }
        }
        Ok(config)
    }

    /// Set the network file.
    pub fn with_network(mut self, network: impl Into<PathBuf>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Set the number of replicas.
    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    /// Set the base random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.run.seed = seed;
        self
    }

    /// Set the runtime bound.
    pub fn with_runtime(mut self, runtime: f64) -> Self {
        self.run.runtime = runtime;
        self
    }

    /// Set the step bound.
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.run.max_steps = Some(max_steps);
        self
    }

    /// Seed of replica `i`.
    pub fn replica_seed(&self, replica: usize) -> u64 {
        self.run.seed.wrapping_add(replica as u64)
    }

    pub fn validate(&self) -> Result<(), SimulatorError> {
        if self.replicas == 0 {
            return Err(SimulatorError::InvalidConfig(
                "at least one replica is required".to_string(),
            ));
        }
        self.run.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmc_core::CarrierKind;
    use kmc_simulation::{CarrierSeed, Placement};
    use kmc_types::{NodeId, Vec3};

    const SCENARIO: &str = r#"
network = "lattice.toml"
replicas = 3

[run]
runtime = 25.0
seed = 9
field = { x = 0.01, y = 0.0, z = 0.0 }
thermal_energy = 0.025
output_interval = 5.0

[[run.carriers]]
species = "electron"
mode = "random"
count = 4

[[run.carriers]]
species = "hole"
mode = "sites"
sites = [0, 7]

[[run.transitions]]
carrier = "electron"
event = "electron_transfer"
"#;

    #[test]
    fn test_parse_scenario() {
        let config = SimulatorConfig::from_toml_str(SCENARIO).unwrap();

        assert_eq!(config.network, Some(PathBuf::from("lattice.toml")));
        assert_eq!(config.replicas, 3);
        assert_eq!(config.run.runtime, 25.0);
        assert_eq!(config.run.seed, 9);
        assert_eq!(config.run.field, Vec3::new(0.01, 0.0, 0.0));
        assert_eq!(config.run.output_interval, Some(5.0));
        assert_eq!(config.run.max_steps, None);

        assert_eq!(config.run.carriers[0], CarrierSeed::random("electron", 4));
        assert_eq!(
            config.run.carriers[1].placement,
            Placement::Sites {
                sites: vec![NodeId(0), NodeId(7)]
            }
        );
        assert_eq!(config.run.transitions.len(), 1);
        assert_eq!(config.run.transitions[0].carrier, CarrierKind::Electron);
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = SimulatorConfig::from_toml_str("[run]\nruntime = 3.0\n").unwrap();
        assert_eq!(config.replicas, 1);
        assert_eq!(config.network, None);
        assert_eq!(config.run.runtime, 3.0);
        assert_eq!(config.run.seed, RunConfig::default().seed);
        assert_eq!(config.run.transitions.len(), 2);
    }

    #[test]
    fn test_overrides_and_replica_seeds() {
        let config = SimulatorConfig::default()
            .with_seed(u64::MAX)
            .with_runtime(2.0)
            .with_max_steps(10)
            .with_replicas(2)
            .with_network("net.toml");

        assert_eq!(config.run.runtime, 2.0);
        assert_eq!(config.run.max_steps, Some(10));
        assert_eq!(config.replica_seed(0), u64::MAX);
        assert_eq!(config.replica_seed(1), 0);
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            SimulatorConfig::default().with_replicas(0).validate(),
            Err(SimulatorError::InvalidConfig(_))
        ));
        assert!(matches!(
            SimulatorConfig::default().with_runtime(-1.0).validate(),
            Err(SimulatorError::Simulation(_))
        ));
    }

    #[test]
    fn test_load_resolves_network_relative_to_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        std::fs::write(&path, SCENARIO).unwrap();

        let config = SimulatorConfig::load(&path).unwrap();
        assert_eq!(config.network, Some(dir.path().join("lattice.toml")));
    }

    #[test]
    fn test_load_errors_name_the_file() {
        let err = SimulatorConfig::load("/nonexistent/scenario.toml").unwrap_err();
        assert!(matches!(err, SimulatorError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/scenario.toml"));

        assert!(SimulatorConfig::from_toml_str("replicas = \"many\"").is_err());
    }
}
