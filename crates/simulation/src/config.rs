//! Configuration types for a simulation run.

use crate::SimulationError;
use kmc_core::{CarrierKind, TransitionKind};
use kmc_types::{NodeId, Vec3};
use serde::{Deserialize, Serialize};

/// kT at 300 K in eV.
pub const ROOM_TEMPERATURE_KT: f64 = 0.025_852;

/// Configuration for one run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Stop once the clock would pass this time.
    pub runtime: f64,

    /// Random seed for deterministic simulation.
    pub seed: u64,

    /// Carriers to create before the run starts.
    pub carriers: Vec<CarrierSeed>,

    /// Uniform applied field.
    pub field: Vec3,

    /// Thermal energy scale for the field bias.
    pub thermal_energy: f64,

    /// Simulated time between trajectory snapshots.
    ///
    /// `None` disables snapshots.
    pub output_interval: Option<f64>,

    /// Stop after this many executed events.
    pub max_steps: Option<u64>,

    /// Which event kind each carrier species hops with.
    pub transitions: Vec<TransitionBinding>,
}

impl RunConfig {
    /// Create a configuration with the given runtime and defaults elsewhere.
    pub fn new(runtime: f64) -> Self {
        Self {
            runtime,
            ..Default::default()
        }
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replace the carrier seeds.
    pub fn with_carriers(mut self, carriers: Vec<CarrierSeed>) -> Self {
        self.carriers = carriers;
        self
    }

    /// Append a carrier seed.
    pub fn with_carrier(mut self, seed: CarrierSeed) -> Self {
        self.carriers.push(seed);
        self
    }

    /// Set the applied field.
    pub fn with_field(mut self, field: Vec3) -> Self {
        self.field = field;
        self
    }

    /// Set the thermal energy.
    pub fn with_thermal_energy(mut self, thermal_energy: f64) -> Self {
        self.thermal_energy = thermal_energy;
        self
    }

    /// Set the snapshot interval.
    pub fn with_output_interval(mut self, interval: f64) -> Self {
        self.output_interval = Some(interval);
        self
    }

    /// Set the step bound.
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Bind a carrier species to an event kind name.
    ///
    /// Replaces an existing binding for the same species.
    pub fn with_transition(mut self, carrier: CarrierKind, event: impl Into<String>) -> Self {
        let event = event.into();
        match self.transitions.iter_mut().find(|b| b.carrier == carrier) {
            Some(binding) => binding.event = event,
            None => self.transitions.push(TransitionBinding { carrier, event }),
        }
        self
    }

    /// Total number of carriers the seeds will create.
    pub fn total_carriers(&self) -> usize {
        self.carriers.iter().map(CarrierSeed::count).sum()
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let invalid = |msg: String| Err(SimulationError::InvalidConfig(msg));

        if !(self.runtime > 0.0 && self.runtime.is_finite()) {
            return invalid(format!("runtime must be positive, got {}", self.runtime));
        }
        if !(self.thermal_energy > 0.0 && self.thermal_energy.is_finite()) {
            return invalid(format!(
                "thermal energy must be positive, got {}",
                self.thermal_energy
            ));
        }
        if !self.field.is_finite() {
            return invalid("field has non-finite components".to_string());
        }
        if let Some(interval) = self.output_interval {
            if !(interval > 0.0 && interval.is_finite()) {
                return invalid(format!("output interval must be positive, got {interval}"));
            }
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            runtime: 1.0,
            seed: 12345,
            carriers: vec![CarrierSeed::random("electron", 1)],
            field: Vec3::ZERO,
            thermal_energy: ROOM_TEMPERATURE_KT,
            output_interval: None,
            max_steps: None,
            transitions: TransitionBinding::defaults(),
        }
    }
}

/// Which event kind a carrier species hops with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionBinding {
    pub carrier: CarrierKind,

    /// Name in the event registry.
    pub event: String,
}

impl TransitionBinding {
    /// Electrons hop by electron transfer, holes by hole transfer.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                carrier: CarrierKind::Electron,
                event: TransitionKind::ElectronTransfer.name().to_string(),
            },
            Self {
                carrier: CarrierKind::Hole,
                event: TransitionKind::HoleTransfer.name().to_string(),
            },
        ]
    }
}

/// How to place the carriers of one seed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Placement {
    /// On uniformly random free nodes.
    Random { count: usize },

    /// On exactly these nodes.
    Sites { sites: Vec<NodeId> },
}

/// A group of carriers to create before the run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierSeed {
    /// Name in the carrier registry.
    pub species: String,

    #[serde(flatten)]
    pub placement: Placement,
}

impl CarrierSeed {
    /// `count` carriers on random free nodes.
    pub fn random(species: impl Into<String>, count: usize) -> Self {
        Self {
            species: species.into(),
            placement: Placement::Random { count },
        }
    }

    /// One carrier on each listed node.
    pub fn at(species: impl Into<String>, sites: impl IntoIterator<Item = u64>) -> Self {
        Self {
            species: species.into(),
            placement: Placement::Sites {
                sites: sites.into_iter().map(NodeId).collect(),
            },
        }
    }

    /// Number of carriers this seed creates.
    pub fn count(&self) -> usize {
        match &self.placement {
            Placement::Random { count } => *count,
            Placement::Sites { sites } => sites.len(),
        }
    }
}
