//! Mobile charge carriers and the registry that constructs them.

use crate::RegistryError;
use indexmap::IndexMap;
use kmc_types::{CarrierId, NodeIndex, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Carrier species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarrierKind {
    Electron,
    Hole,
}

impl CarrierKind {
    /// Charge in units of the elementary charge.
    pub fn charge(self) -> f64 {
        match self {
            CarrierKind::Electron => -1.0,
            CarrierKind::Hole => 1.0,
        }
    }

    /// Registry name of the species.
    pub fn name(self) -> &'static str {
        match self {
            CarrierKind::Electron => "electron",
            CarrierKind::Hole => "hole",
        }
    }
}

impl fmt::Display for CarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A carrier in the simulation.
///
/// The carrier refers to its site by index only; the [`State`](crate::State)
/// occupancy table is the authority on who sits where.
#[derive(Debug, Clone, PartialEq)]
pub struct Carrier {
    id: CarrierId,
    kind: CarrierKind,
    node: Option<NodeIndex>,

    /// Unwrapped displacement since creation.
    displacement: Vec3,

    /// Simulation time at creation.
    created_at: f64,

    hops: u64,
}

impl Carrier {
    /// Create an unplaced carrier.
    pub fn new(id: CarrierId, kind: CarrierKind, created_at: f64) -> Self {
        Self {
            id,
            kind,
            node: None,
            displacement: Vec3::ZERO,
            created_at,
            hops: 0,
        }
    }

    pub fn id(&self) -> CarrierId {
        self.id
    }

    pub fn kind(&self) -> CarrierKind {
        self.kind
    }

    /// Charge in units of the elementary charge.
    pub fn charge(&self) -> f64 {
        self.kind.charge()
    }

    /// The occupied node, if placed.
    pub fn node(&self) -> Option<NodeIndex> {
        self.node
    }

    /// Cumulative displacement, unwrapped across periodic boundaries.
    pub fn displacement(&self) -> Vec3 {
        self.displacement
    }

    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    /// Number of hops performed.
    pub fn hop_count(&self) -> u64 {
        self.hops
    }

    /// Add one hop's minimum-image displacement to the history.
    pub fn record_hop(&mut self, displacement: Vec3) {
        self.displacement += displacement;
        self.hops += 1;
    }

    pub(crate) fn set_node(&mut self, node: Option<NodeIndex>) {
        self.node = node;
    }
}

/// Builds a carrier of one species.
pub type CarrierConstructor = fn(CarrierId, f64) -> Carrier;

/// String-keyed table of carrier constructors.
///
/// Constructed explicitly and handed to whatever creates carriers, so two
/// simulations never share registration state.
#[derive(Debug, Clone, Default)]
pub struct CarrierRegistry {
    constructors: IndexMap<String, CarrierConstructor>,
}

impl CarrierRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `electron` and `hole` registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("electron", |id, t| Carrier::new(id, CarrierKind::Electron, t));
        registry.register("hole", |id, t| Carrier::new(id, CarrierKind::Hole, t));
        registry
    }

    /// Register a constructor, replacing any previous one under `name`.
    pub fn register(&mut self, name: impl Into<String>, constructor: CarrierConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    /// Construct a carrier of the named species.
    pub fn create(
        &self,
        name: &str,
        id: CarrierId,
        created_at: f64,
    ) -> Result<Carrier, RegistryError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| RegistryError::UnknownType {
                registry: "carrier",
                name: name.to_string(),
            })?;
        Ok(constructor(id, created_at))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}
