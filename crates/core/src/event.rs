//! Candidate transitions and the registry that constructs them.
//!
//! An [`Event`] is one carrier hopping along one outgoing edge of the node it
//! occupies. It is a plain value: the enabled-event set stores events
//! inline and iterates them without dynamic dispatch. Transition kinds are
//! an enum; the [`EventRegistry`] maps configuration names onto
//! constructors for them.

use crate::{EventError, RegistryError, State};
use indexmap::IndexMap;
use kmc_types::{CarrierId, EdgeIndex, Hop, NodeIndex, Vec3};
use std::fmt;

/// The physical kind of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    ElectronTransfer,
    HoleTransfer,
}

impl TransitionKind {
    pub fn name(self) -> &'static str {
        match self {
            TransitionKind::ElectronTransfer => "electron_transfer",
            TransitionKind::HoleTransfer => "hole_transfer",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of an event.
///
/// A carrier occupies one node at a time, so the edge alone fixes the
/// direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub carrier: CarrierId,
    pub edge: EdgeIndex,
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.carrier, self.edge)
    }
}

/// What an event needs to know before its kind is chosen.
#[derive(Debug, Clone, Copy)]
pub struct EventTemplate {
    pub carrier: CarrierId,
    pub from: NodeIndex,
    pub hop: Hop,

    /// Effective rate, already passed through the rate model.
    pub rate: f64,
}

/// A candidate hop of one carrier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub kind: TransitionKind,
    pub carrier: CarrierId,
    pub from: NodeIndex,
    pub to: NodeIndex,
    pub edge: EdgeIndex,

    /// Minimum-image displacement of the hop.
    pub displacement: Vec3,

    rate: f64,
}

/// Nodes whose neighbourhoods changed when an event executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Touched {
    /// The node the carrier left.
    pub vacated: NodeIndex,

    /// The node the carrier arrived on.
    pub occupied: NodeIndex,
}

impl Touched {
    pub fn nodes(&self) -> [NodeIndex; 2] {
        [self.vacated, self.occupied]
    }
}

impl Event {
    /// Build an event of `kind` from a template.
    pub fn from_template(kind: TransitionKind, template: EventTemplate) -> Self {
        Self {
            kind,
            carrier: template.carrier,
            from: template.from,
            to: template.hop.to,
            edge: template.hop.edge,
            displacement: template.hop.displacement,
            rate: template.rate,
        }
    }

    pub fn key(&self) -> EventKey {
        EventKey {
            carrier: self.carrier,
            edge: self.edge,
        }
    }

    /// Effective rate.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Check that the hop can still be applied to `state`.
    pub fn check(&self, state: &State) -> Result<(), EventError> {
        let on_source = state
            .carrier(self.carrier)
            .is_some_and(|c| c.node() == Some(self.from));
        if !on_source {
            return Err(EventError::Displaced {
                carrier: self.carrier,
                expected: self.from,
            });
        }

        if let Some(occupant) = state.occupant(self.to) {
            return Err(EventError::Stale {
                carrier: self.carrier,
                destination: self.to,
                occupant,
            });
        }
        Ok(())
    }

    /// Apply the hop to `state`.
    ///
    /// Fails without touching `state` if the carrier has moved or the
    /// destination has been taken.
    pub fn execute(&self, state: &mut State) -> Result<Touched, EventError> {
        self.check(state)?;
        state.relocate(self.carrier, self.to, self.displacement);

        Ok(Touched {
            vacated: self.from,
            occupied: self.to,
        })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}: {} → {}, k={:.3e})",
            self.kind, self.carrier, self.from, self.to, self.rate
        )
    }
}

/// Builds an event from a template.
pub type EventConstructor = fn(EventTemplate) -> Event;

/// String-keyed table of event constructors.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    constructors: IndexMap<String, EventConstructor>,
}

impl EventRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `electron_transfer` and `hole_transfer` registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TransitionKind::ElectronTransfer.name(), |t| {
            Event::from_template(TransitionKind::ElectronTransfer, t)
        });
        registry.register(TransitionKind::HoleTransfer.name(), |t| {
            Event::from_template(TransitionKind::HoleTransfer, t)
        });
        registry
    }

    /// Register a constructor, replacing any previous one under `name`.
    pub fn register(&mut self, name: impl Into<String>, constructor: EventConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    /// Look up the constructor registered under `name`.
    pub fn constructor(&self, name: &str) -> Result<EventConstructor, RegistryError> {
        self.constructors
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownType {
                registry: "event",
                name: name.to_string(),
            })
    }

    /// Construct an event of the named kind.
    pub fn create(&self, name: &str, template: EventTemplate) -> Result<Event, RegistryError> {
        self.constructor(name).map(|constructor| constructor(template))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}
