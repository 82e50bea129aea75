//! Carriers, transition events, and the occupancy state.
//!
//! This crate is the mutable half of a hopping-transport simulation:
//!
//! - [`Carrier`] / [`CarrierRegistry`]: typed mobile occupants and their
//!   string-keyed constructors
//! - [`Event`] / [`EventRegistry`]: candidate hops and their constructors
//! - [`RateModel`]: the injected law turning base rates into event rates
//! - [`State`]: which carrier occupies which node
//!
//! Registries are ordinary values. Build one per simulation and pass it in.

mod carrier;
mod error;
mod event;
mod rate;
mod state;

pub use carrier::{Carrier, CarrierConstructor, CarrierKind, CarrierRegistry};
pub use error::{EventError, RegistryError, StateError};
pub use event::{
    Event, EventConstructor, EventKey, EventRegistry, EventTemplate, Touched, TransitionKind,
};
pub use rate::{FieldBias, RateModel, Unbiased};
pub use state::State;
