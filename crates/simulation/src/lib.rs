//! Deterministic kinetic Monte Carlo scheduler.
//!
//! This crate drives carriers over a site graph with the variable step size
//! method. Given the same graph, configuration, and seed, it produces
//! identical results every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                        Vssm                             │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     EnabledEvents (slots + cumulative-rate tree)   │ │
//! │  │     R = total rate, select by u·R                  │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Event::execute(&mut State)                     │ │
//! │  │     Stale → drop and reselect                      │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Refresh events around the touched nodes        │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod config;
mod enabled;
mod error;
mod placement;
mod rate_tree;
mod runner;
mod trajectory;

pub use config::{CarrierSeed, Placement, RunConfig, TransitionBinding, ROOM_TEMPERATURE_KT};
pub use enabled::EnabledEvents;
pub use error::SimulationError;
pub use placement::seed_carriers;
pub use runner::{
    RunOutcome, SchedulerPhase, SimulationStats, StepOutcome, StepRecord, Termination, Vssm,
};
pub use trajectory::{CarrierSnapshot, NullSink, RecordingSink, Snapshot, TrajectorySink};
