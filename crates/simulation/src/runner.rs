//! The variable step size method (VSSM) scheduler.
//!
//! Each step samples *when* the next hop happens from the total enabled rate
//! and *which* hop it is from the cumulative-rate index, applies it, and then
//! refreshes only the events around the two nodes the hop touched.

use crate::placement::seed_carriers;
use crate::trajectory::{NullSink, Snapshot, TrajectorySink};
use crate::{EnabledEvents, RunConfig, SimulationError};
use kmc_core::{
    Carrier, CarrierKind, CarrierRegistry, Event, EventConstructor, EventError, EventRegistry,
    EventTemplate, FieldBias, RateModel, State,
};
use kmc_types::{CarrierId, EdgeIndex, Graph, GraphError, Hop, NodeId, NodeIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// RNG stream that drives waiting times and event selection.
const SCHEDULER_STREAM: u64 = 0;

/// RNG stream that drives random carrier placement.
const PLACEMENT_STREAM: u64 = 1;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The next event would have fallen past the runtime bound.
    Completed,

    /// No event was enabled (total rate zero).
    Stalled,

    /// The configured step bound was reached.
    StepLimit,
}

/// Lifecycle of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// The enabled-event set has not been built.
    Idle,

    /// The enabled-event set matches the state.
    Ready,

    Terminated(Termination),
}

/// One executed hop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRecord {
    /// 1-based index of this step.
    pub step: u64,

    /// Waiting time that preceded the hop.
    pub dt: f64,

    /// Clock after the hop.
    pub time: f64,

    pub event: Event,

    /// Stale events dropped while selecting this one.
    pub stale_dropped: u32,
}

/// Result of a single call to [`Vssm::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    Executed(StepRecord),
    Terminated(Termination),
}

/// Result of running to termination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOutcome {
    pub termination: Termination,
    pub clock: f64,
    pub steps: u64,
}

/// Counters collected while the scheduler runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationStats {
    /// Events executed.
    pub steps: u64,

    /// Selected events dropped because their destination was taken.
    pub stale_dropped: u64,

    /// Full rebuilds of the enabled-event set.
    pub full_rebuilds: u64,

    /// Local refreshes after a hop, injection, or annihilation.
    pub refreshes: u64,

    /// Events added to the enabled set.
    pub events_enabled: u64,

    /// Events removed from the enabled set.
    pub events_disabled: u64,

    /// Trajectory snapshots emitted.
    pub snapshots: u64,
}

/// Single-threaded VSSM kinetic Monte Carlo scheduler.
///
/// Owns the occupancy state, the enabled-event set, and its random number
/// generator outright. The graph and the rate model are shared read-only,
/// so independent replicas can hold the same ones.
#[derive(Debug)]
pub struct Vssm {
    graph: Arc<Graph>,
    state: State,
    rate_model: Arc<dyn RateModel>,
    carriers: CarrierRegistry,

    /// Event constructor for each hopping carrier species.
    transitions: HashMap<CarrierKind, EventConstructor>,

    enabled: EnabledEvents,
    rng: ChaCha8Rng,
    clock: f64,
    phase: SchedulerPhase,
    stats: SimulationStats,

    runtime: f64,
    max_steps: Option<u64>,
    output_interval: Option<f64>,

    /// Index `k` of the next snapshot boundary `k * output_interval`.
    next_output: u64,
}

impl Vssm {
    /// Create a scheduler with the default carrier and event registries.
    ///
    /// Carriers are seeded immediately; the enabled-event set is built on the
    /// first step.
    pub fn new(graph: Arc<Graph>, config: &RunConfig) -> Result<Self, SimulationError> {
        Self::with_registries(
            graph,
            config,
            CarrierRegistry::with_defaults(),
            &EventRegistry::with_defaults(),
        )
    }

    /// Create a scheduler with caller-supplied registries.
    pub fn with_registries(
        graph: Arc<Graph>,
        config: &RunConfig,
        carriers: CarrierRegistry,
        events: &EventRegistry,
    ) -> Result<Self, SimulationError> {
        config.validate()?;

        let mut transitions = HashMap::new();
        for binding in &config.transitions {
            transitions.insert(binding.carrier, events.constructor(&binding.event)?);
        }

        let mut state = State::for_graph(&graph);
        let mut placement_rng = ChaCha8Rng::seed_from_u64(config.seed);
        placement_rng.set_stream(PLACEMENT_STREAM);
        seed_carriers(&mut state, &graph, &carriers, &config.carriers, &mut placement_rng)?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        rng.set_stream(SCHEDULER_STREAM);

        let enabled = EnabledEvents::new(graph.len());
        Ok(Self {
            graph,
            state,
            rate_model: Arc::new(FieldBias::new(config.field, config.thermal_energy)),
            carriers,
            transitions,
            enabled,
            rng,
            clock: 0.0,
            phase: SchedulerPhase::Idle,
            stats: SimulationStats::default(),
            runtime: config.runtime,
            max_steps: config.max_steps,
            output_interval: config.output_interval,
            next_output: 0,
        })
    }

    /// Replace the rate model.
    ///
    /// A built event set is discarded and rebuilt on the next step.
    pub fn with_rate_model(mut self, rate_model: Arc<dyn RateModel>) -> Self {
        self.rate_model = rate_model;
        if self.phase == SchedulerPhase::Ready {
            self.phase = SchedulerPhase::Idle;
        }
        self
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    /// Current simulation time.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn runtime(&self) -> f64 {
        self.runtime
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn enabled(&self) -> &EnabledEvents {
        &self.enabled
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// The carrier on the node with external id `id`, if any.
    pub fn occupant_of(&self, id: NodeId) -> Result<Option<CarrierId>, GraphError> {
        Ok(self.state.occupant(self.graph.index_of(id)?))
    }

    /// Sample every carrier at the current clock.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.clock, &self.graph, &self.state)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Enabled-event maintenance
    // ═══════════════════════════════════════════════════════════════════════

    /// Rebuild the enabled-event set from scratch.
    pub fn build(&mut self) -> Result<(), SimulationError> {
        let enabled = self.rebuilt()?;
        self.stats.full_rebuilds += 1;
        self.stats.events_enabled += enabled.len() as u64;
        self.enabled = enabled;
        if !matches!(self.phase, SchedulerPhase::Terminated(_)) {
            self.phase = SchedulerPhase::Ready;
        }

        info!(
            carriers = self.state.len(),
            events = self.enabled.len(),
            total_rate = self.enabled.total_rate(),
            "Enabled events built"
        );
        Ok(())
    }

    /// Compare the incrementally maintained set with a full rebuild.
    pub fn verify_enabled_events(&self) -> Result<(), SimulationError> {
        self.state.verify()?;
        let fresh = self.rebuilt()?;

        let current = self.enabled.sorted();
        let expected = fresh.sorted();
        if current.len() != expected.len() {
            return Err(SimulationError::Diverged(format!(
                "{} events enabled, rebuild has {}",
                current.len(),
                expected.len()
            )));
        }
        if let Some((have, want)) = current.iter().zip(&expected).find(|(a, b)| a != b) {
            return Err(SimulationError::Diverged(format!(
                "found {have}, rebuild has {want}"
            )));
        }

        // Same events, summed in a different slot order.
        let (have, want) = (self.enabled.total_rate(), fresh.total_rate());
        if (have - want).abs() > 1e-9 * want.abs().max(1.0) {
            return Err(SimulationError::Diverged(format!(
                "total rate {have}, rebuild has {want}"
            )));
        }
        Ok(())
    }

    fn rebuilt(&self) -> Result<EnabledEvents, SimulationError> {
        let mut enabled = EnabledEvents::new(self.graph.len());
        for carrier in self.state.carriers() {
            let Some(node) = carrier.node() else { continue };
            let constructor = self.constructor_for(carrier.kind())?;
            for hop in self.graph.hops(node) {
                if self.state.is_occupied(hop.to) {
                    continue;
                }
                let rate = self.effective_rate(carrier.id(), carrier.kind(), hop)?;
                enabled.insert(constructor(EventTemplate {
                    carrier: carrier.id(),
                    from: node,
                    hop: *hop,
                    rate,
                }));
            }
        }
        Ok(enabled)
    }

    fn constructor_for(&self, kind: CarrierKind) -> Result<EventConstructor, SimulationError> {
        self.transitions
            .get(&kind)
            .copied()
            .ok_or(SimulationError::UnboundCarrier(kind))
    }

    /// Rate of `kind` taking `hop`, as given by the rate model.
    ///
    /// Zero is a legal rate (the hop is simply never enabled); anything
    /// negative or non-finite is a broken model and stops the run.
    fn effective_rate(
        &self,
        carrier: CarrierId,
        kind: CarrierKind,
        hop: &Hop,
    ) -> Result<f64, SimulationError> {
        let rate = self.rate_model.rate(kind, hop);
        if rate.is_finite() && rate >= 0.0 {
            Ok(rate)
        } else {
            Err(SimulationError::InvalidRate {
                carrier,
                edge: hop.edge,
                rate,
            })
        }
    }

    /// Re-derive every event around `nodes` from the current state.
    fn refresh(&mut self, nodes: &[NodeIndex]) -> Result<(), SimulationError> {
        let mut disabled = 0;
        for &node in nodes {
            disabled += self.enabled.remove_touching(node);
        }

        let graph = Arc::clone(&self.graph);
        let mut enabled = 0;
        for &node in nodes {
            let occupant = self.state.occupant(node);
            for hop in graph.hops(node) {
                enabled += match occupant {
                    // The occupant's own hops out of `node`.
                    Some(carrier) => self.enable_hop(carrier, node, hop.edge, hop.to)?,
                    // Neighbours' hops into the free `node`.
                    None => match self.state.occupant(hop.to) {
                        Some(neighbour) => self.enable_hop(neighbour, hop.to, hop.edge, node)?,
                        None => 0,
                    },
                };
            }
        }

        self.stats.refreshes += 1;
        self.stats.events_enabled += enabled as u64;
        self.stats.events_disabled += disabled as u64;
        trace!(?nodes, enabled, disabled, "Refreshed");
        Ok(())
    }

    /// Enable `carrier`'s hop from `from` along `edge`, if `to` is free.
    fn enable_hop(
        &mut self,
        carrier: CarrierId,
        from: NodeIndex,
        edge: EdgeIndex,
        to: NodeIndex,
    ) -> Result<usize, SimulationError> {
        if self.state.is_occupied(to) {
            return Ok(0);
        }
        let Some(kind) = self.state.carrier(carrier).map(Carrier::kind) else {
            return Ok(0);
        };
        // Bindings for every live species were checked when it was created
        // or when the set was built.
        let Some(&constructor) = self.transitions.get(&kind) else {
            return Ok(0);
        };
        let Some(hop) = self
            .graph
            .hops(from)
            .iter()
            .find(|h| h.edge == edge && h.to == to)
            .copied()
        else {
            return Ok(0);
        };

        let rate = self.effective_rate(carrier, kind, &hop)?;
        let event = constructor(EventTemplate {
            carrier,
            from,
            hop,
            rate,
        });
        Ok(usize::from(self.enabled.insert(event)))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Stepping
    // ═══════════════════════════════════════════════════════════════════════

    /// Execute one event, or report why the run is over.
    ///
    /// Snapshots falling due are discarded; use [`Vssm::step_with_sink`] to
    /// keep them.
    pub fn step(&mut self) -> Result<StepOutcome, SimulationError> {
        self.step_with_sink(&mut NullSink)
    }

    /// Execute one event, handing `sink` every snapshot boundary it passes.
    pub fn step_with_sink(
        &mut self,
        sink: &mut dyn TrajectorySink,
    ) -> Result<StepOutcome, SimulationError> {
        match self.phase {
            SchedulerPhase::Terminated(termination) => {
                return Ok(StepOutcome::Terminated(termination))
            }
            SchedulerPhase::Idle => self.build()?,
            SchedulerPhase::Ready => {}
        }

        self.emit_through(sink, self.clock, true);

        if self.clock >= self.runtime {
            return Ok(self.terminate(Termination::Completed));
        }
        if self.max_steps.is_some_and(|max| self.stats.steps >= max) {
            return Ok(self.terminate(Termination::StepLimit));
        }

        let total = self.enabled.total_rate();
        if total <= 0.0 {
            return Ok(self.terminate(Termination::Stalled));
        }

        let u1 = 1.0 - self.rng.gen::<f64>();
        let dt = -u1.ln() / total;
        let time = self.clock + dt;
        if time > self.runtime {
            self.emit_through(sink, self.runtime, true);
            self.clock = self.runtime;
            return Ok(self.terminate(Termination::Completed));
        }

        let mut stale_dropped = 0;
        loop {
            let total = self.enabled.total_rate();
            if total <= 0.0 {
                return Ok(self.terminate(Termination::Stalled));
            }

            let target = self.rng.gen::<f64>() * total;
            let Some(event) = self.enabled.select(target).copied() else {
                return Ok(self.terminate(Termination::Stalled));
            };

            if let Err(e) = event.check(&self.state) {
                self.drop_stale(&event, &e);
                stale_dropped += 1;
                continue;
            }

            // Boundaries strictly before the hop see the pre-hop state. Only
            // emitted once the hop is known to go ahead.
            self.emit_through(sink, time, false);

            match event.execute(&mut self.state) {
                Ok(touched) => {
                    self.clock = time;
                    self.stats.steps += 1;
                    self.refresh(&touched.nodes())?;

                    trace!(step = self.stats.steps, dt, time, %event, "Executed");
                    return Ok(StepOutcome::Executed(StepRecord {
                        step: self.stats.steps,
                        dt,
                        time,
                        event,
                        stale_dropped,
                    }));
                }
                Err(e) => {
                    self.drop_stale(&event, &e);
                    stale_dropped += 1;
                }
            }
        }
    }

    fn drop_stale(&mut self, event: &Event, error: &EventError) {
        warn!(error = %error, event = %event, "Dropping stale event");
        self.enabled.remove(&event.key());
        self.stats.events_disabled += 1;
        self.stats.stale_dropped += 1;
    }

    /// Step until the run terminates.
    pub fn run(&mut self) -> Result<RunOutcome, SimulationError> {
        self.run_with_sink(&mut NullSink)
    }

    /// Step until the run terminates, sampling into `sink`.
    pub fn run_with_sink(
        &mut self,
        sink: &mut dyn TrajectorySink,
    ) -> Result<RunOutcome, SimulationError> {
        loop {
            if let StepOutcome::Terminated(termination) = self.step_with_sink(sink)? {
                return Ok(RunOutcome {
                    termination,
                    clock: self.clock,
                    steps: self.stats.steps,
                });
            }
        }
    }

    fn terminate(&mut self, termination: Termination) -> StepOutcome {
        self.phase = SchedulerPhase::Terminated(termination);
        info!(
            ?termination,
            clock = self.clock,
            steps = self.stats.steps,
            stale_dropped = self.stats.stale_dropped,
            "Run terminated"
        );
        StepOutcome::Terminated(termination)
    }

    /// Emit snapshots for every pending boundary before `until`
    /// (or at it, when `inclusive`).
    fn emit_through(&mut self, sink: &mut dyn TrajectorySink, until: f64, inclusive: bool) {
        let Some(interval) = self.output_interval else {
            return;
        };
        loop {
            let boundary = self.next_output as f64 * interval;
            let due = if inclusive {
                boundary <= until
            } else {
                boundary < until
            };
            if !due || boundary > self.runtime {
                return;
            }
            debug!(time = boundary, "Trajectory snapshot");
            sink.record(Snapshot::capture(boundary, &self.graph, &self.state));
            self.next_output += 1;
            self.stats.snapshots += 1;
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Carrier injection and removal
    // ═══════════════════════════════════════════════════════════════════════

    /// Create a carrier of `species` on node `node` at the current clock.
    ///
    /// A stalled scheduler becomes ready again if the new carrier, or a
    /// neighbour it no longer blocks, has somewhere to go.
    pub fn inject(&mut self, species: &str, node: NodeId) -> Result<CarrierId, SimulationError> {
        let index = self.graph.index_of(node)?;
        let id = self.state.add_carrier(&self.carriers, species, self.clock)?;

        let placed = match self.state.carrier(id).map(Carrier::kind) {
            Some(kind) if !self.transitions.contains_key(&kind) => {
                Err(SimulationError::UnboundCarrier(kind))
            }
            _ => self
                .state
                .place_carrier(id, index)
                .map_err(SimulationError::from),
        };
        if let Err(e) = placed {
            self.state.remove(id)?;
            return Err(e);
        }

        if self.phase != SchedulerPhase::Idle {
            self.refresh(&[index])?;
            self.wake();
        }
        debug!(carrier = %id, species, %node, clock = self.clock, "Carrier injected");
        Ok(id)
    }

    /// Remove a carrier, freeing its node.
    pub fn annihilate(&mut self, id: CarrierId) -> Result<Carrier, SimulationError> {
        let node = self.state.carrier(id).and_then(Carrier::node);
        let carrier = self.state.remove(id)?;

        if self.phase != SchedulerPhase::Idle {
            if let Some(node) = node {
                self.refresh(&[node])?;
            }
            self.wake();
        }
        debug!(carrier = %id, clock = self.clock, "Carrier annihilated");
        Ok(carrier)
    }

    fn wake(&mut self) {
        if self.phase == SchedulerPhase::Terminated(Termination::Stalled)
            && self.enabled.total_rate() > 0.0
        {
            self.phase = SchedulerPhase::Ready;
        }
    }
}
