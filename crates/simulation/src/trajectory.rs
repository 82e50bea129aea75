//! Read-only trajectory sampling.
//!
//! The scheduler hands a [`Snapshot`] to a [`TrajectorySink`] at time zero and
//! every time the clock crosses a multiple of the output interval. What the
//! sink does with it (persist, aggregate, drop) is up to the caller.

use kmc_core::{CarrierKind, State};
use kmc_types::{CarrierId, Graph, NodeId, Vec3};
use serde::{Deserialize, Serialize};

/// Position and history of one carrier at a sample time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierSnapshot {
    pub id: CarrierId,
    pub kind: CarrierKind,

    /// Occupied node, `None` if the carrier is unplaced.
    pub node: Option<NodeId>,

    /// Absolute position of the occupied node.
    pub position: Option<Vec3>,

    /// Unwrapped displacement since creation.
    pub displacement: Vec3,

    pub hops: u64,
}

/// All carriers at one point in simulated time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: f64,
    pub carriers: Vec<CarrierSnapshot>,
}

impl Snapshot {
    /// Sample `state` at `time`, carriers in creation order.
    pub fn capture(time: f64, graph: &Graph, state: &State) -> Self {
        let carriers = state
            .carriers()
            .map(|carrier| {
                let node = carrier.node().map(|idx| graph.node(idx));
                CarrierSnapshot {
                    id: carrier.id(),
                    kind: carrier.kind(),
                    node: node.map(|n| n.id),
                    position: node.map(|n| n.position),
                    displacement: carrier.displacement(),
                    hops: carrier.hop_count(),
                }
            })
            .collect();
        Self { time, carriers }
    }

    /// Mean unwrapped displacement over all carriers.
    pub fn mean_displacement(&self) -> Vec3 {
        if self.carriers.is_empty() {
            return Vec3::ZERO;
        }
        let sum = self
            .carriers
            .iter()
            .fold(Vec3::ZERO, |acc, c| acc + c.displacement);
        sum * (1.0 / self.carriers.len() as f64)
    }
}

/// Receives snapshots from a running scheduler.
pub trait TrajectorySink {
    fn record(&mut self, snapshot: Snapshot);
}

/// Keeps every snapshot in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    snapshots: Vec<Snapshot>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn into_snapshots(self) -> Vec<Snapshot> {
        self.snapshots
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }
}

impl TrajectorySink for RecordingSink {
    fn record(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TrajectorySink for NullSink {
    fn record(&mut self, _snapshot: Snapshot) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmc_core::CarrierRegistry;
    use kmc_test_helpers::three_site_chain;
    use kmc_types::NodeIndex;

    #[test]
    fn test_capture_in_creation_order() {
        let graph = three_site_chain();
        let mut state = State::for_graph(&graph);
        let registry = CarrierRegistry::with_defaults();
        let e = state.add_carrier(&registry, "electron", 0.0).unwrap();
        let h = state.add_carrier(&registry, "hole", 0.0).unwrap();
        state.place_carrier(e, NodeIndex(2)).unwrap();

        let snapshot = Snapshot::capture(1.5, &graph, &state);
        assert_eq!(snapshot.time, 1.5);
        assert_eq!(snapshot.carriers.len(), 2);

        assert_eq!(snapshot.carriers[0].id, e);
        assert_eq!(snapshot.carriers[0].node, Some(graph.node(NodeIndex(2)).id));
        assert_eq!(
            snapshot.carriers[0].position,
            Some(graph.node(NodeIndex(2)).position)
        );

        assert_eq!(snapshot.carriers[1].id, h);
        assert_eq!(snapshot.carriers[1].kind, CarrierKind::Hole);
        assert_eq!(snapshot.carriers[1].node, None);
    }

    #[test]
    fn test_mean_displacement() {
        let carrier = |dx: f64| CarrierSnapshot {
            id: CarrierId(0),
            kind: CarrierKind::Electron,
            node: None,
            position: None,
            displacement: Vec3::new(dx, 0.0, 0.0),
            hops: 1,
        };
        let snapshot = Snapshot {
            time: 0.0,
            carriers: vec![carrier(1.0), carrier(3.0)],
        };
        assert_eq!(snapshot.mean_displacement(), Vec3::new(2.0, 0.0, 0.0));

        let empty = Snapshot {
            time: 0.0,
            carriers: Vec::new(),
        };
        assert_eq!(empty.mean_displacement(), Vec3::ZERO);
    }

    #[test]
    fn test_recording_sink() {
        let mut sink = RecordingSink::new();
        sink.record(Snapshot {
            time: 0.0,
            carriers: Vec::new(),
        });
        sink.record(Snapshot {
            time: 1.0,
            carriers: Vec::new(),
        });
        assert_eq!(sink.snapshots().len(), 2);
        assert_eq!(sink.last().unwrap().time, 1.0);
    }
}
