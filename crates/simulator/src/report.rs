//! Transport metrics collected from finished replicas.

use crate::SimulatorError;
use hdrhistogram::Histogram;
use kmc_simulation::{RunOutcome, SimulationStats, Termination, Vssm};
use kmc_types::Vec3;

/// Summary of one finished replica.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaReport {
    pub replica: usize,
    pub seed: u64,
    pub termination: Termination,

    /// Clock at termination.
    pub clock: f64,

    /// Simulated time the displacement is averaged over.
    ///
    /// A stalled network stays put until the runtime bound, so a stalled
    /// replica is observed for the whole runtime, not just up to its last
    /// hop. Otherwise this is the clock at termination.
    pub window: f64,

    pub stats: SimulationStats,

    /// Mean unwrapped carrier displacement.
    pub mean_displacement: Vec3,

    /// Hops performed by each live carrier, in creation order.
    pub hop_counts: Vec<u64>,
}

impl ReplicaReport {
    /// Summarise a scheduler that has run to `outcome`.
    pub fn from_run(replica: usize, seed: u64, vssm: &Vssm, outcome: RunOutcome) -> Self {
        let snapshot = vssm.snapshot();
        let window = match outcome.termination {
            Termination::Stalled => vssm.runtime(),
            Termination::Completed | Termination::StepLimit => outcome.clock,
        };
        Self {
            replica,
            seed,
            termination: outcome.termination,
            clock: outcome.clock,
            window,
            stats: vssm.stats().clone(),
            mean_displacement: snapshot.mean_displacement(),
            hop_counts: snapshot.carriers.iter().map(|c| c.hops).collect(),
        }
    }

    /// Mean displacement per unit of observed time, `None` for an empty
    /// window.
    pub fn drift_velocity(&self) -> Option<Vec3> {
        (self.window > 0.0).then(|| self.mean_displacement * (1.0 / self.window))
    }
}

/// Aggregate over all replicas of a scenario.
#[derive(Debug)]
pub struct TransportReport {
    replicas: Vec<ReplicaReport>,
    field: Vec3,
    hops: Histogram<u64>,
}

impl TransportReport {
    pub fn new(field: Vec3, replicas: Vec<ReplicaReport>) -> Result<Self, SimulatorError> {
        let mut hops =
            Histogram::<u64>::new(3).map_err(|e| SimulatorError::Histogram(format!("{e:?}")))?;
        for count in replicas.iter().flat_map(|r| &r.hop_counts) {
            hops.saturating_record(*count);
        }
        Ok(Self {
            replicas,
            field,
            hops,
        })
    }

    pub fn replicas(&self) -> &[ReplicaReport] {
        &self.replicas
    }

    /// Executed events summed over replicas.
    pub fn total_steps(&self) -> u64 {
        self.replicas.iter().map(|r| r.stats.steps).sum()
    }

    /// Stale events dropped, summed over replicas.
    pub fn total_stale(&self) -> u64 {
        self.replicas.iter().map(|r| r.stats.stale_dropped).sum()
    }

    /// How many replicas ended each way: (completed, stalled, step limit).
    pub fn terminations(&self) -> (usize, usize, usize) {
        let count = |t| self.replicas.iter().filter(|r| r.termination == t).count();
        (
            count(Termination::Completed),
            count(Termination::Stalled),
            count(Termination::StepLimit),
        )
    }

    /// Replica-averaged mean carrier displacement.
    pub fn mean_displacement(&self) -> Vec3 {
        average(self.replicas.iter().map(|r| r.mean_displacement))
    }

    /// Replica-averaged drift velocity over replicas with a non-empty
    /// observation window.
    pub fn drift_velocity(&self) -> Vec3 {
        average(self.replicas.iter().filter_map(ReplicaReport::drift_velocity))
    }

    /// Drift velocity projected on the field direction, per unit field.
    ///
    /// `μ = (v · Ê) / |E|`. Carriers drifting against the field (electrons)
    /// give a negative value. `None` without a field.
    pub fn mobility(&self) -> Option<f64> {
        let strength = self.field.norm();
        let direction = self.field.normalized()?;
        Some(self.drift_velocity().dot(direction) / strength)
    }

    /// Per-carrier hop count at percentile `q` (0–100).
    pub fn hop_percentile(&self, q: f64) -> u64 {
        self.hops.value_at_percentile(q)
    }

    /// Print a human-readable summary to stdout.
    pub fn print(&self) {
        let (completed, stalled, step_limit) = self.terminations();
        println!("Replicas:           {}", self.replicas.len());
        println!(
            "  completed / stalled / step limit: {completed} / {stalled} / {step_limit}"
        );
        println!("Events executed:    {}", self.total_steps());
        println!("Stale events:       {}", self.total_stale());
        println!("Mean displacement:  {}", self.mean_displacement());
        println!("Drift velocity:     {}", self.drift_velocity());
        match self.mobility() {
            Some(mobility) => println!("Mobility:           {mobility:.6e}"),
            None => println!("Mobility:           n/a (no field)"),
        }
        println!(
            "Hops per carrier:   p50={} p90={} p99={} max={}",
            self.hop_percentile(50.0),
            self.hop_percentile(90.0),
            self.hop_percentile(99.0),
            self.hops.max()
        );
    }
}

fn average(values: impl Iterator<Item = Vec3>) -> Vec3 {
    let (sum, n) = values.fold((Vec3::ZERO, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        Vec3::ZERO
    } else {
        sum * (1.0 / n as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmc_simulation::{CarrierSeed, RunConfig};
    use kmc_test_helpers::{three_site_chain, two_site_ring, RING_DISPLACEMENT};
    use std::sync::Arc;

    fn replica(clock: f64, dx: f64, hops: Vec<u64>) -> ReplicaReport {
        ReplicaReport {
            replica: 0,
            seed: 0,
            termination: Termination::Completed,
            clock,
            window: clock,
            stats: SimulationStats {
                steps: hops.iter().sum(),
                ..Default::default()
            },
            mean_displacement: Vec3::new(dx, 0.0, 0.0),
            hop_counts: hops,
        }
    }

    #[test]
    fn test_drift_and_mobility() {
        let report = TransportReport::new(
            Vec3::new(2.0, 0.0, 0.0),
            vec![replica(10.0, 4.0, vec![3, 5]), replica(10.0, 8.0, vec![7])],
        )
        .unwrap();

        assert_eq!(report.total_steps(), 15);
        assert_eq!(report.mean_displacement(), Vec3::new(6.0, 0.0, 0.0));
        assert!((report.drift_velocity() - Vec3::new(0.6, 0.0, 0.0)).norm() < 1e-12);
        assert!((report.mobility().unwrap() - 0.3).abs() < 1e-12);
        assert_eq!(report.hop_percentile(100.0), 7);
        assert_eq!(report.terminations(), (2, 0, 0));
    }

    #[test]
    fn test_no_field_no_mobility() {
        let report = TransportReport::new(Vec3::ZERO, vec![replica(1.0, 1.0, vec![1])]).unwrap();
        assert_eq!(report.mobility(), None);
    }

    #[test]
    fn test_empty_window_has_no_drift() {
        let empty = replica(0.0, 0.0, vec![0]);
        assert_eq!(empty.drift_velocity(), None);

        let report = TransportReport::new(Vec3::new(1.0, 0.0, 0.0), vec![empty]).unwrap();
        assert_eq!(report.drift_velocity(), Vec3::ZERO);
        assert_eq!(report.mobility(), Some(0.0));
    }

    #[test]
    fn test_stalled_replica_averages_over_runtime() {
        // A lone electron that hops once along the ring, then has nowhere
        // to go for the rest of the runtime.
        let config = RunConfig::new(100.0).with_carriers(vec![CarrierSeed::at("electron", [0])]);
        let mut vssm = Vssm::new(Arc::new(two_site_ring(1.0, 0.0)), &config).unwrap();
        let outcome = vssm.run().unwrap();
        assert_eq!(outcome.termination, Termination::Stalled);
        assert!(outcome.clock < 100.0);

        let report = ReplicaReport::from_run(0, config.seed, &vssm, outcome);
        assert_eq!(report.window, 100.0);
        assert_eq!(report.mean_displacement, RING_DISPLACEMENT);
        let drift = report.drift_velocity().unwrap();
        assert!((drift - RING_DISPLACEMENT * 0.01).norm() < 1e-12);
    }

    #[test]
    fn test_step_limited_replica_averages_over_clock() {
        let config = RunConfig::new(1e9)
            .with_carriers(vec![CarrierSeed::at("electron", [0])])
            .with_max_steps(3);
        let mut vssm = Vssm::new(Arc::new(three_site_chain()), &config).unwrap();
        let outcome = vssm.run().unwrap();
        assert_eq!(outcome.termination, Termination::StepLimit);

        let report = ReplicaReport::from_run(0, config.seed, &vssm, outcome);
        assert_eq!(report.window, outcome.clock);
    }
}
