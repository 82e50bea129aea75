//! Replica runner.

use crate::{
    ReplicaReport, SimulatorConfig, SimulatorError, TomlNetworkSource, TransportReport,
};
use kmc_simulation::{NullSink, TrajectorySink, Vssm};
use kmc_types::Graph;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::info;

/// Runs independent replicas of one scenario over a shared graph.
///
/// Each replica gets its own state, scheduler, and seed
/// (`seed + replica index`); only the read-only graph is shared.
#[derive(Debug)]
pub struct Simulator {
    graph: Arc<Graph>,
    config: SimulatorConfig,
}

impl Simulator {
    pub fn new(graph: Arc<Graph>, config: SimulatorConfig) -> Result<Self, SimulatorError> {
        config.validate()?;
        Ok(Self { graph, config })
    }

    /// Load the network the configuration points at.
    pub fn load(config: SimulatorConfig) -> Result<Self, SimulatorError> {
        let path = config.network.as_ref().ok_or(SimulatorError::MissingNetwork)?;
        let source = TomlNetworkSource::open(path)?;
        let graph = Graph::load(&source)?;
        Self::new(Arc::new(graph), config)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Run one replica to termination.
    pub fn run_replica(
        &self,
        replica: usize,
        sink: &mut dyn TrajectorySink,
    ) -> Result<ReplicaReport, SimulatorError> {
        let seed = self.config.replica_seed(replica);
        let run = self.config.run.clone().with_seed(seed);

        let mut vssm = Vssm::new(Arc::clone(&self.graph), &run)?;
        let outcome = vssm.run_with_sink(sink)?;

        info!(
            replica,
            seed,
            termination = ?outcome.termination,
            clock = outcome.clock,
            steps = outcome.steps,
            "Replica finished"
        );
        Ok(ReplicaReport::from_run(replica, seed, &vssm, outcome))
    }

    /// Run every replica in parallel.
    pub fn run(&self) -> Result<TransportReport, SimulatorError> {
        self.run_with_trajectory(&mut NullSink)
    }

    /// Run every replica; replica 0 feeds `sink`, the rest run in parallel.
    pub fn run_with_trajectory(
        &self,
        sink: &mut dyn TrajectorySink,
    ) -> Result<TransportReport, SimulatorError> {
        info!(
            replicas = self.config.replicas,
            nodes = self.graph.len(),
            carriers = self.config.run.total_carriers(),
            runtime = self.config.run.runtime,
            "Starting replicas"
        );

        let first = self.run_replica(0, sink)?;
        let rest = (1..self.config.replicas)
            .into_par_iter()
            .map(|replica| self.run_replica(replica, &mut NullSink))
            .collect::<Result<Vec<_>, _>>()?;

        let mut replicas = Vec::with_capacity(self.config.replicas);
        replicas.push(first);
        replicas.extend(rest);
        TransportReport::new(self.config.run.field, replicas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmc_simulation::{CarrierSeed, RecordingSink, RunConfig, Termination};
    use kmc_test_helpers::{periodic_cubic, three_site_chain};
    use kmc_types::Vec3;
    use tracing_test::traced_test;

    fn lattice_config(replicas: usize) -> SimulatorConfig {
        let run = RunConfig::new(20.0)
            .with_seed(5)
            .with_carriers(vec![CarrierSeed::random("hole", 6)])
            .with_field(Vec3::new(0.05, 0.0, 0.0))
            .with_thermal_energy(0.1);
        SimulatorConfig::new(run).with_replicas(replicas)
    }

    #[traced_test]
    #[test]
    fn test_replicas_use_consecutive_seeds() {
        let sim = Simulator::new(Arc::new(periodic_cubic(4, 1.0, 1.0)), lattice_config(4)).unwrap();
        let report = sim.run().unwrap();

        let seeds: Vec<u64> = report.replicas().iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![5, 6, 7, 8]);
        assert!(report
            .replicas()
            .iter()
            .all(|r| r.termination == Termination::Completed && r.clock == 20.0));
        assert!(logs_contain("Replica finished"));
    }

    #[test]
    fn test_replica_matches_a_direct_run() {
        let graph = Arc::new(periodic_cubic(4, 1.0, 1.0));
        let sim = Simulator::new(Arc::clone(&graph), lattice_config(3)).unwrap();
        let report = sim.run().unwrap();

        // Replica 2 is the same run as a scheduler seeded with 5 + 2.
        let run = sim.config().run.clone().with_seed(7);
        let mut vssm = Vssm::new(graph, &run).unwrap();
        let outcome = vssm.run().unwrap();
        assert_eq!(report.replicas()[2], ReplicaReport::from_run(2, 7, &vssm, outcome));
    }

    #[test]
    fn test_field_drives_holes_forward() {
        let sim = Simulator::new(Arc::new(periodic_cubic(4, 1.0, 1.0)), lattice_config(4)).unwrap();
        let report = sim.run().unwrap();

        // exp(±0.5) bias: holes drift along +x.
        assert!(report.drift_velocity().x > 0.0);
        assert!(report.mobility().unwrap() > 0.0);
    }

    #[test]
    fn test_trajectory_comes_from_first_replica() {
        let run = RunConfig::new(4.0)
            .with_carriers(vec![CarrierSeed::at("electron", [0])])
            .with_output_interval(2.0);
        let sim = Simulator::new(
            Arc::new(three_site_chain()),
            SimulatorConfig::new(run).with_replicas(2),
        )
        .unwrap();

        let mut sink = RecordingSink::new();
        let report = sim.run_with_trajectory(&mut sink).unwrap();

        let times: Vec<f64> = sink.snapshots().iter().map(|s| s.time).collect();
        assert_eq!(times, vec![0.0, 2.0, 4.0]);
        assert_eq!(report.replicas()[0].stats.snapshots, 3);
    }

    #[test]
    fn test_demo_scenario_runs() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/scenario.toml");
        let config = SimulatorConfig::load(path)
            .unwrap()
            .with_runtime(20.0)
            .with_replicas(2);
        let sim = Simulator::load(config).unwrap();
        assert_eq!(sim.graph().len(), 8);
        assert_eq!(sim.graph().edge_count(), 8);

        let report = sim.run().unwrap();
        assert_eq!(report.replicas().len(), 2);
        assert!(report.total_steps() > 0);
        assert!(report.replicas().iter().all(|r| r.hop_counts.len() == 3));
    }

    #[test]
    fn test_load_requires_network() {
        assert!(matches!(
            Simulator::load(SimulatorConfig::default()),
            Err(SimulatorError::MissingNetwork)
        ));
        assert!(matches!(
            Simulator::load(SimulatorConfig::default().with_network("/nonexistent.toml")),
            Err(SimulatorError::Load(_))
        ));
    }
}
