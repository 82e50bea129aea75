//! KMC Simulator CLI
//!
//! Runs charge-transport scenarios and generates lattice networks.

use clap::{Parser, Subcommand};
use kmc_simulator::{JsonLinesSink, LatticeSpec, Simulator, SimulatorConfig, SimulatorError};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kmc-sim")]
#[command(about = "Kinetic Monte Carlo charge transport simulator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print transport metrics
    Run {
        /// Scenario file (TOML)
        #[arg(short, long)]
        scenario: PathBuf,

        /// Network file, overriding the scenario's
        #[arg(short, long)]
        network: Option<PathBuf>,

        /// Base random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Simulated time bound
        #[arg(long)]
        runtime: Option<f64>,

        /// Number of independent replicas
        #[arg(long)]
        replicas: Option<usize>,

        /// Stop each replica after this many events
        #[arg(long)]
        max_steps: Option<u64>,

        /// Write the first replica's snapshots here as JSON lines
        #[arg(long)]
        trajectory: Option<PathBuf>,
    },

    /// Print a periodic simple cubic network as TOML
    Lattice {
        /// Sites per box side
        #[arg(long, default_value = "10")]
        size: u64,

        /// Distance between neighbouring sites
        #[arg(long, default_value = "1.0")]
        spacing: f64,

        /// Mean hop rate
        #[arg(long, default_value = "1.0")]
        rate: f64,

        /// Relative rate spread (0.0 to 1.0)
        #[arg(long, default_value = "0.0")]
        disorder: f64,

        /// Seed for the rate draws
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Lattice {
            size,
            spacing,
            rate,
            disorder,
            seed,
        } => {
            // No tracing here - output goes to stdout
            let spec = LatticeSpec {
                size,
                spacing,
                rate,
                disorder,
                seed,
            };
            print!("{}", spec.generate()?.to_toml_string()?);
        }

        Commands::Run {
            scenario,
            network,
            seed,
            runtime,
            replicas,
            max_steps,
            trajectory,
        } => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .init();

            let mut config = SimulatorConfig::load(&scenario)?;
            if let Some(network) = network {
                config = config.with_network(network);
            }
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            if let Some(runtime) = runtime {
                config = config.with_runtime(runtime);
            }
            if let Some(replicas) = replicas {
                config = config.with_replicas(replicas);
            }
            if let Some(max_steps) = max_steps {
                config = config.with_max_steps(max_steps);
            }

            let simulator = Simulator::load(config)?;

            let report = match trajectory {
                Some(path) => {
                    let file = File::create(&path).map_err(|source| SimulatorError::Io {
                        path: path.clone(),
                        source,
                    })?;
                    let mut sink = JsonLinesSink::new(BufWriter::new(file));
                    let report = simulator.run_with_trajectory(&mut sink)?;
                    let written = sink.written();
                    sink.finish().map_err(SimulatorError::Trajectory)?;
                    println!("Wrote {written} snapshots to {}", path.display());
                    report
                }
                None => simulator.run()?,
            };
            report.print();
        }
    }

    Ok(())
}
