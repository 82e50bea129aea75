//! Initial carrier placement.

use crate::{CarrierSeed, Placement, SimulationError};
use kmc_core::{CarrierRegistry, State};
use kmc_types::{CarrierId, Graph, NodeIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Create and place the carriers described by `seeds`.
///
/// Explicit `Sites` seeds are placed first, in seed order, so random
/// placement can never take a node an explicit seed asked for. Random
/// seeds then draw from the nodes still free, in ascending index order
/// shuffled by `rng`.
pub fn seed_carriers<R: Rng + ?Sized>(
    state: &mut State,
    graph: &Graph,
    registry: &CarrierRegistry,
    seeds: &[CarrierSeed],
    rng: &mut R,
) -> Result<Vec<CarrierId>, SimulationError> {
    let mut placed = Vec::new();

    for seed in seeds {
        let Placement::Sites { sites } = &seed.placement else {
            continue;
        };
        for &site in sites {
            let node = graph.index_of(site)?;
            placed.push(add_and_place(state, registry, &seed.species, node)?);
        }
    }

    for seed in seeds {
        let Placement::Random { count } = seed.placement else {
            continue;
        };
        let mut free: Vec<NodeIndex> = state.free_nodes().collect();
        if free.len() < count {
            return Err(SimulationError::NotEnoughSites {
                requested: count,
                free: free.len(),
            });
        }
        let (chosen, _) = free.partial_shuffle(rng, count);
        for &node in chosen.iter() {
            placed.push(add_and_place(state, registry, &seed.species, node)?);
        }
    }

    debug!(carriers = placed.len(), "Seeded carriers");
    Ok(placed)
}

fn add_and_place(
    state: &mut State,
    registry: &CarrierRegistry,
    species: &str,
    node: NodeIndex,
) -> Result<CarrierId, SimulationError> {
    let id = state.add_carrier(registry, species, 0.0)?;
    if let Err(e) = state.place_carrier(id, node) {
        state.remove(id)?;
        return Err(e.into());
    }
    Ok(id)
}
