//! Occupancy state: who sits where.
//!
//! `State` is the single mutable source of truth during a run. It keeps two
//! tables that must always agree:
//!
//! - node → occupant (`occupancy`, indexed by [`NodeIndex`])
//! - carrier → node (the `node` field of each live [`Carrier`])
//!
//! Every mutation goes through a method on this type so the hard-core
//! exclusion invariant (at most one carrier per node) is enforced in one
//! place. Positions and rates are not stored here; they belong to the graph.

use crate::{Carrier, CarrierRegistry, RegistryError, StateError};
use indexmap::IndexMap;
use kmc_types::{CarrierId, Graph, NodeIndex, Vec3};
use tracing::trace;

/// Occupancy tables and the live carrier roster.
#[derive(Debug, Clone)]
pub struct State {
    /// Occupant of each node, indexed by `NodeIndex`.
    occupancy: Vec<Option<CarrierId>>,

    /// Live carriers in creation order.
    ///
    /// Insertion order is the iteration order used for full event
    /// rebuilds, so it must stay deterministic; removal preserves it.
    carriers: IndexMap<CarrierId, Carrier>,

    next_id: CarrierId,
}

impl State {
    /// Empty state for a graph of `node_count` nodes.
    pub fn new(node_count: usize) -> Self {
        Self {
            occupancy: vec![None; node_count],
            carriers: IndexMap::new(),
            next_id: CarrierId::FIRST,
        }
    }

    /// Empty state sized for `graph`.
    pub fn for_graph(graph: &Graph) -> Self {
        Self::new(graph.len())
    }

    /// Create a carrier of the named species. It starts unplaced.
    pub fn add_carrier(
        &mut self,
        registry: &CarrierRegistry,
        species: &str,
        created_at: f64,
    ) -> Result<CarrierId, RegistryError> {
        let id = self.next_id;
        let carrier = registry.create(species, id, created_at)?;
        self.next_id = id.next();
        self.carriers.insert(id, carrier);
        trace!(carrier = %id, species, "Carrier created");
        Ok(id)
    }

    /// Put an unplaced carrier on a free node.
    pub fn place_carrier(&mut self, id: CarrierId, node: NodeIndex) -> Result<(), StateError> {
        let slot = self
            .occupancy
            .get(node.get())
            .ok_or(StateError::NodeOutOfRange(node))?;
        if let Some(occupant) = *slot {
            return Err(StateError::Occupied { node, occupant });
        }

        let carrier = self
            .carriers
            .get_mut(&id)
            .ok_or(StateError::UnknownCarrier(id))?;
        if carrier.node().is_some() {
            return Err(StateError::AlreadyPlaced(id));
        }

        carrier.set_node(Some(node));
        self.occupancy[node.get()] = Some(id);
        Ok(())
    }

    /// Remove a carrier from the roster, freeing its node.
    pub fn remove(&mut self, id: CarrierId) -> Result<Carrier, StateError> {
        let mut carrier = self
            .carriers
            .shift_remove(&id)
            .ok_or(StateError::UnknownCarrier(id))?;
        if let Some(node) = carrier.node() {
            self.occupancy[node.get()] = None;
        }
        carrier.set_node(None);
        Ok(carrier)
    }

    /// Move a placed carrier to a free node and record the hop.
    ///
    /// Callers have already checked that `to` is free; this only asserts it.
    pub(crate) fn relocate(&mut self, id: CarrierId, to: NodeIndex, displacement: Vec3) {
        debug_assert!(self.occupancy[to.get()].is_none(), "relocating onto {to}");

        let Some(carrier) = self.carriers.get_mut(&id) else {
            return;
        };
        if let Some(from) = carrier.node() {
            self.occupancy[from.get()] = None;
        }
        carrier.set_node(Some(to));
        carrier.record_hop(displacement);
        self.occupancy[to.get()] = Some(id);
    }

    /// The carrier on `node`, if any.
    pub fn occupant(&self, node: NodeIndex) -> Option<CarrierId> {
        self.occupancy.get(node.get()).copied().flatten()
    }

    pub fn is_occupied(&self, node: NodeIndex) -> bool {
        self.occupant(node).is_some()
    }

    /// A live carrier by id.
    pub fn carrier(&self, id: CarrierId) -> Option<&Carrier> {
        self.carriers.get(&id)
    }

    /// Live carriers in creation order.
    pub fn carriers(&self) -> impl Iterator<Item = &Carrier> {
        self.carriers.values()
    }

    /// Number of live carriers.
    pub fn len(&self) -> usize {
        self.carriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carriers.is_empty()
    }

    /// Number of nodes the state was sized for.
    pub fn node_count(&self) -> usize {
        self.occupancy.len()
    }

    /// Number of occupied nodes.
    pub fn occupied_count(&self) -> usize {
        self.occupancy.iter().filter(|o| o.is_some()).count()
    }

    /// Indices of nodes with no occupant, ascending.
    pub fn free_nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.occupancy
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_none())
            .map(|(i, _)| NodeIndex(i as u32))
    }

    /// Check that the two occupancy tables describe the same bijection.
    pub fn verify(&self) -> Result<(), StateError> {
        for (i, occupant) in self.occupancy.iter().enumerate() {
            let Some(id) = occupant else { continue };
            let node = NodeIndex(i as u32);
            match self.carriers.get(id) {
                Some(carrier) if carrier.node() == Some(node) => {}
                Some(carrier) => {
                    return Err(StateError::Inconsistent(format!(
                        "{node} lists {id}, which is on {:?}",
                        carrier.node()
                    )))
                }
                None => {
                    return Err(StateError::Inconsistent(format!(
                        "{node} lists dead carrier {id}"
                    )))
                }
            }
        }

        for carrier in self.carriers.values() {
            if let Some(node) = carrier.node() {
                if self.occupant(node) != Some(carrier.id()) {
                    return Err(StateError::Inconsistent(format!(
                        "{} claims {node}, which lists {:?}",
                        carrier.id(),
                        self.occupant(node)
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmc_test_helpers::three_site_chain;

    fn setup() -> (State, CarrierRegistry) {
        (State::for_graph(&three_site_chain()), CarrierRegistry::with_defaults())
    }

    #[test]
    fn test_add_carrier_starts_unplaced() {
        let (mut state, registry) = setup();
        let id = state.add_carrier(&registry, "electron", 0.0).unwrap();

        assert_eq!(state.len(), 1);
        assert_eq!(state.carrier(id).unwrap().node(), None);
        assert_eq!(state.occupied_count(), 0);
    }

    #[test]
    fn test_ids_are_sequential() {
        let (mut state, registry) = setup();
        let a = state.add_carrier(&registry, "electron", 0.0).unwrap();
        let b = state.add_carrier(&registry, "hole", 0.0).unwrap();
        assert_eq!(a, CarrierId(0));
        assert_eq!(b, CarrierId(1));
    }

    #[test]
    fn test_unknown_species() {
        let (mut state, registry) = setup();
        assert!(matches!(
            state.add_carrier(&registry, "muon", 0.0),
            Err(RegistryError::UnknownType { .. })
        ));
        assert!(state.is_empty());
    }

    #[test]
    fn test_place_and_occupant() {
        let (mut state, registry) = setup();
        let id = state.add_carrier(&registry, "electron", 0.0).unwrap();
        state.place_carrier(id, NodeIndex(1)).unwrap();

        assert_eq!(state.occupant(NodeIndex(1)), Some(id));
        assert!(!state.is_occupied(NodeIndex(0)));
        assert_eq!(state.carrier(id).unwrap().node(), Some(NodeIndex(1)));
        assert_eq!(
            state.free_nodes().collect::<Vec<_>>(),
            vec![NodeIndex(0), NodeIndex(2)]
        );
        state.verify().unwrap();
    }

    #[test]
    fn test_place_on_occupied_node_fails() {
        let (mut state, registry) = setup();
        let a = state.add_carrier(&registry, "electron", 0.0).unwrap();
        let b = state.add_carrier(&registry, "electron", 0.0).unwrap();
        state.place_carrier(a, NodeIndex(0)).unwrap();

        assert_eq!(
            state.place_carrier(b, NodeIndex(0)),
            Err(StateError::Occupied {
                node: NodeIndex(0),
                occupant: a
            })
        );
        assert_eq!(state.carrier(b).unwrap().node(), None);
        state.verify().unwrap();
    }

    #[test]
    fn test_place_errors() {
        let (mut state, registry) = setup();
        let id = state.add_carrier(&registry, "electron", 0.0).unwrap();

        assert_eq!(
            state.place_carrier(id, NodeIndex(3)),
            Err(StateError::NodeOutOfRange(NodeIndex(3)))
        );
        assert_eq!(
            state.place_carrier(CarrierId(9), NodeIndex(0)),
            Err(StateError::UnknownCarrier(CarrierId(9)))
        );

        state.place_carrier(id, NodeIndex(0)).unwrap();
        assert_eq!(
            state.place_carrier(id, NodeIndex(2)),
            Err(StateError::AlreadyPlaced(id))
        );
    }

    #[test]
    fn test_remove_frees_node_and_keeps_order() {
        let (mut state, registry) = setup();
        let ids: Vec<_> = (0..3)
            .map(|_| state.add_carrier(&registry, "hole", 0.0).unwrap())
            .collect();
        for (i, id) in ids.iter().enumerate() {
            state.place_carrier(*id, NodeIndex(i as u32)).unwrap();
        }

        let removed = state.remove(ids[1]).unwrap();
        assert_eq!(removed.node(), None);
        assert!(!state.is_occupied(NodeIndex(1)));
        assert_eq!(
            state.carriers().map(Carrier::id).collect::<Vec<_>>(),
            vec![ids[0], ids[2]]
        );
        assert_eq!(state.remove(ids[1]), Err(StateError::UnknownCarrier(ids[1])));
        state.verify().unwrap();
    }

    #[test]
    fn test_relocate_moves_and_records() {
        let (mut state, registry) = setup();
        let id = state.add_carrier(&registry, "electron", 0.0).unwrap();
        state.place_carrier(id, NodeIndex(0)).unwrap();

        state.relocate(id, NodeIndex(1), Vec3::new(1.0, 0.0, 0.0));

        assert_eq!(state.occupant(NodeIndex(0)), None);
        assert_eq!(state.occupant(NodeIndex(1)), Some(id));
        let carrier = state.carrier(id).unwrap();
        assert_eq!(carrier.displacement(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(carrier.hop_count(), 1);
        state.verify().unwrap();
    }

    #[test]
    fn test_verify_detects_divergence() {
        let (mut state, registry) = setup();
        let id = state.add_carrier(&registry, "electron", 0.0).unwrap();
        state.place_carrier(id, NodeIndex(0)).unwrap();

        // Corrupt one side of the relation directly.
        state.occupancy[0] = None;
        state.occupancy[2] = Some(id);
        assert!(matches!(state.verify(), Err(StateError::Inconsistent(_))));
    }
}
