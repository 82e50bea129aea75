//! The enabled-event set.
//!
//! Events live in numbered slots. Slot order is the fixed iteration order
//! used for cumulative-rate selection; a removed event's slot is recycled
//! by the next insertion (most recently freed first), which keeps the
//! order a deterministic function of the operation history.
//!
//! Two indexes make refresh local:
//!
//! - `keys`: event key → slot, to reject duplicates and remove by key
//! - `touching`: node → slots of events that start or end there, so all
//!   events around a mutated node can be dropped in O(degree)

use crate::rate_tree::RateTree;
use kmc_core::{Event, EventKey};
use kmc_types::NodeIndex;
use std::collections::HashMap;

/// Enabled events with a cumulative-rate index.
#[derive(Debug, Clone)]
pub struct EnabledEvents {
    slots: Vec<Option<Event>>,
    vacant: Vec<usize>,
    keys: HashMap<EventKey, usize>,
    touching: Vec<Vec<usize>>,
    rates: RateTree,
}

impl EnabledEvents {
    /// Create an empty set for a graph of `node_count` nodes.
    pub fn new(node_count: usize) -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            keys: HashMap::new(),
            touching: vec![Vec::new(); node_count],
            rates: RateTree::new(),
        }
    }

    /// Number of enabled events.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sum of enabled rates.
    pub fn total_rate(&self) -> f64 {
        self.rates.total()
    }

    pub fn contains(&self, key: &EventKey) -> bool {
        self.keys.contains_key(key)
    }

    pub fn get(&self, key: &EventKey) -> Option<&Event> {
        self.keys
            .get(key)
            .and_then(|&slot| self.slots[slot].as_ref())
    }

    /// Add an event.
    ///
    /// Returns `false` (and stores nothing) if an event with the same key
    /// is already enabled or the rate is not a positive finite number.
    pub fn insert(&mut self, event: Event) -> bool {
        let rate = event.rate();
        if !(rate > 0.0 && rate.is_finite()) {
            return false;
        }
        let key = event.key();
        if self.keys.contains_key(&key) {
            return false;
        }

        let slot = match self.vacant.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };

        self.touching[event.from.get()].push(slot);
        self.touching[event.to.get()].push(slot);
        self.keys.insert(key, slot);
        self.rates.set(slot, rate);
        self.slots[slot] = Some(event);
        true
    }

    /// Remove an event by key.
    pub fn remove(&mut self, key: &EventKey) -> Option<Event> {
        let slot = self.keys.get(key).copied()?;
        let event = self.vacate(slot)?;
        detach(&mut self.touching[event.from.get()], slot);
        detach(&mut self.touching[event.to.get()], slot);
        Some(event)
    }

    /// Remove every event that starts or ends on `node`.
    ///
    /// Returns how many were removed.
    pub fn remove_touching(&mut self, node: NodeIndex) -> usize {
        let slots = std::mem::take(&mut self.touching[node.get()]);
        let mut removed = 0;
        for slot in slots {
            let Some(event) = self.vacate(slot) else {
                continue;
            };
            let other = if event.from == node { event.to } else { event.from };
            detach(&mut self.touching[other.get()], slot);
            removed += 1;
        }
        removed
    }

    /// The event whose cumulative-rate interval contains `target`.
    ///
    /// `target` is expected in `[0, total_rate())`.
    pub fn select(&self, target: f64) -> Option<&Event> {
        let slot = self.rates.find(target)?;
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.vacant.clear();
        self.keys.clear();
        for list in &mut self.touching {
            list.clear();
        }
        self.rates.clear();
    }

    /// Events in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.slots.iter().flatten()
    }

    /// Events sorted by key, for order-independent comparison.
    pub fn sorted(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self.iter().copied().collect();
        events.sort_by_key(Event::key);
        events
    }

    fn vacate(&mut self, slot: usize) -> Option<Event> {
        let event = self.slots.get_mut(slot)?.take()?;
        self.keys.remove(&event.key());
        self.rates.set(slot, 0.0);
        self.vacant.push(slot);
        Some(event)
    }
}

fn detach(list: &mut Vec<usize>, slot: usize) {
    if let Some(pos) = list.iter().position(|&s| s == slot) {
        list.swap_remove(pos);
    }
}
