//! Cumulative-rate index over event slots.
//!
//! A complete binary sum tree: leaves hold per-slot rates, every internal
//! node holds the sum of its two children. Updating one leaf recomputes the
//! sums on its path to the root, so the total is always a pure function of
//! the current leaf values and never accumulates drift from add/subtract
//! updates.
//!
//! # Performance
//!
//! - Update: O(log n)
//! - Total: O(1)
//! - Selection by cumulative rate: O(log n)
//!
//! # Layout
//!
//! `nodes[1]` is the root; the children of `i` are `2i` and `2i + 1`;
//! leaf `s` lives at `capacity + s`. `nodes[0]` is unused.

#[derive(Debug, Clone)]
pub(crate) struct RateTree {
    capacity: usize,
    nodes: Vec<f64>,
}

impl RateTree {
    /// Create an empty tree with room for one slot.
    pub fn new() -> Self {
        Self {
            capacity: 1,
            nodes: vec![0.0; 2],
        }
    }

    /// Number of leaf slots currently allocated.
    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sum of all leaf rates.
    #[inline]
    pub fn total(&self) -> f64 {
        self.nodes[1]
    }

    /// Rate stored in `slot`, or 0 if never set.
    pub fn get(&self, slot: usize) -> f64 {
        if slot < self.capacity {
            self.nodes[self.capacity + slot]
        } else {
            0.0
        }
    }

    /// Set the rate of `slot`, growing the tree if needed.
    pub fn set(&mut self, slot: usize, rate: f64) {
        if slot >= self.capacity {
            self.grow(slot + 1);
        }

        let mut i = self.capacity + slot;
        self.nodes[i] = rate;
        i /= 2;
        while i >= 1 {
            self.nodes[i] = self.nodes[2 * i] + self.nodes[2 * i + 1];
            i /= 2;
        }
    }

    /// Zero every leaf, keeping the allocation.
    pub fn clear(&mut self) {
        self.nodes.fill(0.0);
    }

    /// Find the slot whose cumulative interval contains `target`.
    ///
    /// Slot `s` owns the half-open interval `[C(s-1), C(s))` where `C` is the
    /// prefix sum in slot order. A target exactly on a boundary therefore
    /// belongs to the later slot. Zero-rate slots own an empty interval and
    /// are never returned. Returns `None` when the total is zero.
    pub fn find(&self, target: f64) -> Option<usize> {
        if self.total() <= 0.0 {
            return None;
        }

        let mut remaining = target;
        let mut i = 1;
        while i < self.capacity {
            let left = self.nodes[2 * i];
            let right = self.nodes[2 * i + 1];
            // Rounding can push `remaining` past the left sum even when
            // nothing lies to the right; stay in the populated subtree.
            if remaining < left || right <= 0.0 {
                i *= 2;
            } else {
                remaining -= left;
                i = 2 * i + 1;
            }
        }

        Some(i - self.capacity)
    }

    fn grow(&mut self, min_capacity: usize) {
        let capacity = min_capacity.next_power_of_two().max(self.capacity * 2);
        let mut nodes = vec![0.0; 2 * capacity];
        nodes[capacity..capacity + self.capacity]
            .copy_from_slice(&self.nodes[self.capacity..2 * self.capacity]);

        for i in (1..capacity).rev() {
            nodes[i] = nodes[2 * i] + nodes[2 * i + 1];
        }

        self.capacity = capacity;
        self.nodes = nodes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with(rates: &[f64]) -> RateTree {
        let mut tree = RateTree::new();
        for (slot, rate) in rates.iter().enumerate() {
            tree.set(slot, *rate);
        }
        tree
    }

    #[test]
    fn test_total_tracks_updates() {
        let mut tree = tree_with(&[1.0, 2.0, 3.0]);
        assert_eq!(tree.total(), 6.0);

        tree.set(1, 0.0);
        assert_eq!(tree.total(), 4.0);

        tree.set(7, 0.5);
        assert_eq!(tree.total(), 4.5);
        assert_eq!(tree.capacity(), 8);
        assert_eq!(tree.get(7), 0.5);
        assert_eq!(tree.get(100), 0.0);
    }

    #[test]
    fn test_find_half_open_intervals() {
        let tree = tree_with(&[1.0, 2.0, 3.0]);

        assert_eq!(tree.find(0.0), Some(0));
        assert_eq!(tree.find(0.999), Some(0));
        // Boundary belongs to the later slot.
        assert_eq!(tree.find(1.0), Some(1));
        assert_eq!(tree.find(2.999), Some(1));
        assert_eq!(tree.find(3.0), Some(2));
        assert_eq!(tree.find(5.999), Some(2));
    }

    #[test]
    fn test_find_skips_zero_slots() {
        let tree = tree_with(&[0.0, 1.0, 0.0, 0.0, 2.0]);
        assert_eq!(tree.find(0.0), Some(1));
        assert_eq!(tree.find(1.0), Some(4));
        // Past the end (rounding) still lands on a populated slot.
        assert_eq!(tree.find(3.5), Some(4));
    }

    #[test]
    fn test_empty_tree_finds_nothing() {
        let mut tree = RateTree::new();
        assert_eq!(tree.find(0.0), None);

        tree.set(3, 1.0);
        tree.clear();
        assert_eq!(tree.total(), 0.0);
        assert_eq!(tree.find(0.0), None);
    }

    #[test]
    fn test_total_independent_of_update_history() {
        let direct = tree_with(&[0.1, 0.2, 0.3, 0.4]);

        let mut churned = RateTree::new();
        churned.set(3, 0.4);
        churned.set(0, 5.0);
        churned.set(1, 0.2);
        churned.set(0, 0.1);
        churned.set(2, 0.7);
        churned.set(2, 0.3);

        assert_eq!(direct.total().to_bits(), churned.total().to_bits());
    }
}
