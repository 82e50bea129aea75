//! Fixture graphs shared by the test suites of every crate.
//!
//! Each fixture comes in two forms: a `*_source` returning the
//! [`InMemorySource`] and a plain function returning the loaded [`Graph`].

use kmc_types::{Graph, InMemorySource, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn load(source: InMemorySource) -> Graph {
    Graph::load(&source).expect("fixture graphs are well formed")
}

/// One site, id 0, no neighbours.
pub fn single_site_source() -> InMemorySource {
    InMemorySource::new().with_node(0, Vec3::ZERO)
}

/// One site, id 0, no neighbours.
pub fn single_site() -> Graph {
    load(single_site_source())
}

/// Displacement stored on the ring's only pair.
///
/// Site B sits at x = 1.5 in a box of length 2, so the minimum-image
/// vector from A to B points backwards across the boundary.
pub const RING_DISPLACEMENT: Vec3 = Vec3::new(-0.5, 0.0, 0.0);

/// Two sites A (id 0) and B (id 1) joined across the periodic boundary.
pub fn two_site_ring_source(rate_ab: f64, rate_ba: f64) -> InMemorySource {
    InMemorySource::new()
        .with_node(0, Vec3::new(0.0, 0.0, 0.0))
        .with_node(1, Vec3::new(1.5, 0.0, 0.0))
        .with_pair(0, 1, RING_DISPLACEMENT, rate_ab, rate_ba)
}

/// Two sites A (id 0) and B (id 1) joined across the periodic boundary.
pub fn two_site_ring(rate_ab: f64, rate_ba: f64) -> Graph {
    load(two_site_ring_source(rate_ab, rate_ba))
}

/// Sites 0, 1, 2 on the x axis; 0↔1 at rate 1.0 and 1↔2 at rate 2.0.
pub fn three_site_chain_source() -> InMemorySource {
    let step = Vec3::new(1.0, 0.0, 0.0);
    InMemorySource::new()
        .with_node(0, Vec3::new(0.0, 0.0, 0.0))
        .with_node(1, Vec3::new(1.0, 0.0, 0.0))
        .with_node(2, Vec3::new(2.0, 0.0, 0.0))
        .with_pair(0, 1, step, 1.0, 1.0)
        .with_pair(1, 2, step, 2.0, 2.0)
}

/// Sites 0, 1, 2 on the x axis; 0↔1 at rate 1.0 and 1↔2 at rate 2.0.
pub fn three_site_chain() -> Graph {
    load(three_site_chain_source())
}

/// Simple cubic lattice of `n³` sites with periodic wrap and uniform rates.
///
/// Site ids are `x + n*y + n²*z`.
///
/// # Panics
///
/// Panics if `n < 3` (smaller boxes would list the same pair twice).
pub fn periodic_cubic_source(n: u64, spacing: f64, rate: f64) -> InMemorySource {
    cubic_source(n, spacing, |_| (rate, rate))
}

/// See [`periodic_cubic_source`].
pub fn periodic_cubic(n: u64, spacing: f64, rate: f64) -> Graph {
    load(periodic_cubic_source(n, spacing, rate))
}

/// Periodic cubic lattice with independent random forward/backward rates
/// in `[0.1, 10)`, drawn from a seeded generator.
pub fn disordered_cubic_source(n: u64, spacing: f64, seed: u64) -> InMemorySource {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    cubic_source(n, spacing, |_| {
        (rng.gen_range(0.1..10.0), rng.gen_range(0.1..10.0))
    })
}

/// See [`disordered_cubic_source`].
pub fn disordered_cubic(n: u64, spacing: f64, seed: u64) -> Graph {
    load(disordered_cubic_source(n, spacing, seed))
}

fn cubic_source(
    n: u64,
    spacing: f64,
    mut rates: impl FnMut(u64) -> (f64, f64),
) -> InMemorySource {
    assert!(n >= 3, "periodic cubic fixtures need at least 3 sites per side");

    let id = |x: u64, y: u64, z: u64| x + n * y + n * n * z;
    let mut source = InMemorySource::new();

    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let position = Vec3::new(x as f64, y as f64, z as f64) * spacing;
                source = source.with_node(id(x, y, z), position);
            }
        }
    }

    let axes = [
        Vec3::new(spacing, 0.0, 0.0),
        Vec3::new(0.0, spacing, 0.0),
        Vec3::new(0.0, 0.0, spacing),
    ];
    let mut pair = 0;
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let from = id(x, y, z);
                let neighbours = [
                    id((x + 1) % n, y, z),
                    id(x, (y + 1) % n, z),
                    id(x, y, (z + 1) % n),
                ];
                for (to, displacement) in neighbours.into_iter().zip(axes) {
                    let (forward, backward) = rates(pair);
                    source = source.with_pair(from, to, displacement, forward, backward);
                    pair += 1;
                }
            }
        }
    }

    source
}
