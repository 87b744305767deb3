//! Deterministic per-entity RNG streams.
//!
//! # Determinism strategy
//!
//! A run is identified by a single `u64` seed.  Each stochastic entity (road,
//! car, driver, action selection) owns an independent `SmallRng` seeded by:
//!
//!   seed = run_seed XOR (stream_offset * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads the small fixed offsets across the seed space.  Entities
//! never share RNG state, so adding a draw in one component does not perturb
//! the sequence seen by another.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

// ── Stream ────────────────────────────────────────────────────────────────────

/// Fixed per-entity stream offsets derived from the run seed.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Stream {
    Road   = 1,
    Car    = 2,
    Driver = 3,
    Action = 4,
}

// ── SimRng ────────────────────────────────────────────────────────────────────

/// Seeded RNG owned by exactly one simulation entity.
///
/// Not `Sync` by intent: a run is single-threaded, and parallel batches give
/// every run its own set of streams.
#[derive(Clone, Debug)]
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// The RNG for one entity of the run seeded with `run_seed`.
    pub fn stream(run_seed: u64, stream: Stream) -> Self {
        let seed = run_seed ^ (stream as u64).wrapping_mul(MIXING_CONSTANT);
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Derive a child `SimRng` with a different seed offset.
    pub fn child(&mut self, offset: u64) -> SimRng {
        let child_seed: u64 = self.0.r#gen::<u64>() ^ offset.wrapping_mul(MIXING_CONSTANT);
        SimRng(SmallRng::seed_from_u64(child_seed))
    }

    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    /// Uniform sample in `[0, 1)`.
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.0.r#gen::<f64>()
    }

    /// Uniform sample between `low` and `high`.
    ///
    /// Unlike `gen_range` this tolerates `high < low` (and `high == low`),
    /// which the road generator relies on when the remaining distance is
    /// shorter than a segment's minimum length.
    #[inline]
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.unit()
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn chance(&mut self, p: f64) -> bool {
        self.unit() < p.clamp(0.0, 1.0)
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// Sample from `N(mean, std_dev)`.  A non-finite or negative `std_dev`
    /// degenerates to `mean`.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        match Normal::new(mean, std_dev) {
            Ok(dist) => dist.sample(&mut self.0),
            Err(_)   => mean,
        }
    }

    /// Choose a random element from a slice.
    /// Returns `None` if the slice is empty.
    #[inline]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        slice.choose(&mut self.0)
    }
}
