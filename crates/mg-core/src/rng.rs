//! The single deterministic RNG stream behind every stochastic decision.
//!
//! # Determinism strategy
//!
//! One [`EnvRng`] is seeded at environment construction.  Everything random —
//! the per-tick agent shuffle, attack hit rolls, stochastic mutations — draws
//! from it in a fixed call order, so a `(config, seed, action stream)` triple
//! fully determines a run.
//!
//! Randomly ordered queries are the one consumer that must not touch the
//! main stream: they may or may not be evaluated on a given tick depending
//! on which filters fire.  Instead the orchestrator draws one `tick_seed`
//! per tick (an unconditional draw, so call order stays fixed) and each
//! query derives a private child stream from `(tick_seed, query_id)` via
//! golden-ratio mixing.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

// ── EnvRng ────────────────────────────────────────────────────────────────────

/// The environment's deterministic RNG.
///
/// Intentionally `!Sync`: one instance belongs to exactly one environment,
/// and nothing inside a `step()` runs concurrently.
pub struct EnvRng(SmallRng);

impl EnvRng {
    /// Seed from the construction-time `u32` seed supplied by the host.
    pub fn new(seed: u32) -> Self {
        EnvRng(SmallRng::seed_from_u64(seed as u64))
    }

    /// Draw the per-tick seed used to derive child streams for randomly
    /// ordered queries.  Must be called exactly once per tick.
    #[inline]
    pub fn draw_tick_seed(&mut self) -> u64 {
        self.0.r#gen()
    }

    /// Derive an independent child stream for `(tick_seed, stream_id)`.
    ///
    /// Pure function of its inputs — repeated derivation within one tick
    /// yields the same stream, so query evaluation stays a pure function of
    /// world state plus the tick.
    pub fn child_stream(tick_seed: u64, stream_id: u64) -> SmallRng {
        SmallRng::seed_from_u64(tick_seed ^ stream_id.wrapping_mul(MIXING_CONSTANT))
    }

    /// Expose the inner `SmallRng` for use with `rand` distribution types.
    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
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

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Roll a percentage check: `true` with probability `pct / 100`.
    /// Always draws exactly one value, even for `pct >= 100`.
    #[inline]
    pub fn roll_pct(&mut self, pct: u32) -> bool {
        self.0.gen_range(0..100u32) < pct
    }

    /// Shuffle a mutable slice in-place (Fisher–Yates).
    #[inline]
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.0);
    }
}
