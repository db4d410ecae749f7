//! Sine-hash pseudo-random stream used by the curve generator.
//!
//! The whole stream is one `f64` state value. Each draw computes
//! `x = sin(state) * 10000`, advances `state` by one, and returns the
//! fractional part of `x`. The state is a plain `Copy` value threaded
//! through generation and handed back afterwards, so two generators
//! never share it and identical seeds reproduce identical curves.

use std::sync::atomic::{AtomicU64, Ordering};

use web_time::{SystemTime, UNIX_EPOCH};

/// Largest seed [`fresh_seed`] produces before adding the per-process
/// counter. Below 2^32 an `f64` still resolves `+1.0` steps exactly.
const CLOCK_SEED_MODULUS: u128 = 1 << 32;

/// Disambiguates seeds taken within the same clock tick.
static SEED_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Deterministic sine-hash random stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SineRng {
    state: f64,
}

impl SineRng {
    /// Start a stream at `seed`.
    #[must_use]
    pub const fn new(seed: f64) -> Self {
        Self { state: seed }
    }

    /// The current state; feeding it to [`new`](Self::new) resumes the
    /// stream exactly here.
    #[must_use]
    pub const fn state(self) -> f64 {
        self.state
    }

    /// Next value in `[0, 1)`.
    pub fn next_unit(&mut self) -> f64 {
        let x = self.state.sin() * 10_000.0;
        self.state += 1.0;
        x - x.floor()
    }

    /// Next value in `[min, max)`, computed as `min + r * (max - min)`.
    ///
    /// Unfused: a fused multiply-add rounds differently and can move a
    /// curve coordinate across a two-decimal rounding step.
    #[allow(clippy::suboptimal_flops)]
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        let r = self.next_unit();
        min + r * (max - min)
    }

    /// Next coin flip.
    pub fn next_bool(&mut self) -> bool {
        self.next_unit() > 0.5
    }
}

/// A seed derived from the wall clock.
///
/// Nanoseconds since the epoch are folded below 2^32 (so the generator's
/// `+1` steps stay exact) and offset by a process-wide counter. Calls in
/// the same clock tick get different seeds; in general two calls are
/// distinct with overwhelming probability, not guaranteed distinct (the
/// folded clock can step back by exactly as much as the counter moved).
#[must_use]
pub fn fresh_seed() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let folded = u32::try_from(nanos % CLOCK_SEED_MODULUS).unwrap_or(0);
    let count = SEED_COUNTER.fetch_add(1, Ordering::Relaxed);
    // Counter wraps long before precision is lost.
    let bump = u32::try_from(count % u64::from(u32::MAX)).unwrap_or(0);
    f64::from(folded) + f64::from(bump)
}
