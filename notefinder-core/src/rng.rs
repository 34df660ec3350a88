//! # Random Note Sampling Module
//!
//! A xorshift64 variant that folds a nanosecond timestamp into its state on
//! every draw. The user seed makes sequences hard to guess; the clock makes
//! them non-reproducible unless a fixed [`Clock`] is injected.
//!
//! The generator owns its state. Draws go through an atomic
//! compare-and-swap, so one generator can be shared between threads and
//! every call still observes and advances a single consistent sequence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// A source of nanosecond-scale timestamps.
pub trait Clock: Send + Sync {
    fn now_nanos(&self) -> u64;
}

/// Wall-clock nanoseconds since the Unix epoch.
///
/// This is wall time, not a monotonic counter: it follows clock
/// adjustments and may step backwards. Draws only need a fresh perturbation
/// per call, not an ordered one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> u64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => saturating_nanos(elapsed),
            // Clock set before 1970; the distance is still a usable sample.
            Err(e) => saturating_nanos(e.duration()),
        }
    }
}

/// Nanoseconds in `duration`, clamped to `u64::MAX` (about 584 years).
fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// A clock frozen at one timestamp. Makes draws reproducible in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_nanos(&self) -> u64 {
        self.0
    }
}

impl<F> Clock for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn now_nanos(&self) -> u64 {
        self()
    }
}

/// Multiplies the state by the timestamp and applies the 13/17/5 xorshift.
///
/// Multiplication wraps. A zero state is a fixed point.
pub fn mix(state: u64, timestamp: u64) -> u64 {
    let mut x = state.wrapping_mul(timestamp);
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    x
}

/// Time-perturbed xorshift generator.
#[derive(Debug)]
pub struct XorShift<C = SystemClock> {
    state: AtomicU64,
    clock: C,
}

impl XorShift<SystemClock> {
    /// Creates a generator seeded with `seed`, mixing in wall-clock time.
    ///
    /// Negative seeds are reinterpreted bit-for-bit as unsigned. A seed of
    /// zero never leaves zero, so every draw returns `low`.
    pub fn new(seed: i64) -> Self {
        Self::with_clock(seed, SystemClock)
    }
}

impl<C: Clock> XorShift<C> {
    pub fn with_clock(seed: i64, clock: C) -> Self {
        Self {
            state: AtomicU64::new(seed as u64),
            clock,
        }
    }

    /// Current internal state. Advances on every draw.
    pub fn state(&self) -> u64 {
        self.state.load(Ordering::Acquire)
    }

    /// Draws an integer in `[low, high]`, both ends inclusive.
    ///
    /// # Errors
    /// * [`Error::Range`] if `high < low`
    pub fn next(&self, low: i64, high: i64) -> Result<i64> {
        if high < low {
            return Err(Error::Range { low, high });
        }

        let timestamp = self.clock.now_nanos();
        // The closure never declines, so both arms carry the previous state.
        let (Ok(previous) | Err(previous)) =
            self.state
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                    Some(mix(s, timestamp))
                });
        let x = mix(previous, timestamp);

        let span = (high as i128 - low as i128 + 1) as u128;
        let offset = (x as u128 % span) as i128;
        Ok((low as i128 + offset) as i64)
    }

    /// Draws an index in `[0, len - 1]`.
    ///
    /// # Errors
    /// * [`Error::Range`] if `len` is zero
    pub fn next_index(&self, len: usize) -> Result<usize> {
        if len == 0 {
            return Err(Error::Range { low: 0, high: -1 });
        }
        let high = i64::try_from(len - 1)
            .map_err(|_| Error::InvalidArgument(format!("index range {len} is too large")))?;
        Ok(self.next(0, high)? as usize)
    }
}
