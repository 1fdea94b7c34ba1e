//! Exponential backoff with full jitter.
//!
//! The wait before retry `attempt` (0 for the first retry) is
//! `min + min(max - min, min * 2^attempt) * r` with `r` drawn uniformly from
//! `[0, 1)`. The result always lies in `[min, max]` and its expected value
//! grows with `attempt` until the curve saturates at `max`. `max` is a hard
//! ceiling: when `min > max` every wait is `max`.
//!
//! The random source lives for the whole process behind `Backoff::global`,
//! and tests substitute a seeded generator through `Backoff::new`.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Exponent cap; `2^62` already dwarfs any sane ratio of `max` to `min`.
const MAX_EXPONENT: u32 = 62;

/// Jittered backoff calculator owning its random source.
pub struct Backoff {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl Backoff {
    pub fn new(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// Backoff seeded once from the operating system.
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Process-wide instance shared by every client that is not given its own.
    pub fn global() -> Arc<Backoff> {
        static GLOBAL: OnceLock<Arc<Backoff>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Backoff::from_os_rng())).clone()
    }

    /// Wait before retry number `attempt`, bounded by `min` and `max`.
    pub fn duration(&self, min: Duration, max: Duration, attempt: u32) -> Duration {
        let jitter: f64 = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random();
        scaled(min, max, attempt, jitter)
    }
}

impl std::fmt::Debug for Backoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backoff").finish_non_exhaustive()
    }
}

/// Upper bound of the wait for `attempt`: the envelope jitter scales into.
pub fn envelope(min: Duration, max: Duration, attempt: u32) -> Duration {
    scaled(min, max, attempt, 1.0)
}

fn scaled(min: Duration, max: Duration, attempt: u32, jitter: f64) -> Duration {
    let max = max.as_secs_f64();
    let min = min.as_secs_f64().min(max);
    let growth = min * 2f64.powi(attempt.min(MAX_EXPONENT) as i32);
    let wait = min + (max - min).min(growth) * jitter.clamp(0.0, 1.0);
    Duration::from_secs_f64(wait.min(max))
}
