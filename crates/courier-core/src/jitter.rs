//! Jitter source for retry backoff.
//!
//! In production this wraps a real RNG. In tests a fixed source is injected
//! so backoff windows are exact.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of the random fraction used to spread retry times.
pub trait JitterSource: Send + Sync {
    /// Returns a value in `[0.0, 1.0)`.
    fn next_fraction(&mut self) -> f64;
}

/// OS-seeded jitter used by the running service.
#[derive(Debug)]
pub struct RandomJitter {
    rng: StdRng,
}

impl RandomJitter {
    /// Seeds a new generator from the operating system.
    #[must_use]
    pub fn from_os() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Seeds a new generator from a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl JitterSource for RandomJitter {
    fn next_fraction(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}
