//! Deterministic `JitterSource` implementations for tests.

use courier_core::jitter::JitterSource;

/// Always returns `0.0`, so backoff delays are exactly the base curve.
#[derive(Debug)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn next_fraction(&mut self) -> f64 {
        0.0
    }
}

/// Always returns the wrapped fraction.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn next_fraction(&mut self) -> f64 {
        self.0
    }
}
