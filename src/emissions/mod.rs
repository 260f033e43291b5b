// Copyright (c) 2026 open-pit-labs
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/open-pit-labs/pitwatch-rs

//! Carbon accumulator - session-scoped monotonic emissions total

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing carbon total in kg CO2e.
///
/// One instance per engine session; reset only on session restart. Updates
/// use a CAS loop over the f64 bit pattern, so the single tick executor and
/// any readers never need a lock.
#[derive(Debug, Default)]
pub struct CarbonAccumulator {
    bits: AtomicU64,
}

impl CarbonAccumulator {
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// Atomically add a non-negative delta, returning the new total.
    /// Negative deltas are ignored; the total never decreases.
    pub fn add(&self, delta: f64) -> f64 {
        if !(delta > 0.0) {
            return self.total();
        }
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self.bits.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return f64::from_bits(next),
                Err(observed) => current = observed,
            }
        }
    }

    pub fn total(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Session restart only.
    pub fn reset(&self) {
        self.bits.store(0f64.to_bits(), Ordering::Release);
    }
}
