//! Block-internal timers.
//!
//! A timer accumulates simulated time while some condition holds. Callers
//! only increment it when the step has strictly advanced, so a replayed
//! invocation never double-counts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    /// Accumulated time.
    pub time: f64,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one step.
    pub fn inc(&mut self, dt: f64) {
        self.time += dt;
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
    }

    /// True once the accumulated time strictly exceeds `limit`.
    pub fn exceeds(&self, limit: f64) -> bool {
        self.time > limit
    }
}
