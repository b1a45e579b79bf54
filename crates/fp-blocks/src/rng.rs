//! Deterministic random number generation.
//!
//! Every block owns one PCG stream derived from the run seed and the block's
//! index, so draws never depend on how many other blocks sampled first or on
//! which worker thread runs the scenario.

use rand::prelude::*;
use rand_pcg::Pcg64;

/// Golden-ratio increment used to spread stream seeds apart.
const STREAM_SPREAD: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone)]
pub struct SimRng {
    seed: u64,
    stream: u64,
    rng: Pcg64,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self::stream(seed, 0)
    }

    /// Independent stream `stream` of the master `seed`.
    pub fn stream(seed: u64, stream: u64) -> Self {
        let derived = seed.wrapping_add(stream.wrapping_mul(STREAM_SPREAD));
        Self {
            seed,
            stream,
            rng: Pcg64::seed_from_u64(derived),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stream_index(&self) -> u64 {
        self.stream
    }

    /// Uniform f64 in [0, 1).
    pub fn gen_f64(&mut self) -> f64 {
        self.rng.r#gen()
    }

    pub fn gen_range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.gen_f64()
    }

    /// Standard normal sample via Box-Muller.
    pub fn gen_standard_normal(&mut self) -> f64 {
        let u1 = self.gen_f64().max(f64::EPSILON);
        let u2 = self.gen_f64();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    pub fn gen_normal(&mut self, mean: f64, std: f64) -> f64 {
        mean + std * self.gen_standard_normal()
    }

    /// Seed for a derived run (e.g. a parameter replicate).
    pub fn derive_seed(seed: u64, index: u64) -> u64 {
        Self::stream(seed, index.wrapping_add(1)).rng.r#gen()
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::new(0)
    }
}
