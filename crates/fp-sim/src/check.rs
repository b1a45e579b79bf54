//! Reproducibility check used by test harnesses.

use fp_core::Tolerances;
use fp_results::{History, fingerprint, first_divergence};
use thiserror::Error;
use tracing::error;

use crate::engine::{SimOptions, run_scenario};
use crate::error::SimResult;
use crate::model::Model;
use crate::scenario::Scenario;

/// Two runs with the same seed produced different Histories.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "scenario '{scenario}' (seed {seed}) is not reproducible: fingerprint {first} vs {second}, first divergence at {divergence:?}"
)]
pub struct ReproducibilityViolation {
    pub scenario: String,
    pub seed: u64,
    pub first: String,
    pub second: String,
    /// Snapshot index where the runs first differ.
    pub divergence: Option<usize>,
}

/// Run `scenario` twice and compare the serialized Histories byte for byte.
pub fn check_reproducible(
    model: &Model,
    scenario: &Scenario,
    seed: u64,
    options: &SimOptions,
) -> SimResult<History> {
    let first = run_scenario(model, scenario, seed, options)?;
    let second = run_scenario(model, scenario, seed, options)?;
    let (a, b) = (fingerprint(&first), fingerprint(&second));
    if a != b {
        let exact = Tolerances { abs: 0.0, rel: 0.0 };
        let divergence = first_divergence(&first, &second, exact);
        error!(scenario = %scenario.id, seed, ?divergence, "runs diverged");
        return Err(ReproducibilityViolation {
            scenario: scenario.id.clone(),
            seed,
            first: a,
            second: b,
            divergence,
        }
        .into());
    }
    Ok(first)
}
