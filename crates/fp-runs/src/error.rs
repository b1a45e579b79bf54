//! Error types for the orchestration layer.

use fp_core::ConfigError;
use fp_results::ResultsError;
use fp_sim::SimError;

/// Errors that stop a whole batch.
///
/// Failures of individual scenarios are not reported here; they are kept in
/// the scenario's result slot.
#[derive(Debug, thiserror::Error)]
pub enum RunsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    #[error("Results error: {0}")]
    Results(#[from] ResultsError),

    #[error("Duplicate scenario id '{id}' in batch")]
    DuplicateScenario { id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type RunsResult<T> = Result<T, RunsError>;
