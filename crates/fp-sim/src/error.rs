//! Error types for simulation runs.

use fp_blocks::BlockError;
use fp_core::ConfigError;
use thiserror::Error;

use crate::check::ReproducibilityViolation;

/// Errors that end a single run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Block '{block}' failed at t={time}: {source}")]
    Behavior {
        block: String,
        time: f64,
        #[source]
        source: BlockError,
    },

    #[error(transparent)]
    NotReproducible(#[from] ReproducibilityViolation),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub(crate) fn behavior(block: &str, time: f64, source: BlockError) -> Self {
        SimError::Behavior {
            block: block.to_string(),
            time,
            source,
        }
    }
}
