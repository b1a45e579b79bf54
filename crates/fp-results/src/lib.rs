//! fp-results: run histories, comparison and storage.

pub mod compare;
pub mod hash;
pub mod store;
pub mod types;

pub use compare::{Degradation, approx_eq, degradation, first_divergence};
pub use hash::{compute_run_id, fingerprint};
pub use store::RunStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Run {run_id} is corrupt: {what}")]
    Corrupt { run_id: String, what: String },
}
