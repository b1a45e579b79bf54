//! Content-based hashing for run IDs and history fingerprints.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::History;

pub fn compute_run_id<M: Serialize>(
    model: &M,
    scenario: &str,
    seed: u64,
    engine_version: &str,
) -> String {
    let mut hasher = Sha256::new();

    let model_json = serde_json::to_string(model).unwrap_or_default();
    hasher.update(model_json.as_bytes());

    hasher.update(scenario.as_bytes());
    hasher.update(seed.to_le_bytes());
    hasher.update(engine_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}

/// SHA-256 of the serialized history. Equal fingerprints mean byte-identical
/// JSON output.
pub fn fingerprint(history: &History) -> String {
    let mut hasher = Sha256::new();
    let json = serde_json::to_vec(history).unwrap_or_default();
    hasher.update(&json);
    format!("{:x}", hasher.finalize())
}
