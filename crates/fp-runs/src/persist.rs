//! Saving batch results to a run store.

use fp_results::{RunId, RunManifest, RunStore, compute_run_id};
use serde::Serialize;
use tracing::debug;

use crate::batch::BatchResults;
use crate::error::RunsResult;

/// Version tag folded into run ids.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Save every successful run of a batch, returning (scenario id, run id)
/// pairs. Runs already in the store are not written again.
///
/// `model_key` is any serializable description of the model; its content
/// goes into the run id.
pub fn save_batch<M: Serialize>(
    store: &RunStore,
    model_key: &M,
    model_name: &str,
    results: &BatchResults,
) -> RunsResult<Vec<(String, RunId)>> {
    let mut saved = Vec::new();
    for (scenario, result) in results {
        let Ok(history) = result else {
            continue;
        };
        let run_id = compute_run_id(model_key, scenario, history.seed, ENGINE_VERSION);
        if store.has_run(&run_id) {
            debug!(run_id = %run_id, "run already stored");
        } else {
            let manifest =
                RunManifest::for_history(run_id.clone(), model_name, history, ENGINE_VERSION);
            store.save_run(&manifest, history)?;
        }
        saved.push((scenario.clone(), run_id));
    }
    Ok(saved)
}
