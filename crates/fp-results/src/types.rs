//! Result data types.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub type RunId = String;

/// Field values of every flow, keyed by flow name then field name.
pub type FlowValues = BTreeMap<String, BTreeMap<String, f64>>;

/// Observable state and active faults of one block at one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub state: BTreeMap<String, f64>,
    pub faults: BTreeSet<String>,
}

/// Settled model state at one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub index: usize,
    pub time: f64,
    pub flows: FlowValues,
    pub blocks: BTreeMap<String, BlockRecord>,
    /// Product of draw densities so far, when density tracking is on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
}

/// The static fixed point did not settle within the pass cap.
///
/// Recoverable: the run keeps the last computed values for that step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error(
    "static propagation did not converge at step {index} (t={time}) after {passes} passes, max change {max_change}"
)]
pub struct ConvergenceWarning {
    pub index: usize,
    pub time: f64,
    pub passes: usize,
    pub max_change: f64,
}

/// Recorded time series of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub scenario: String,
    pub seed: u64,
    pub snapshots: Vec<Snapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ConvergenceWarning>,
}

impl History {
    pub fn new(scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            scenario: scenario.into(),
            seed,
            snapshots: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn times(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.time).collect()
    }

    /// One flow field over time. `None` if the flow or field is unknown.
    pub fn flow_series(&self, flow: &str, field: &str) -> Option<Vec<f64>> {
        self.snapshots
            .iter()
            .map(|s| s.flows.get(flow).and_then(|f| f.get(field)).copied())
            .collect()
    }

    /// One block state entry over time.
    pub fn block_series(&self, block: &str, key: &str) -> Option<Vec<f64>> {
        self.snapshots
            .iter()
            .map(|s| s.blocks.get(block).and_then(|b| b.state.get(key)).copied())
            .collect()
    }

    /// Whether `mode` is active on `block` at each step.
    pub fn fault_series(&self, block: &str, mode: &str) -> Vec<bool> {
        self.snapshots
            .iter()
            .map(|s| s.blocks.get(block).is_some_and(|b| b.faults.contains(mode)))
            .collect()
    }

    /// Time the first fault appeared on `block`, if ever.
    pub fn first_fault_time(&self, block: &str) -> Option<f64> {
        self.snapshots
            .iter()
            .find(|s| s.blocks.get(block).is_some_and(|b| !b.faults.is_empty()))
            .map(|s| s.time)
    }
}

/// Metadata stored next to a saved run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub model: String,
    pub scenario: String,
    pub seed: u64,
    pub timestamp: String,
    pub snapshots: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ConvergenceWarning>,
    pub engine_version: String,
}

impl RunManifest {
    pub fn for_history(
        run_id: RunId,
        model: impl Into<String>,
        history: &History,
        engine_version: impl Into<String>,
    ) -> Self {
        Self {
            run_id,
            model: model.into(),
            scenario: history.scenario.clone(),
            seed: history.seed,
            timestamp: chrono::Utc::now().to_rfc3339(),
            snapshots: history.len(),
            warnings: history.warnings.clone(),
            engine_version: engine_version.into(),
        }
    }
}
