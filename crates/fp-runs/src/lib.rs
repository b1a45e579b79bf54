//! Scenario orchestration for faultprop.
//!
//! This crate sits on top of the engine and turns a model into batches of
//! runs: single-fault sweeps, staged batches forked off a shared nominal
//! run, nested parameter x fault approaches, classification of the results
//! and persistence to a run store.

pub mod batch;
pub mod classify;
pub mod error;
pub mod nested;
pub mod persist;
pub mod progress;
pub mod sweep;

pub use batch::{BatchOptions, BatchResults, run_batch, run_with_nominal};
pub use classify::{
    Classification, Classifier, ExpectedCost, FlowCost, LossKind, classify_batch, total_expected_cost,
};
pub use error::{RunsError, RunsResult};
pub use nested::{NestedApproach, NestedResults, Replicate, ReplicateGroup, run_nested};
pub use persist::{ENGINE_VERSION, save_batch};
pub use progress::{BatchProgress, ProgressFn};
pub use sweep::{FaultSweep, SampleTimes};
