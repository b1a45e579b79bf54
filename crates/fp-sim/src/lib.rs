//! Discrete-time fault propagation for faultprop models.
//!
//! Provides:
//! - Runtime models built from blocks, flows and phases
//! - Scenarios of timed fault injections and parameter overrides
//! - A stepping engine with static fixed-point resolution
//! - Forkable run state for staged execution
//! - A reproducibility check

pub mod check;
pub mod engine;
pub mod error;
pub mod model;
pub mod scenario;
pub mod time;

pub use check::{ReproducibilityViolation, check_reproducible};
pub use engine::{DEFAULT_MAX_STATIC_PASSES, EndCondition, SimOptions, Simulation, run_scenario};
pub use error::{SimError, SimResult};
pub use model::{DEFAULT_PHASE, Model, ModelBuilder};
pub use scenario::{Injection, NOMINAL, ParamOverride, Scenario, ScenarioKind, single_fault_id};
pub use time::{MAX_STEPS, Phase, TimeParams, phase_of};
