//! Behavioral blocks for faultprop models.
//!
//! A block reads and writes the flows it is connected to through a
//! [`BlockContext`], which enforces the flow field sets, rejects non-finite
//! writes and only lets declared fault modes become active.
//!
//! # Architecture
//!
//! - Flows are plain field maps ([`FlowState`]) owned by the model's arena
//! - Block kinds are tagged variants ([`BlockKind`]) implementing [`Behavior`]
//! - Fault modes live in an ordered registry ([`FaultModes`])
//! - Stochastic variables draw from a per-block seeded PCG stream ([`SimRng`])

pub mod behavior;
pub mod block;
pub mod error;
pub mod flow;
pub mod integrator;
pub mod linear;
pub mod mode;
pub mod pump;
pub mod random;
pub mod rng;
pub mod schedule;
pub mod source;
pub mod timer;

pub use behavior::{Behavior, BlockContext, FieldRef, Role};
pub use block::{Block, BlockKind};
pub use error::{BlockError, BlockResult};
pub use flow::FlowState;
pub use integrator::Integrator;
pub use linear::{Linear, Term};
pub use mode::{FaultMode, FaultModes, FaultSet};
pub use pump::Pump;
pub use random::{Distribution, RandState, RandVar, StochasticMode, UpdateRule};
pub use rng::SimRng;
pub use schedule::{Schedule, Segment};
pub use source::{FaultOutput, Noise, Source, Trip};
pub use timer::Timer;
