//! fp-core: stable foundation for faultprop.
//!
//! Contains:
//! - numeric (tolerances and grid helpers)
//! - ids (stable compact IDs for flows, blocks and ports)
//! - error (build-time configuration errors)

pub mod error;
pub mod ids;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use error::{ConfigError, ConfigResult};
pub use ids::*;
pub use numeric::*;
