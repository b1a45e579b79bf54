//! Error types for block behaviors.

use thiserror::Error;

/// Result type for block operations.
pub type BlockResult<T> = Result<T, BlockError>;

/// Errors raised while a block's condition or behavior runs.
///
/// These fail the enclosing run only; the engine wraps them with the block
/// name and time.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BlockError {
    #[error("Port {port} out of range ({len} ports connected)")]
    PortOutOfRange { port: usize, len: usize },

    #[error("Unknown field '{field}' on flow at role '{role}'")]
    UnknownField { role: String, field: String },

    #[error("Non-finite value {value} written to '{role}.{field}'")]
    NonFinite {
        role: String,
        field: String,
        value: f64,
    },

    #[error("Flow '{role}.{field}' is read-only during a condition")]
    ReadOnly { role: String, field: String },

    #[error("Fault mode '{mode}' is not declared")]
    UnknownMode { mode: String },

    #[error("Random variable '{name}' is not declared")]
    UnknownVariable { name: String },

    #[error("Invalid distribution: {what}")]
    InvalidDistribution { what: &'static str },

    #[error("Unknown parameter '{param}'")]
    UnknownParam { param: String },

    #[error("Invalid value for parameter '{param}': {reason}")]
    InvalidParam { param: String, reason: String },
}
