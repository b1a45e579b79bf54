//! fp-spec: model file format and validation.
//!
//! A model file declares flows, blocks, phases and scenarios in YAML or
//! JSON. Loading migrates old versions forward and validates; saving
//! validates first.

pub mod convert;
pub mod migrate;
pub mod schema;
pub mod validate;

use std::path::Path;

pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;
pub use validate::{ValidationError, validate_spec};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("Model error: {0}")]
    Config(#[from] fp_core::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn finish(spec: ModelSpec) -> ProjectResult<ModelSpec> {
    let spec = migrate_to_latest(spec)?;
    validate_spec(&spec)?;
    Ok(spec)
}

pub fn parse_yaml(content: &str) -> ProjectResult<ModelSpec> {
    finish(serde_yaml::from_str(content)?)
}

pub fn parse_json(content: &str) -> ProjectResult<ModelSpec> {
    finish(serde_json::from_str(content)?)
}

pub fn load_yaml(path: &Path) -> ProjectResult<ModelSpec> {
    let content = std::fs::read_to_string(path)?;
    parse_yaml(&content)
}

pub fn save_yaml(path: &Path, spec: &ModelSpec) -> ProjectResult<()> {
    validate_spec(spec)?;
    let content = serde_yaml::to_string(spec)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ProjectResult<ModelSpec> {
    let content = std::fs::read_to_string(path)?;
    parse_json(&content)
}

pub fn save_json(path: &Path, spec: &ModelSpec) -> ProjectResult<()> {
    validate_spec(spec)?;
    let content = serde_json::to_string_pretty(spec)?;
    std::fs::write(path, content)?;
    Ok(())
}
