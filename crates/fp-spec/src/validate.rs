//! Model file validation logic.
//!
//! Checks what can be decided from the file alone. Field names, role counts
//! and mode references inside block kinds are left to the model builder.

use std::collections::{HashMap, HashSet};

use fp_blocks::BlockKind;
use fp_sim::MAX_STEPS;

use crate::schema::{BlockDef, FlowDef, ModelSpec};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported feature: {feature} - {reason}")]
    Unsupported { feature: String, reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_spec(spec: &ModelSpec) -> Result<(), ValidationError> {
    if spec.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: spec.version,
        });
    }
    if spec.name.trim().is_empty() {
        return Err(invalid("name", "\"\"", "model name must not be empty"));
    }

    let time = spec.time;
    if !(time.start.is_finite() && time.end.is_finite()) || time.end < time.start {
        return Err(invalid(
            "time",
            format!("[{}, {}]", time.start, time.end),
            "need finite start <= end",
        ));
    }
    if !(time.dt.is_finite() && time.dt > 0.0) {
        return Err(invalid("time.dt", time.dt, "must be finite and positive"));
    }
    if (time.end - time.start) / time.dt >= MAX_STEPS as f64 {
        return Err(invalid(
            "time",
            format!("[{}, {}] at dt {}", time.start, time.end, time.dt),
            "horizon holds too many steps",
        ));
    }

    let mut phase_names = HashSet::new();
    for phase in &spec.phases {
        if !phase_names.insert(&phase.name) {
            return Err(ValidationError::DuplicateId {
                id: phase.name.clone(),
                context: "phases".to_string(),
            });
        }
    }

    let mut flow_names = HashSet::new();
    for flow in &spec.flows {
        if !flow_names.insert(flow.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: flow.name.clone(),
                context: "flows".to_string(),
            });
        }
        validate_flow(flow)?;
    }

    let phase_count = spec.phases.len().max(1);
    let mut blocks = HashMap::new();
    for block in &spec.blocks {
        if blocks.insert(block.name.as_str(), block).is_some() {
            return Err(ValidationError::DuplicateId {
                id: block.name.clone(),
                context: "blocks".to_string(),
            });
        }
        validate_block(block, &flow_names, phase_count)?;
    }

    let mut scenario_ids = HashSet::new();
    for scenario in &spec.scenarios {
        if !scenario_ids.insert(&scenario.id) {
            return Err(ValidationError::DuplicateId {
                id: scenario.id.clone(),
                context: "scenarios".to_string(),
            });
        }
        let context = format!("scenario '{}'", scenario.id);
        for injection in &scenario.injections {
            let Some(block) = blocks.get(injection.block.as_str()) else {
                return Err(ValidationError::MissingReference {
                    id: injection.block.clone(),
                    context,
                });
            };
            if !block.modes.contains(&injection.mode) {
                return Err(ValidationError::MissingReference {
                    id: format!("{}.{}", injection.block, injection.mode),
                    context,
                });
            }
        }
        for param in &scenario.params {
            if !blocks.contains_key(param.block.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: param.block.clone(),
                    context,
                });
            }
        }
        if !(scenario.rate.is_finite() && scenario.rate >= 0.0) {
            return Err(invalid(
                format!("{context}.rate"),
                scenario.rate,
                "must be finite and non-negative",
            ));
        }
    }

    Ok(())
}

fn validate_flow(flow: &FlowDef) -> Result<(), ValidationError> {
    if flow.fields.is_empty() {
        return Err(invalid(
            format!("flow '{}'.fields", flow.name),
            "{}",
            "a flow needs at least one field",
        ));
    }
    for (field, value) in &flow.fields {
        if !value.is_finite() {
            return Err(invalid(
                format!("flow '{}'.{field}", flow.name),
                value,
                "initial values must be finite",
            ));
        }
    }
    Ok(())
}

fn validate_block(
    block: &BlockDef,
    flow_names: &HashSet<&str>,
    phase_count: usize,
) -> Result<(), ValidationError> {
    let context = format!("block '{}' flows", block.name);
    for flow in &block.flows {
        if !flow_names.contains(flow.as_str()) {
            return Err(ValidationError::MissingReference {
                id: flow.clone(),
                context,
            });
        }
    }

    if !(block.failrate.is_finite() && block.failrate >= 0.0) {
        return Err(invalid(
            format!("block '{}'.failrate", block.name),
            block.failrate,
            "must be finite and non-negative",
        ));
    }

    if matches!(block.kind, BlockKind::Integrator(_)) && block.dynamic == Some(false) {
        return Err(ValidationError::Unsupported {
            feature: format!("static integrator '{}'", block.name),
            reason: "integrators accumulate once per step and must be dynamic".to_string(),
        });
    }

    for (name, mode) in block.modes.iter() {
        if !(mode.dist.is_finite() && mode.dist >= 0.0) {
            return Err(invalid(
                format!("block '{}' mode '{name}'.dist", block.name),
                mode.dist,
                "must be finite and non-negative",
            ));
        }
        if mode.opportunity.len() != phase_count {
            return Err(invalid(
                format!("block '{}' mode '{name}'.opportunity", block.name),
                format!("{:?}", mode.opportunity),
                "needs one weight per phase",
            ));
        }
    }

    for (name, var) in &block.random {
        if !var.default.is_finite() {
            return Err(invalid(
                format!("block '{}' random '{name}'.default", block.name),
                var.default,
                "must be finite",
            ));
        }
    }
    Ok(())
}
