//! Schema migration framework.

use fp_sim::{DEFAULT_PHASE, Phase};

use crate::ProjectError;
use crate::schema::ModelSpec;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut spec: ModelSpec) -> Result<ModelSpec, ProjectError> {
    while spec.version < LATEST_VERSION {
        spec = migrate_one_version(spec)?;
    }
    Ok(spec)
}

fn migrate_one_version(spec: ModelSpec) -> Result<ModelSpec, ProjectError> {
    match spec.version {
        0 => migrate_v0_to_v1(spec),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 0 files left the phase list implicit; spell out the single
/// whole-horizon phase so opportunity vectors have something to index.
fn migrate_v0_to_v1(mut spec: ModelSpec) -> Result<ModelSpec, ProjectError> {
    if spec.phases.is_empty() {
        spec.phases
            .push(Phase::new(DEFAULT_PHASE, spec.time.start, spec.time.end));
    }
    spec.version = 1;
    Ok(spec)
}
