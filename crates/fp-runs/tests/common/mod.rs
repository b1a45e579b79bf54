//! Fixtures shared by the orchestration tests.

#![allow(dead_code)]

use std::path::Path;

use fp_sim::Model;
use fp_spec::ModelSpec;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn pump_spec() -> ModelSpec {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../models/pump.yaml");
    fp_spec::load_yaml(&path).unwrap_or_else(|e| panic!("Failed to load pump.yaml: {}", e))
}

pub fn pump_model() -> Model {
    pump_spec().build_model().unwrap()
}
