//! Step semantics: static fixed point, dynamic blocks, warnings, errors.

mod common;

use fp_blocks::BlockError;
use fp_sim::{Scenario, SimError, SimOptions, Simulation, run_scenario};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn chain_satisfies_block_equations_every_step() {
    init_tracing();
    let model = common::chain_model();
    let history = run_scenario(&model, &Scenario::nominal(), 0, &SimOptions::default()).unwrap();

    assert_eq!(history.len(), 5);
    assert!(history.warnings.is_empty());
    for snap in &history.snapshots {
        let a = snap.flows["a"]["x"];
        let b = snap.flows["b"]["x"];
        let c = snap.flows["c"]["x"];
        assert_eq!(a, 1.5);
        assert_eq!(b, 2.0 * a);
        assert_eq!(c, 3.0 * b);
    }
}

#[test]
fn dynamic_block_runs_once_per_step() {
    let model = common::chain_model();
    let history = run_scenario(&model, &Scenario::nominal(), 0, &SimOptions::default()).unwrap();
    assert_eq!(
        history.flow_series("d", "x"),
        Some(vec![0.0, 9.0, 18.0, 27.0, 36.0])
    );
    assert_eq!(
        history.block_series("total", "value"),
        Some(vec![0.0, 9.0, 18.0, 27.0, 36.0])
    );
}

#[test]
fn snapshot_indices_and_times_are_contiguous() {
    let model = common::pump_model(false);
    let history = run_scenario(&model, &Scenario::nominal(), 0, &SimOptions::default()).unwrap();
    assert_eq!(history.len(), 56);
    for (i, snap) in history.snapshots.iter().enumerate() {
        assert_eq!(snap.index, i);
        assert_eq!(snap.time, i as f64);
        assert!(snap.density.is_none());
    }
}

#[test]
fn coupled_pair_reaches_known_fixed_point() {
    init_tracing();
    let model = common::coupled_model();
    assert!(model.order().has_static_cycles());

    let mut sim = Simulation::new(&model, Scenario::nominal(), 0, SimOptions::default()).unwrap();
    sim.step().unwrap();
    let passes = sim.last_static_passes();
    assert!(passes > 1 && passes < fp_sim::DEFAULT_MAX_STATIC_PASSES, "{passes} passes");

    sim.run_to_end().unwrap();
    let history = sim.into_history();
    assert!(history.warnings.is_empty());
    for snap in &history.snapshots {
        assert!((snap.flows["p"]["x"] - 4.0 / 3.0).abs() < 1e-8);
        assert!((snap.flows["q"]["x"] - 2.0 / 3.0).abs() < 1e-8);
    }
}

#[test]
fn settled_steps_need_a_single_pass() {
    let model = common::coupled_model();
    let mut sim = Simulation::new(&model, Scenario::nominal(), 0, SimOptions::default()).unwrap();
    sim.run_until(2).unwrap();
    assert_eq!(sim.index(), 2);
    assert_eq!(sim.last_static_passes(), 1);
}

#[test]
fn pass_cap_is_a_recoverable_warning() {
    let model = common::coupled_model();
    let opts = SimOptions {
        max_static_passes: 3,
        ..SimOptions::default()
    };
    let history = run_scenario(&model, &Scenario::nominal(), 0, &opts).unwrap();

    assert_eq!(history.len(), 4);
    let first = &history.warnings[0];
    assert_eq!(first.index, 0);
    assert_eq!(first.passes, 3);
    assert!(first.max_change > 0.0);
    // Values after the third pass are kept.
    assert_eq!(history.snapshots[0].flows["p"]["x"], 1.3125);
}

#[test]
fn end_condition_truncates_history() {
    let model = common::pump_model(false);
    let opts = SimOptions::default().with_end_condition(|_, snap| snap.flows["wat_2"]["rate"] > 0.5);
    let history = run_scenario(&model, &Scenario::nominal(), 0, &opts).unwrap();

    assert_eq!(history.len(), 6);
    assert_eq!(history.last().unwrap().time, 5.0);
}

#[test]
fn pump_nominal_profile() {
    let model = common::pump_model(false);
    let history = run_scenario(&model, &Scenario::nominal(), 0, &SimOptions::default()).unwrap();
    let rate = history.flow_series("wat_2", "rate").unwrap();
    for (t, r) in rate.iter().enumerate() {
        let expected = if (5..50).contains(&t) { 1.0 } else { 0.0 };
        assert_eq!(*r, expected, "t={t}");
    }
    assert!(history.last().unwrap().blocks.values().all(|b| b.faults.is_empty()));
}

#[test]
fn behavior_failure_names_block_and_time() {
    let model = common::pump_model(false);
    let scenario = Scenario::nominal().with_param("export_water", "area", 0.0);
    let err = run_scenario(&model, &scenario, 0, &SimOptions::default()).unwrap_err();
    match err {
        SimError::Behavior {
            block,
            time,
            source,
        } => {
            assert_eq!(block, "move_water");
            assert_eq!(time, 0.0);
            assert!(matches!(source, BlockError::NonFinite { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_options_rejected() {
    let model = common::chain_model();
    let opts = SimOptions {
        max_static_passes: 0,
        ..SimOptions::default()
    };
    assert!(matches!(
        run_scenario(&model, &Scenario::nominal(), 0, &opts),
        Err(SimError::InvalidArg { .. })
    ));
}

#[test]
fn unknown_param_is_a_config_error() {
    let model = common::chain_model();
    let scenario = Scenario::nominal().with_param("feed", "voltage", 1.0);
    assert!(matches!(
        run_scenario(&model, &scenario, 0, &SimOptions::default()),
        Err(SimError::Config(_))
    ));
}
