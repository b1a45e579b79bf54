//! Fault injection timing and scenario validation.

mod common;

use fp_core::ConfigError;
use fp_sim::{Injection, Scenario, SimError, SimOptions, run_scenario};

#[test]
fn fault_absent_before_and_present_from_injection() {
    let model = common::pump_model(false);
    let scenario = Scenario::single("export_water", "block", 27.0);
    let history = run_scenario(&model, &scenario, 0, &SimOptions::default()).unwrap();

    assert_eq!(history.scenario, "export_water block, t=27.0");
    let active = history.fault_series("export_water", "block");
    assert_eq!(active.len(), 56);
    assert!(active[..27].iter().all(|a| !a));
    assert!(active[27..].iter().all(|a| *a));
    assert_eq!(history.first_fault_time("export_water"), Some(27.0));

    let area = history.flow_series("wat_2", "area").unwrap();
    assert_eq!(area[26], 1.0);
    assert_eq!(area[27], 0.1);
}

#[test]
fn blocked_outlet_breaks_pump_after_delay() {
    let model = common::pump_model(false);
    let scenario = Scenario::single("export_water", "block", 27.0);
    let history = run_scenario(&model, &scenario, 0, &SimOptions::default()).unwrap();

    // Outlet effort jumps to 10 at t=27; the 10-unit timer is exceeded at 38.
    assert_eq!(history.first_fault_time("move_water"), Some(38.0));
    assert!(!history.fault_series("move_water", "mech_break")[37]);
    let rate = history.flow_series("wat_2", "rate").unwrap();
    assert_eq!(rate[26], 1.0);
    assert!((rate[37] - 0.1).abs() < 1e-12);
    assert_eq!(rate[38], 0.0);
    assert_eq!(history.block_series("move_water", "timer").unwrap()[38], 11.0);
}

#[test]
fn short_trips_the_supply() {
    let model = common::pump_model(false);
    let scenario = Scenario::single("move_water", "short", 10.0);
    let history = run_scenario(&model, &scenario, 0, &SimOptions::default()).unwrap();

    let ee_rate = history.flow_series("ee_1", "rate").unwrap();
    assert_eq!(ee_rate[10], 500.0);
    // The supply sees the overload on the next step and shuts off.
    assert_eq!(history.first_fault_time("import_ee"), Some(11.0));
    assert_eq!(ee_rate[11], 0.0);
    assert_eq!(history.flow_series("wat_2", "rate").unwrap()[20], 0.0);
}

#[test]
fn multi_fault_injects_each_at_its_time() {
    let model = common::pump_model(false);
    let scenario = Scenario::multi(
        "signal then water",
        vec![
            Injection::new("import_signal", "no_sig", 10.0),
            Injection::new("import_water", "no_wat", 20.0),
        ],
    );
    let history = run_scenario(&model, &scenario, 0, &SimOptions::default()).unwrap();
    assert_eq!(history.first_fault_time("import_signal"), Some(10.0));
    assert_eq!(history.first_fault_time("import_water"), Some(20.0));
    assert_eq!(history.flow_series("sig_1", "power").unwrap()[10], 0.0);
}

#[test]
fn scenario_errors_are_config_errors() {
    let model = common::pump_model(false);
    let opts = SimOptions::default();

    let unknown_mode = Scenario::single("export_water", "melt", 10.0);
    assert!(matches!(
        run_scenario(&model, &unknown_mode, 0, &opts),
        Err(SimError::Config(ConfigError::UnknownMode { .. }))
    ));

    let unknown_block = Scenario::single("tank", "leak", 10.0);
    assert!(matches!(
        run_scenario(&model, &unknown_block, 0, &opts),
        Err(SimError::Config(ConfigError::UnknownBlock { .. }))
    ));

    for time in [10.5, 60.0, -1.0] {
        let off_grid = Scenario::single("export_water", "block", time);
        assert!(
            matches!(
                off_grid.validate(&model),
                Err(ConfigError::InvalidScenario { .. })
            ),
            "t={time}"
        );
    }

    let mut nominal_with_fault = Scenario::nominal();
    nominal_with_fault
        .injections
        .push(Injection::new("export_water", "block", 1.0));
    assert!(nominal_with_fault.validate(&model).is_err());
}

#[test]
fn injection_time_within_tolerance_snaps() {
    let model = common::pump_model(false);
    let scenario = Scenario::single("export_water", "block", 27.0 + 1e-12);
    assert_eq!(scenario.first_injection_step(&model).unwrap(), Some(27));
}
