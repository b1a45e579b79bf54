//! Expected-cost classification and saving batches to a run store.

mod common;

use std::time::{SystemTime, UNIX_EPOCH};

use fp_core::Tolerances;
use fp_results::{RunStore, approx_eq};
use fp_runs::{
    BatchOptions, Classifier, ExpectedCost, LossKind, classify_batch, run_with_nominal,
    save_batch, total_expected_cost,
};
use fp_sim::{NOMINAL, Scenario, SimOptions};

#[test]
fn blocked_outlet_expected_cost() {
    let model = common::pump_model();
    let scenario = Scenario::single("export_water", "block", 27.0).with_rate(1e-5);
    let results = run_with_nominal(
        &model,
        std::slice::from_ref(&scenario),
        0,
        &SimOptions::default(),
        &BatchOptions::default(),
        None,
    )
    .unwrap();

    let classifier = ExpectedCost::from_model(&model, 1000.0).with_flow_cost("wat_2", "rate", 100.0);
    let classes = classify_batch(&classifier, &results, std::slice::from_ref(&scenario));
    assert_eq!(classes.len(), 2);

    let nominal = &classes[NOMINAL];
    assert_eq!(nominal.rate, 1.0);
    assert_eq!(nominal.cost, 0.0);

    // Repairs: the blocked outlet and the pump it breaks at t=38. Lost
    // flow: 0.9 for t in [27, 38), 1.0 for t in [38, 50).
    let c = &classes[&scenario.id];
    let cost = 2.0e4 + 100.0 * (11.0 * 0.9 + 12.0);
    assert!((c.cost - cost).abs() < 1e-6, "cost {}", c.cost);
    assert!((c.expected_cost - 1e-5 * 1000.0 * cost).abs() < 1e-9);
    assert!((total_expected_cost(&classes) - c.expected_cost).abs() < 1e-12);

    let direct = classifier.classify(
        results[NOMINAL].as_ref().unwrap(),
        results[&scenario.id].as_ref().unwrap(),
        &scenario,
    );
    assert_eq!(&direct, c);
}

#[test]
fn broken_pump_costs_its_current_spike() {
    let model = common::pump_model();
    let scenario = Scenario::single("export_water", "block", 27.0).with_rate(1e-5);
    let results = run_with_nominal(
        &model,
        std::slice::from_ref(&scenario),
        0,
        &SimOptions::default(),
        &BatchOptions::default(),
        None,
    )
    .unwrap();

    let classifier = ExpectedCost::from_model(&model, 1.0).with_flow_loss(
        "ee_1",
        "rate",
        100.0,
        LossKind::Spike { threshold: 1.0 },
    );
    let classes = classify_batch(&classifier, &results, std::slice::from_ref(&scenario));
    // The broken pump draws 5 instead of 1 for t in [38, 50).
    let cost = 2.0e4 + 100.0 * 4.0 * 12.0;
    let c = &classes[&scenario.id];
    assert!((c.cost - cost).abs() < 1e-6, "cost {}", c.cost);
    assert_eq!(classes[NOMINAL].cost, 0.0);
}

#[test]
fn save_batch_skips_failures_and_dedupes() {
    let spec = common::pump_spec();
    let model = spec.build_model().unwrap();
    let scenarios = vec![
        Scenario::single("import_water", "no_wat", 12.0),
        Scenario::single("import_water", "no_wat", 12.0)
            .with_id("no outlet")
            .with_param("export_water", "area", 0.0),
    ];
    let results = run_with_nominal(
        &model,
        &scenarios,
        4,
        &SimOptions::default(),
        &BatchOptions::default(),
        None,
    )
    .unwrap();

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let root = std::env::temp_dir().join(format!("fp_runs_save_batch_{nanos}"));
    let store = RunStore::new(root).unwrap();

    let saved = save_batch(&store, &spec, "pump", &results).unwrap();
    assert_eq!(saved.len(), 2);
    assert!(saved.iter().all(|(id, _)| id != "no outlet"));
    assert_eq!(store.list_runs("pump").unwrap().len(), 2);

    let again = save_batch(&store, &spec, "pump", &results).unwrap();
    assert_eq!(again, saved);

    let (scenario, run_id) = &saved[0];
    let loaded = store.load_history(run_id).unwrap();
    let original = results[scenario].as_ref().unwrap();
    assert_eq!(loaded.len(), original.len());
    assert!(approx_eq(&loaded, original, Tolerances::default()));
}
