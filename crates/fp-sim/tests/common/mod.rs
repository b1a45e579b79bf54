//! Models shared by the engine tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use fp_blocks::{
    Block, BlockKind, Distribution, FaultMode, FaultModes, FaultOutput, FlowState, Integrator,
    Linear, Pump, RandVar, Schedule, Segment, Source, Term, Trip,
};
use fp_sim::{Model, ModelBuilder, TimeParams};

fn values(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn modes(block: &str, entries: &[(&str, f64, [f64; 3], f64)]) -> FaultModes {
    FaultModes::from_entries(
        block,
        entries
            .iter()
            .map(|(name, dist, opp, cost)| (name.to_string(), FaultMode::new(*dist, *opp, *cost))),
    )
    .expect("distinct mode names")
}

fn water() -> FlowState {
    FlowState::new([("rate", 1.0), ("effort", 1.0), ("area", 1.0), ("level", 1.0)])
}

/// The electric pump system: supply, water source, switch signal, pump and
/// outlet, over `[0, 55]` with phases start / on / end.
pub fn pump_model(stochastic_eff: bool) -> Model {
    let import_ee = Block::new(
        "import_ee",
        BlockKind::Source(Source {
            outputs: values(&[("effort", 1.0)]),
            fault_outputs: vec![
                FaultOutput {
                    mode: "no_v".into(),
                    values: values(&[("effort", 0.0)]),
                },
                FaultOutput {
                    mode: "inf_v".into(),
                    values: values(&[("effort", 100.0)]),
                },
            ],
            trip: Some(Trip {
                field: "rate".into(),
                above: 5.0,
                mode: "no_v".into(),
            }),
            noise: Vec::new(),
        }),
    )
    .with_failrate(1e-5)
    .with_modes(modes(
        "import_ee",
        &[
            ("no_v", 0.8, [0.0, 1.0, 0.0], 1e4),
            ("inf_v", 0.2, [0.0, 1.0, 0.0], 1e4),
        ],
    ));

    let import_water = Block::new(
        "import_water",
        BlockKind::Source(Source {
            outputs: values(&[("level", 1.0)]),
            fault_outputs: vec![FaultOutput {
                mode: "no_wat".into(),
                values: values(&[("level", 0.0)]),
            }],
            ..Source::default()
        }),
    )
    .with_failrate(1e-5)
    .with_modes(modes("import_water", &[("no_wat", 1.0, [1.0, 1.0, 1.0], 1e3)]));

    let import_signal = Block::new(
        "import_signal",
        BlockKind::Schedule(Schedule {
            field: "power".into(),
            segments: vec![
                Segment {
                    until: 5.0,
                    value: 0.0,
                },
                Segment {
                    until: 50.0,
                    value: 1.0,
                },
            ],
            after: 0.0,
            fault_outputs: vec![FaultOutput {
                mode: "no_sig".into(),
                values: values(&[("power", 0.0)]),
            }],
            noise: Vec::new(),
        }),
    )
    .with_failrate(1e-6)
    .with_modes(modes("import_signal", &[("no_sig", 1.0, [1.5, 1.0, 1.0], 1e4)]));

    let mut pump = Pump::new(10.0);
    let mut rand = BTreeMap::new();
    if stochastic_eff {
        pump.eff_var = Some("eff".into());
        rand.insert(
            "eff".to_string(),
            RandVar::new(1.0).with_update(
                Distribution::Normal {
                    mean: 1.0,
                    std: 0.2,
                },
                1,
            ),
        );
    }
    let move_water = Block::new("move_water", BlockKind::Pump(pump))
        .with_failrate(1e-5)
        .with_modes(modes(
            "move_water",
            &[
                ("mech_break", 0.6, [0.1, 1.2, 0.1], 1e4),
                ("short", 1.0, [1.5, 1.0, 1.0], 1e4),
            ],
        ))
        .with_rand(rand);

    let export_water = Block::new(
        "export_water",
        BlockKind::Source(Source {
            outputs: values(&[("area", 1.0)]),
            fault_outputs: vec![FaultOutput {
                mode: "block".into(),
                values: values(&[("area", 0.1)]),
            }],
            ..Source::default()
        }),
    )
    .with_failrate(1e-5)
    .with_modes(modes("export_water", &[("block", 1.0, [1.5, 1.0, 1.0], 1e4)]));

    let mut b = ModelBuilder::new("pump", TimeParams::new(0.0, 55.0, 1.0));
    b.add_phase("start", 0.0, 5.0)
        .add_phase("on", 5.0, 50.0)
        .add_phase("end", 50.0, 55.0)
        .add_flow("ee_1", FlowState::new([("rate", 1.0), ("effort", 1.0)]))
        .add_flow("sig_1", FlowState::new([("power", 1.0)]))
        .add_flow("wat_1", water())
        .add_flow("wat_2", water())
        .add_block(import_ee, ["ee_1"])
        .add_block(import_water, ["wat_1"])
        .add_block(import_signal, ["sig_1"])
        .add_block(move_water, ["ee_1", "sig_1", "wat_1", "wat_2"])
        .add_block(export_water, ["wat_2"]);
    b.build().expect("pump model builds")
}

pub fn linear(name: &str, input: &str, coeff: f64, output: &str, offset: f64) -> Block {
    Block::new(
        name,
        BlockKind::Linear(Linear {
            terms: vec![Term {
                field: input.into(),
                coeff,
            }],
            output: output.into(),
            offset,
            fault_outputs: Vec::new(),
        }),
    )
}

/// `feed -> a -> (x2) -> b -> (x3) -> c`, with `c` integrated into `d`.
pub fn chain_model() -> Model {
    let feed = Block::new(
        "feed",
        BlockKind::Source(Source {
            outputs: values(&[("x", 1.5)]),
            ..Source::default()
        }),
    );
    let total = Block::new("total", BlockKind::Integrator(Integrator::new("x", "x", 1.0)));

    let mut b = ModelBuilder::new("chain", TimeParams::new(0.0, 4.0, 1.0));
    for flow in ["a", "b", "c", "d"] {
        b.add_flow(flow, FlowState::new([("x", 0.0)]));
    }
    // Declared downstream first so the order has to be computed.
    b.add_block(total, ["c", "d"])
        .add_block(linear("triple", "x", 3.0, "x", 0.0), ["b", "c"])
        .add_block(linear("double", "x", 2.0, "x", 0.0), ["a", "b"])
        .add_block(feed, ["a"]);
    b.build().expect("chain model builds")
}

/// `p = 0.5 q + 1`, `q = 0.5 p`: fixed point `p = 4/3`, `q = 2/3`.
pub fn coupled_model() -> Model {
    let mut b = ModelBuilder::new("coupled", TimeParams::new(0.0, 3.0, 1.0));
    b.add_flow("p", FlowState::new([("x", 0.0)]))
        .add_flow("q", FlowState::new([("x", 0.0)]))
        .add_block(linear("lhs", "x", 0.5, "x", 1.0), ["q", "p"])
        .add_block(linear("rhs", "x", 0.5, "x", 0.0), ["p", "q"]);
    b.build().expect("coupled model builds")
}
