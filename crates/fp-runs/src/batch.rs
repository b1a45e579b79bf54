//! Batch execution of scenarios, optionally staged off one nominal run.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use fp_results::History;
use fp_sim::{Model, Scenario, SimError, SimOptions, Simulation, run_scenario};
use rayon::prelude::*;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{RunsError, RunsResult};
use crate::progress::{BatchProgress, ProgressFn};

/// One result slot per scenario id. Failed runs keep their error.
pub type BatchResults = BTreeMap<String, Result<History, SimError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Fork faulty runs from a shared nominal run instead of starting each
    /// from time zero.
    pub staged: bool,
    /// Fan scenarios, and nested replicates, out over the rayon pool.
    pub parallel: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            staged: true,
            parallel: true,
        }
    }
}

/// Nominal run state cached before each injection step.
struct Stages {
    at_step: BTreeMap<usize, Simulation>,
}

impl Stages {
    /// Step one nominal run, keeping a copy just before every step in
    /// `steps`.
    fn prepare(
        model: &Model,
        seed: u64,
        options: &SimOptions,
        steps: &BTreeSet<usize>,
    ) -> Result<Self, SimError> {
        let mut nominal = Simulation::new(model, Scenario::nominal(), seed, options.clone())?;
        let mut at_step = BTreeMap::new();
        for &step in steps {
            nominal.run_until(step)?;
            debug!(step, "cached nominal stage");
            at_step.insert(step, nominal.clone());
        }
        Ok(Self { at_step })
    }

    fn run(&self, step: usize, scenario: &Scenario) -> Result<History, SimError> {
        let Some(stage) = self.at_step.get(&step) else {
            return Err(SimError::InvalidArg {
                what: "no cached stage for injection step",
            });
        };
        let mut branch = stage.fork(scenario.clone())?;
        branch.run_to_end()?;
        Ok(branch.into_history())
    }
}

/// Injection step a scenario can be forked at, if it can be staged.
fn stage_step(model: &Model, scenario: &Scenario) -> Option<usize> {
    if scenario.has_params() {
        return None;
    }
    scenario.first_injection_step(model).ok().flatten()
}

/// Run every scenario with the same seed.
///
/// The batch holds exactly one entry per scenario; a scenario that fails
/// stores its error and the others carry on. Only duplicate ids abort the
/// batch.
#[instrument(skip_all, fields(model = %model.name(), scenarios = scenarios.len(), seed = seed))]
pub fn run_batch(
    model: &Model,
    scenarios: &[Scenario],
    seed: u64,
    sim_options: &SimOptions,
    options: &BatchOptions,
    progress: Option<ProgressFn<'_>>,
) -> RunsResult<BatchResults> {
    let mut ids = BTreeSet::new();
    for s in scenarios {
        if !ids.insert(s.id.as_str()) {
            return Err(RunsError::DuplicateScenario { id: s.id.clone() });
        }
    }
    info!(staged = options.staged, parallel = options.parallel, "batch starting");

    let plan: Vec<Option<usize>> = scenarios
        .iter()
        .map(|s| {
            if options.staged {
                stage_step(model, s)
            } else {
                None
            }
        })
        .collect();

    let steps: BTreeSet<usize> = plan.iter().flatten().copied().collect();
    let stages = if steps.is_empty() {
        None
    } else {
        match Stages::prepare(model, seed, sim_options, &steps) {
            Ok(stages) => Some(stages),
            Err(e) => {
                warn!(error = %e, "nominal staging failed, running scenarios from the start");
                None
            }
        }
    };

    let total = scenarios.len();
    let completed = AtomicUsize::new(0);
    let run_one = |(scenario, step): (&Scenario, &Option<usize>)| {
        let result = match (step, &stages) {
            (Some(step), Some(stages)) => stages.run(*step, scenario),
            _ => run_scenario(model, scenario, seed, sim_options),
        };
        if let Err(e) = &result {
            error!(scenario = %scenario.id, error = %e, "scenario failed");
        }
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(cb) = progress {
            cb(BatchProgress {
                completed: done,
                total,
                scenario: scenario.id.clone(),
                ok: result.is_ok(),
            });
        }
        (scenario.id.clone(), result)
    };

    let results: BatchResults = if options.parallel {
        scenarios.par_iter().zip(plan.par_iter()).map(run_one).collect()
    } else {
        scenarios.iter().zip(plan.iter()).map(run_one).collect()
    };

    let failed = results.values().filter(|r| r.is_err()).count();
    info!(completed = results.len(), failed, "batch complete");
    Ok(results)
}

/// Nominal run plus every scenario, keyed by scenario id.
///
/// The nominal History sits under [`fp_sim::NOMINAL`].
pub fn run_with_nominal(
    model: &Model,
    scenarios: &[Scenario],
    seed: u64,
    sim_options: &SimOptions,
    options: &BatchOptions,
    progress: Option<ProgressFn<'_>>,
) -> RunsResult<BatchResults> {
    let mut all = Vec::with_capacity(scenarios.len() + 1);
    all.push(Scenario::nominal());
    all.extend(scenarios.iter().cloned());
    run_batch(model, &all, seed, sim_options, options, progress)
}
