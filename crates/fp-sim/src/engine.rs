//! Propagation engine: steps a model through its horizon under a scenario.

use std::fmt;
use std::sync::Arc;

use fp_blocks::{Block, FlowState, StochasticMode};
use fp_core::Tolerances;
use fp_results::{ConvergenceWarning, History, Snapshot};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{SimError, SimResult};
use crate::model::Model;
use crate::scenario::{InjectionPlan, Scenario};

/// Passes of the static order allowed per step before giving up.
pub const DEFAULT_MAX_STATIC_PASSES: usize = 30;

/// Extra stop predicate, checked after each recorded snapshot.
pub type EndCondition = Arc<dyn Fn(f64, &Snapshot) -> bool + Send + Sync>;

/// Options for simulation runs.
#[derive(Clone)]
pub struct SimOptions {
    pub stochastic: StochasticMode,
    /// Cap on static fixed-point passes per step.
    pub max_static_passes: usize,
    /// Tolerance for "a flow field changed" during the fixed point.
    pub tolerances: Tolerances,
    /// Stop early once this returns true. The horizon end always stops.
    pub end_condition: Option<EndCondition>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            stochastic: StochasticMode::Off,
            max_static_passes: DEFAULT_MAX_STATIC_PASSES,
            tolerances: Tolerances::default(),
            end_condition: None,
        }
    }
}

impl fmt::Debug for SimOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimOptions")
            .field("stochastic", &self.stochastic)
            .field("max_static_passes", &self.max_static_passes)
            .field("tolerances", &self.tolerances)
            .field("end_condition", &self.end_condition.is_some())
            .finish()
    }
}

impl SimOptions {
    pub fn with_stochastic(mut self, mode: StochasticMode) -> Self {
        self.stochastic = mode;
        self
    }

    pub fn with_end_condition(
        mut self,
        cond: impl Fn(f64, &Snapshot) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.end_condition = Some(Arc::new(cond));
        self
    }

    fn validate(&self) -> SimResult<()> {
        if self.max_static_passes == 0 {
            return Err(SimError::InvalidArg {
                what: "max_static_passes must be positive",
            });
        }
        let tol = self.tolerances;
        if !(tol.abs.is_finite() && tol.abs >= 0.0 && tol.rel.is_finite() && tol.rel >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "tolerances must be finite and non-negative",
            });
        }
        Ok(())
    }
}

/// Run state of one scenario: the model branch, the step cursor and the
/// History so far.
///
/// Cloning gives a fully independent branch, which is how staged runs fork
/// off a nominal run.
#[derive(Debug, Clone)]
pub struct Simulation {
    model: Model,
    scenario: Scenario,
    plan: InjectionPlan,
    options: SimOptions,
    steps: usize,
    index: usize,
    finished: bool,
    last_passes: usize,
    history: History,
}

impl Simulation {
    /// Prepare a fresh run: clone the model, apply parameter overrides and
    /// seed every block's stream from `seed` and its position.
    pub fn new(model: &Model, scenario: Scenario, seed: u64, options: SimOptions) -> SimResult<Self> {
        options.validate()?;
        let plan = scenario.plan(model)?;

        let mut model = model.clone();
        for p in &scenario.params {
            model.set_param(&p.block, &p.param, p.value)?;
        }
        let start = model.time.start;
        for (stream, block) in model.blocks.iter_mut().enumerate() {
            block.prepare(start, seed, stream as u64, options.stochastic);
        }

        let steps = model.time.steps();
        let history = History::new(scenario.id.clone(), seed);
        Ok(Self {
            model,
            scenario,
            plan,
            options,
            steps,
            index: 0,
            finished: steps == 0,
            last_passes: 0,
            history,
        })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Index of the next step to execute.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Static passes used by the most recent step.
    pub fn last_static_passes(&self) -> usize {
        self.last_passes
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn into_history(self) -> History {
        self.history
    }

    /// Execute one step and record its snapshot.
    ///
    /// Returns `false` without doing anything once the run has finished.
    pub fn step(&mut self) -> SimResult<bool> {
        if self.finished {
            return Ok(false);
        }
        let index = self.index;
        let time = self.model.time.time_at(index);
        let dt = self.model.time.dt;

        // Conditions see the values left by the previous step.
        for block in self.model.blocks.iter_mut() {
            block
                .condition(time, dt, &mut self.model.flows)
                .map_err(|e| SimError::behavior(block.name(), time, e))?;
        }

        if let Some(injections) = self.plan.get(&index) {
            for (slot, mode) in injections {
                self.model.blocks[*slot].inject(mode)?;
                debug!(block = self.model.blocks[*slot].name(), mode = %mode, index, "fault injected");
            }
        }

        self.resolve_static(index, time, dt)?;

        let Model {
            blocks,
            flows,
            order,
            ..
        } = &mut self.model;
        for id in order.dynamic_order() {
            run_behavior(&mut blocks[id.slot()], time, dt, flows)?;
        }

        for block in blocks.iter_mut() {
            block
                .sample(index)
                .map_err(|e| SimError::behavior(block.name(), time, e))?;
        }

        let snapshot = self.snapshot(index, time);
        let stop = self
            .options
            .end_condition
            .as_ref()
            .is_some_and(|cond| cond(time, &snapshot));
        self.history.snapshots.push(snapshot);

        self.index += 1;
        if stop || self.index >= self.steps {
            self.finished = true;
            if stop {
                debug!(index, time, "end condition reached");
            }
        }
        Ok(true)
    }

    /// Run the static order until the flows stop changing or the pass cap
    /// is hit.
    fn resolve_static(&mut self, index: usize, time: f64, dt: f64) -> SimResult<()> {
        let tol = self.options.tolerances;
        let cap = self.options.max_static_passes;
        let Model {
            blocks,
            flows,
            order,
            ..
        } = &mut self.model;

        let mut passes = 0;
        let mut max_change = 0.0;
        let mut converged = order.static_order().is_empty();
        while !converged && passes < cap {
            let before: Vec<FlowState> = flows.clone();
            for id in order.static_order() {
                run_behavior(&mut blocks[id.slot()], time, dt, flows)?;
            }
            passes += 1;

            max_change = before
                .iter()
                .zip(flows.iter())
                .map(|(a, b)| b.max_change(a))
                .fold(0.0, f64::max);
            converged = before.iter().zip(flows.iter()).all(|(a, b)| b.settled(a, tol));
            trace!(index, pass = passes, max_change, "static pass");
        }
        self.last_passes = passes;

        if converged {
            debug!(index, passes, "static converged");
        } else {
            let warning = ConvergenceWarning {
                index,
                time,
                passes,
                max_change,
            };
            warn!(index, time, passes, max_change, "static propagation did not converge");
            self.history.warnings.push(warning);
        }
        Ok(())
    }

    fn snapshot(&self, index: usize, time: f64) -> Snapshot {
        let density = (self.options.stochastic == StochasticMode::TrackDensity)
            .then(|| self.model.blocks.iter().map(Block::density).product::<f64>());
        Snapshot {
            index,
            time,
            flows: self.model.flow_values(),
            blocks: self.model.block_records(),
            density,
        }
    }

    /// Step until the next step would be `index` (or the run ends).
    pub fn run_until(&mut self, index: usize) -> SimResult<()> {
        while self.index < index && self.step()? {}
        Ok(())
    }

    pub fn run_to_end(&mut self) -> SimResult<()> {
        while self.step()? {}
        Ok(())
    }

    /// Branch off the current state under another scenario.
    ///
    /// The branch keeps the History so far, relabelled with the new
    /// scenario id. Injections before the current step cannot be honoured
    /// and are rejected, as are parameter overrides.
    pub fn fork(&self, scenario: Scenario) -> SimResult<Simulation> {
        if scenario.has_params() {
            return Err(SimError::InvalidArg {
                what: "scenarios with parameter overrides cannot be forked",
            });
        }
        let plan = scenario.plan(&self.model)?;
        if let Some(&first) = plan.keys().next()
            && first < self.index
        {
            return Err(fp_core::ConfigError::InvalidScenario {
                scenario: scenario.id.clone(),
                what: format!(
                    "injection at step {first} precedes the fork point at step {}",
                    self.index
                ),
            }
            .into());
        }

        debug!(scenario = %scenario.id, index = self.index, "forking staged run");
        let mut branch = self.clone();
        branch.history.scenario = scenario.id.clone();
        branch.plan = plan;
        branch.scenario = scenario;
        Ok(branch)
    }
}

fn run_behavior(block: &mut Block, time: f64, dt: f64, flows: &mut [FlowState]) -> SimResult<()> {
    block
        .behavior(time, dt, flows)
        .map_err(|e| SimError::behavior(block.name(), time, e))
}

/// Run one scenario from the start of the horizon.
///
/// The same model, scenario and seed always produce the same History.
#[instrument(skip_all, fields(model = %model.name(), scenario = %scenario.id, seed = seed))]
pub fn run_scenario(
    model: &Model,
    scenario: &Scenario,
    seed: u64,
    options: &SimOptions,
) -> SimResult<History> {
    info!(steps = model.time().steps(), stochastic = ?options.stochastic, "run starting");
    let mut sim = Simulation::new(model, scenario.clone(), seed, options.clone())?;
    sim.run_to_end()?;
    let history = sim.into_history();
    info!(
        snapshots = history.len(),
        warnings = history.warnings.len(),
        "run complete"
    );
    Ok(history)
}
