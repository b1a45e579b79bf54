//! Blocks: a behavior kind plus the fault, stochastic and timing state the
//! engine drives.

use std::collections::BTreeMap;

use fp_core::{ConfigError, ConfigResult, FlowId};
use fp_graph::Timing;
use serde::{Deserialize, Serialize};

use crate::behavior::{Behavior, BlockContext, Role};
use crate::error::BlockResult;
use crate::flow::FlowState;
use crate::integrator::Integrator;
use crate::linear::Linear;
use crate::mode::{FaultModes, FaultSet};
use crate::pump::Pump;
use crate::random::{RandState, RandVar, StochasticMode};
use crate::schedule::Schedule;
use crate::source::Source;

/// Block kind defines the behavior and parameters of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlockKind {
    /// Fixed values with fault overrides and an optional trip condition.
    Source(Source),
    /// Piecewise-constant profile over time.
    Schedule(Schedule),
    /// Affine map between two flows.
    Linear(Linear),
    /// Time integral of an input field.
    Integrator(Integrator),
    /// Electric water pump.
    Pump(Pump),
}

impl BlockKind {
    /// Timing a kind runs with unless the model says otherwise.
    pub fn default_timing(&self) -> Timing {
        match self {
            BlockKind::Integrator(_) => Timing::Dynamic,
            _ => Timing::Static,
        }
    }

    pub fn behavior(&self) -> &dyn Behavior {
        match self {
            BlockKind::Source(b) => b,
            BlockKind::Schedule(b) => b,
            BlockKind::Linear(b) => b,
            BlockKind::Integrator(b) => b,
            BlockKind::Pump(b) => b,
        }
    }

    pub fn behavior_mut(&mut self) -> &mut dyn Behavior {
        match self {
            BlockKind::Source(b) => b,
            BlockKind::Schedule(b) => b,
            BlockKind::Linear(b) => b,
            BlockKind::Integrator(b) => b,
            BlockKind::Pump(b) => b,
        }
    }
}

/// Runtime block owned by a model.
#[derive(Debug, Clone)]
pub struct Block {
    name: String,
    kind: BlockKind,
    timing: Timing,
    roles: Vec<Role>,
    modes: FaultModes,
    failrate: f64,
    faults: FaultSet,
    rand: RandState,
    ports: Vec<FlowId>,
    last_time: f64,
}

impl Block {
    pub fn new(name: impl Into<String>, kind: BlockKind) -> Self {
        let timing = kind.default_timing();
        let roles = kind.behavior().roles();
        Self {
            name: name.into(),
            kind,
            timing,
            roles,
            modes: FaultModes::new(),
            failrate: 0.0,
            faults: FaultSet::new(),
            rand: RandState::default(),
            ports: Vec::new(),
            last_time: f64::NEG_INFINITY,
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_modes(mut self, modes: FaultModes) -> Self {
        self.modes = modes;
        self
    }

    pub fn with_failrate(mut self, failrate: f64) -> Self {
        self.failrate = failrate;
        self
    }

    pub fn with_rand(mut self, vars: BTreeMap<String, RandVar>) -> Self {
        self.rand = RandState::new(vars);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn modes(&self) -> &FaultModes {
        &self.modes
    }

    pub fn failrate(&self) -> f64 {
        self.failrate
    }

    pub fn faults(&self) -> &FaultSet {
        &self.faults
    }

    pub fn has_fault(&self, mode: &str) -> bool {
        self.faults.contains(mode)
    }

    pub fn rand(&self) -> &RandState {
        &self.rand
    }

    pub fn ports(&self) -> &[FlowId] {
        &self.ports
    }

    /// Attach the block to its flows, in role order.
    pub fn connect(&mut self, ports: Vec<FlowId>) {
        self.ports = ports;
    }

    /// Check the block against its connected flows and the model phases.
    pub fn validate(
        &self,
        flow_names: &[String],
        flows: &[FlowState],
        phase_count: usize,
    ) -> ConfigResult<()> {
        if self.ports.len() != self.roles.len() {
            return Err(ConfigError::ConnectionCount {
                block: self.name.clone(),
                expected: self.roles.len(),
                actual: self.ports.len(),
            });
        }

        let behavior = self.kind.behavior();
        for field_ref in behavior.field_refs() {
            let Some(&flow_id) = self.ports.get(field_ref.port) else {
                return Err(ConfigError::ConnectionCount {
                    block: self.name.clone(),
                    expected: field_ref.port + 1,
                    actual: self.ports.len(),
                });
            };
            let known = flows
                .get(flow_id.slot())
                .is_some_and(|f| f.has_field(&field_ref.field));
            if !known {
                return Err(ConfigError::UnknownField {
                    block: self.name.clone(),
                    flow: flow_names
                        .get(flow_id.slot())
                        .cloned()
                        .unwrap_or_else(|| flow_id.to_string()),
                    field: field_ref.field,
                });
            }
        }

        for mode in behavior.mode_refs() {
            if !self.modes.contains(&mode) {
                return Err(ConfigError::UnknownMode {
                    block: self.name.clone(),
                    mode,
                });
            }
        }

        self.modes.validate(&self.name, phase_count)?;

        if !self.failrate.is_finite() || self.failrate < 0.0 {
            return Err(ConfigError::InvalidParam {
                block: self.name.clone(),
                param: "failrate".into(),
                reason: "must be finite and non-negative".into(),
            });
        }

        self.rand
            .validate()
            .map_err(|e| ConfigError::InvalidParam {
                block: self.name.clone(),
                param: "random".into(),
                reason: e.to_string(),
            })
    }

    /// Prepare for a fresh run starting at `start`.
    pub fn prepare(&mut self, start: f64, seed: u64, stream: u64, mode: StochasticMode) {
        self.rand.seed(seed, stream, mode);
        self.last_time = start;
    }

    /// Override a construction parameter.
    pub fn set_param(&mut self, param: &str, value: f64) -> ConfigResult<()> {
        let invalid = |reason: String| ConfigError::InvalidParam {
            block: self.name.clone(),
            param: param.to_string(),
            reason,
        };
        if !value.is_finite() {
            return Err(invalid("must be finite".into()));
        }
        if param == "failrate" {
            if value < 0.0 {
                return Err(invalid("must be non-negative".into()));
            }
            self.failrate = value;
            return Ok(());
        }
        let result = self.kind.behavior_mut().set_param(param, value);
        result.map_err(|e| invalid(e.to_string()))
    }

    /// Activate a declared fault mode from outside the block.
    pub fn inject(&mut self, mode: &str) -> ConfigResult<()> {
        if !self.modes.contains(mode) {
            return Err(ConfigError::UnknownMode {
                block: self.name.clone(),
                mode: mode.to_string(),
            });
        }
        self.faults.insert(mode.to_string());
        Ok(())
    }

    pub fn condition(&mut self, time: f64, dt: f64, flows: &mut [FlowState]) -> BlockResult<()> {
        self.invoke(time, dt, flows, false, |b, ctx| b.condition(ctx))
    }

    /// Run the behavior; the block remembers `time` as its last invocation.
    pub fn behavior(&mut self, time: f64, dt: f64, flows: &mut [FlowState]) -> BlockResult<()> {
        let result = self.invoke(time, dt, flows, true, |b, ctx| b.behavior(ctx));
        self.last_time = self.last_time.max(time);
        result
    }

    /// Run the stochastic update rules due at `step_index`.
    pub fn sample(&mut self, step_index: usize) -> BlockResult<()> {
        self.rand.update_due(step_index)
    }

    fn invoke(
        &mut self,
        time: f64,
        dt: f64,
        flows: &mut [FlowState],
        writable: bool,
        f: impl FnOnce(&mut dyn Behavior, &mut BlockContext<'_>) -> BlockResult<()>,
    ) -> BlockResult<()> {
        let advanced = time > self.last_time;
        let Block {
            kind,
            roles,
            modes,
            faults,
            rand,
            ports,
            ..
        } = self;
        let mut ctx = BlockContext {
            time,
            dt,
            advanced,
            writable,
            roles: roles.as_slice(),
            ports: ports.as_slice(),
            flows,
            modes: &*modes,
            faults,
            rand,
        };
        f(kind.behavior_mut(), &mut ctx)
    }

    /// Observable state: kind state plus random variables under `rand.`.
    pub fn state(&self) -> BTreeMap<String, f64> {
        let mut state = self.kind.behavior().state();
        for (name, var) in self.rand.vars() {
            state.insert(format!("rand.{name}"), var.value());
        }
        state
    }

    pub fn density(&self) -> f64 {
        self.rand.density()
    }

    /// Summed repair cost of the active faults.
    pub fn repair_cost(&self) -> f64 {
        self.faults
            .iter()
            .filter_map(|f| self.modes.get(f))
            .map(|m| m.repair_cost)
            .sum()
    }
}
