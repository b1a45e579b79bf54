//! Scenarios: timed fault injections plus parameter overrides.

use std::collections::BTreeMap;

use fp_core::{ConfigError, ConfigResult, Tolerances};
use serde::{Deserialize, Serialize};

use crate::model::Model;

/// Id of the fault-free scenario.
pub const NOMINAL: &str = "nominal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Nominal,
    SingleFault,
    MultiFault,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Injection {
    pub block: String,
    pub mode: String,
    pub time: f64,
}

impl Injection {
    pub fn new(block: impl Into<String>, mode: impl Into<String>, time: f64) -> Self {
        Self {
            block: block.into(),
            mode: mode.into(),
            time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamOverride {
    pub block: String,
    pub param: String,
    pub value: f64,
}

impl ParamOverride {
    pub fn new(block: impl Into<String>, param: impl Into<String>, value: f64) -> Self {
        Self {
            block: block.into(),
            param: param.into(),
            value,
        }
    }
}

fn unit_rate() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub kind: ScenarioKind,
    #[serde(default)]
    pub injections: Vec<Injection>,
    #[serde(default)]
    pub params: Vec<ParamOverride>,
    /// Expected occurrences over the model lifetime (1 for nominal).
    #[serde(default = "unit_rate")]
    pub rate: f64,
}

/// Injections keyed by step index: `(block slot, mode)`.
pub(crate) type InjectionPlan = BTreeMap<usize, Vec<(usize, String)>>;

impl Scenario {
    pub fn nominal() -> Self {
        Self {
            id: NOMINAL.to_string(),
            kind: ScenarioKind::Nominal,
            injections: Vec::new(),
            params: Vec::new(),
            rate: 1.0,
        }
    }

    /// One fault, labelled `"<block> <mode>, t=<time>"`.
    pub fn single(block: impl Into<String>, mode: impl Into<String>, time: f64) -> Self {
        let injection = Injection::new(block, mode, time);
        Self {
            id: single_fault_id(&injection.block, &injection.mode, time),
            kind: ScenarioKind::SingleFault,
            injections: vec![injection],
            params: Vec::new(),
            rate: 0.0,
        }
    }

    pub fn multi(id: impl Into<String>, injections: Vec<Injection>) -> Self {
        Self {
            id: id.into(),
            kind: ScenarioKind::MultiFault,
            injections,
            params: Vec::new(),
            rate: 0.0,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_param(mut self, block: impl Into<String>, param: impl Into<String>, value: f64) -> Self {
        self.params.push(ParamOverride::new(block, param, value));
        self
    }

    pub fn is_nominal(&self) -> bool {
        self.kind == ScenarioKind::Nominal
    }

    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }

    /// Check the scenario against a model without running it.
    pub fn validate(&self, model: &Model) -> ConfigResult<()> {
        self.plan(model).map(|_| ())
    }

    /// Earliest injection step, if any.
    pub fn first_injection_step(&self, model: &Model) -> ConfigResult<Option<usize>> {
        Ok(self.plan(model)?.keys().next().copied())
    }

    pub(crate) fn plan(&self, model: &Model) -> ConfigResult<InjectionPlan> {
        let invalid = |what: String| ConfigError::InvalidScenario {
            scenario: self.id.clone(),
            what,
        };

        let count = self.injections.len();
        match self.kind {
            ScenarioKind::Nominal if count > 0 => {
                return Err(invalid("nominal scenario has injections".into()));
            }
            ScenarioKind::SingleFault if count != 1 => {
                return Err(invalid(format!("single-fault scenario has {count} injections")));
            }
            ScenarioKind::MultiFault if count == 0 => {
                return Err(invalid("multi-fault scenario has no injections".into()));
            }
            _ => {}
        }
        if !self.rate.is_finite() || self.rate < 0.0 {
            return Err(invalid(format!("rate {} must be finite and non-negative", self.rate)));
        }

        let mut plan = InjectionPlan::new();
        for inj in &self.injections {
            let slot = self.block_slot(model, &inj.block)?;
            if !model.blocks[slot].modes().contains(&inj.mode) {
                return Err(ConfigError::UnknownMode {
                    block: inj.block.clone(),
                    mode: inj.mode.clone(),
                });
            }
            let step = model
                .time
                .index_of(inj.time, Tolerances::default())
                .ok_or_else(|| {
                    invalid(format!(
                        "injection time {} is off the step grid or outside [{}, {}]",
                        inj.time, model.time.start, model.time.end
                    ))
                })?;
            plan.entry(step).or_default().push((slot, inj.mode.clone()));
        }

        for p in &self.params {
            self.block_slot(model, &p.block)?;
        }
        Ok(plan)
    }

    fn block_slot(&self, model: &Model, block: &str) -> ConfigResult<usize> {
        model
            .block_index(block)
            .ok_or_else(|| ConfigError::UnknownBlock {
                name: block.to_string(),
                context: format!("scenario '{}'", self.id),
            })
    }
}

/// Label used for generated single-fault scenarios.
pub fn single_fault_id(block: &str, mode: &str, time: f64) -> String {
    format!("{block} {mode}, t={time:?}")
}
