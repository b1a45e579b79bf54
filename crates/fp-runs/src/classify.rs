//! Classification of faulty runs against nominal.

use std::collections::BTreeMap;

use fp_results::History;
use fp_sim::{Model, Scenario};
use serde::{Deserialize, Serialize};

use crate::batch::BatchResults;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub rate: f64,
    pub cost: f64,
    pub expected_cost: f64,
}

/// Scores one faulty History against the nominal one.
pub trait Classifier {
    fn classify(&self, nominal: &History, faulty: &History, scenario: &Scenario) -> Classification;
}

/// How a flow field's deviation from nominal turns into cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LossKind {
    /// `sum(nominal - faulty) * dt`.
    #[default]
    Linear,
    /// Shortfall accumulated step by step, squared at every step:
    /// `sum(acc_k^2) * dt` with `acc_k = sum(nominal_i - faulty_i, i <= k)`.
    SquaredAccumulated,
    /// Excess of faulty over nominal, counted only on steps where it is
    /// above `threshold`: `sum(d for d in faulty - nominal if d > threshold) * dt`.
    Spike { threshold: f64 },
}

impl LossKind {
    /// Unweighted loss of `faulty` against `nominal` sampled every `dt`.
    pub fn loss(&self, nominal: &[f64], faulty: &[f64], dt: f64) -> f64 {
        let steps = nominal.iter().zip(faulty);
        let total: f64 = match *self {
            LossKind::Linear => steps.map(|(n, f)| n - f).sum(),
            LossKind::SquaredAccumulated => steps
                .scan(0.0, |acc, (n, f)| {
                    *acc += n - f;
                    Some(*acc * *acc)
                })
                .sum(),
            LossKind::Spike { threshold } => steps
                .map(|(n, f)| f - n)
                .filter(|d| *d > threshold)
                .sum(),
        };
        total * dt
    }
}

/// Flow field whose deviation from nominal costs `weight` per unit loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowCost {
    pub flow: String,
    pub field: String,
    pub weight: f64,
    #[serde(default)]
    pub loss: LossKind,
}

/// Repair cost of the faults active at the end of the run plus weighted
/// flow losses, scaled by scenario rate and model life.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedCost {
    repair: BTreeMap<String, BTreeMap<String, f64>>,
    flows: Vec<FlowCost>,
    life: f64,
    dt: f64,
}

impl ExpectedCost {
    /// Take repair costs from the model's mode registries.
    pub fn from_model(model: &Model, life: f64) -> Self {
        let repair = model
            .blocks()
            .iter()
            .map(|b| {
                let costs = b
                    .modes()
                    .iter()
                    .map(|(name, mode)| (name.to_string(), mode.repair_cost))
                    .collect();
                (b.name().to_string(), costs)
            })
            .collect();
        Self {
            repair,
            flows: Vec::new(),
            life,
            dt: model.time().dt,
        }
    }

    /// Linear lost-flow cost on `flow.field`.
    pub fn with_flow_cost(self, flow: impl Into<String>, field: impl Into<String>, weight: f64) -> Self {
        self.with_flow_loss(flow, field, weight, LossKind::Linear)
    }

    pub fn with_flow_loss(
        mut self,
        flow: impl Into<String>,
        field: impl Into<String>,
        weight: f64,
        loss: LossKind,
    ) -> Self {
        self.flows.push(FlowCost {
            flow: flow.into(),
            field: field.into(),
            weight,
            loss,
        });
        self
    }

    fn repair_cost(&self, history: &History) -> f64 {
        let Some(last) = history.last() else {
            return 0.0;
        };
        last.blocks
            .iter()
            .flat_map(|(block, rec)| {
                rec.faults
                    .iter()
                    .filter_map(move |mode| self.repair.get(block)?.get(mode))
            })
            .sum()
    }

    fn lost_flow_cost(&self, nominal: &History, faulty: &History) -> f64 {
        self.flows
            .iter()
            .map(|fc| {
                let (Some(nom), Some(fau)) = (
                    nominal.flow_series(&fc.flow, &fc.field),
                    faulty.flow_series(&fc.flow, &fc.field),
                ) else {
                    return 0.0;
                };
                fc.weight * fc.loss.loss(&nom, &fau, self.dt)
            })
            .sum()
    }
}

impl Classifier for ExpectedCost {
    fn classify(&self, nominal: &History, faulty: &History, scenario: &Scenario) -> Classification {
        let rate = if scenario.is_nominal() { 1.0 } else { scenario.rate };
        let cost = self.repair_cost(faulty) + self.lost_flow_cost(nominal, faulty);
        Classification {
            rate,
            cost,
            expected_cost: rate * self.life * cost,
        }
    }
}

/// Classify every successful run of a batch against its nominal entry.
///
/// Returns an empty map when the batch has no successful nominal run.
pub fn classify_batch(
    classifier: &dyn Classifier,
    results: &BatchResults,
    scenarios: &[Scenario],
) -> BTreeMap<String, Classification> {
    let Some(Ok(nominal)) = results.get(fp_sim::NOMINAL) else {
        return BTreeMap::new();
    };
    let nominal_scenario = Scenario::nominal();
    std::iter::once(&nominal_scenario)
        .chain(scenarios.iter())
        .filter_map(|s| {
            let faulty = results.get(&s.id)?.as_ref().ok()?;
            Some((s.id.clone(), classifier.classify(nominal, faulty, s)))
        })
        .collect()
}

/// Sum of expected costs, the usual headline resilience metric.
pub fn total_expected_cost(classes: &BTreeMap<String, Classification>) -> f64 {
    classes
        .iter()
        .filter(|(id, _)| id.as_str() != fp_sim::NOMINAL)
        .map(|(_, c)| c.expected_cost)
        .sum()
}
