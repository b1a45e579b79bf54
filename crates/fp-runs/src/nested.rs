//! Nested approach: parameter replicates crossed with a fault sweep.

use std::collections::{BTreeMap, BTreeSet};

use fp_blocks::SimRng;
use fp_results::History;
use fp_sim::{Model, ParamOverride, SimError, SimOptions};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::batch::{BatchOptions, BatchResults, run_with_nominal};
use crate::error::{RunsError, RunsResult};
use crate::progress::ProgressFn;
use crate::sweep::FaultSweep;

/// `count` copies of the model under the same parameter overrides, each
/// with its own seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicateGroup {
    pub name: String,
    pub count: usize,
    #[serde(default)]
    pub params: Vec<ParamOverride>,
}

impl ReplicateGroup {
    pub fn new(name: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            count,
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, block: impl Into<String>, param: impl Into<String>, value: f64) -> Self {
        self.params.push(ParamOverride::new(block, param, value));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedApproach {
    pub groups: Vec<ReplicateGroup>,
    /// Replicate seeds are derived from this.
    pub seed: u64,
}

/// One replicate of the approach.
#[derive(Debug, Clone, PartialEq)]
pub struct Replicate {
    pub id: String,
    pub group: String,
    pub seed: u64,
    pub params: Vec<ParamOverride>,
}

impl NestedApproach {
    pub fn new(seed: u64) -> Self {
        Self {
            groups: Vec::new(),
            seed,
        }
    }

    pub fn with_group(mut self, group: ReplicateGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Replicates in group order, ids `"<group>_<n>"` counted from 0.
    pub fn replicates(&self) -> Vec<Replicate> {
        self.groups
            .iter()
            .flat_map(|g| (0..g.count).map(move |n| (g, n)))
            .enumerate()
            .map(|(i, (g, n))| Replicate {
                id: format!("{}_{n}", g.name),
                group: g.name.clone(),
                seed: SimRng::derive_seed(self.seed, i as u64),
                params: g.params.clone(),
            })
            .collect()
    }
}

/// Results of a nested approach, keyed by replicate id then scenario id.
#[derive(Debug, Default)]
pub struct NestedResults {
    pub replicates: BTreeMap<String, BatchResults>,
}

impl NestedResults {
    pub fn get(&self, replicate: &str, scenario: &str) -> Option<&Result<History, SimError>> {
        self.replicates.get(replicate)?.get(scenario)
    }

    /// Number of (replicate, scenario) slots.
    pub fn len(&self) -> usize {
        self.replicates.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replicate ids belonging to `group`.
    pub fn group_ids<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.replicates.keys().map(String::as_str).filter(move |id| {
            id.strip_prefix(group)
                .and_then(|rest| rest.strip_prefix('_'))
                .is_some_and(|n| n.parse::<usize>().is_ok())
        })
    }
}

/// Run the fault sweep, plus a nominal run, on every replicate.
///
/// Overrides are applied to each replicate's copy of the model, so faulty
/// runs can still be staged off that replicate's nominal run. Replicates
/// fan out over the rayon pool when `options.parallel` is set. Replicate
/// ids must be unique.
#[instrument(skip_all, fields(model = %model.name(), groups = approach.groups.len()))]
pub fn run_nested(
    model: &Model,
    approach: &NestedApproach,
    sweep: &FaultSweep,
    sim_options: &SimOptions,
    options: &BatchOptions,
    progress: Option<ProgressFn<'_>>,
) -> RunsResult<NestedResults> {
    let replicates = approach.replicates();
    if replicates.is_empty() {
        return Err(RunsError::InvalidInput(
            "nested approach has no replicates".into(),
        ));
    }
    let mut ids = BTreeSet::new();
    for rep in &replicates {
        if !ids.insert(rep.id.as_str()) {
            return Err(RunsError::InvalidInput(format!(
                "replicate id '{}' is produced twice (group '{}')",
                rep.id, rep.group
            )));
        }
    }
    let scenarios = sweep.scenarios(model)?;
    info!(
        replicates = replicates.len(),
        scenarios = scenarios.len(),
        "nested approach starting"
    );

    let run_one = |rep: &Replicate| -> RunsResult<(String, BatchResults)> {
        let mut variant = model.clone();
        for p in &rep.params {
            variant.set_param(&p.block, &p.param, p.value)?;
        }
        let batch = run_with_nominal(&variant, &scenarios, rep.seed, sim_options, options, progress)?;
        Ok((rep.id.clone(), batch))
    };
    let replicates: BTreeMap<String, BatchResults> = if options.parallel {
        replicates.par_iter().map(run_one).collect::<RunsResult<_>>()?
    } else {
        replicates.iter().map(run_one).collect::<RunsResult<_>>()?
    };

    let results = NestedResults { replicates };
    info!(slots = results.len(), "nested approach complete");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicate_ids_and_seeds() {
        let approach = NestedApproach::new(5)
            .with_group(ReplicateGroup::new("delay_1", 2).with_param("move_water", "delay", 1.0))
            .with_group(ReplicateGroup::new("delay_10", 2).with_param("move_water", "delay", 10.0));
        let reps = approach.replicates();
        let ids: Vec<&str> = reps.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["delay_1_0", "delay_1_1", "delay_10_0", "delay_10_1"]);

        let mut seeds: Vec<u64> = reps.iter().map(|r| r.seed).collect();
        seeds.dedup();
        assert_eq!(seeds.len(), 4);
        assert_eq!(approach.replicates(), reps);
        assert_eq!(reps[3].params[0].value, 10.0);
    }

    #[test]
    fn group_ids_do_not_match_longer_names() {
        let mut results = NestedResults::default();
        for id in ["delay_1_0", "delay_1_1", "delay_10_0"] {
            results.replicates.insert(id.to_string(), BatchResults::new());
        }
        let ids: Vec<&str> = results.group_ids("delay_1").collect();
        assert_eq!(ids, ["delay_1_0", "delay_1_1"]);
    }
}
