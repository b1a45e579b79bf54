//! Single-fault sweep generation.

use std::collections::BTreeMap;

use fp_core::{ConfigError, ConfigResult};
use fp_sim::{Model, Scenario};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where in the horizon faults are injected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleTimes {
    PhaseStarts,
    PhaseCenters,
    Explicit(Vec<f64>),
}

impl SampleTimes {
    fn phase_derived(&self) -> bool {
        !matches!(self, SampleTimes::Explicit(_))
    }
}

/// Every listed (block, mode) pair injected at every sample time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultSweep {
    /// `None` sweeps every declared mode of every block.
    #[serde(default)]
    pub faults: Option<Vec<(String, String)>>,
    pub times: SampleTimes,
}

impl FaultSweep {
    pub fn all(times: SampleTimes) -> Self {
        Self {
            faults: None,
            times,
        }
    }

    pub fn of<B: Into<String>, M: Into<String>>(
        faults: impl IntoIterator<Item = (B, M)>,
        times: SampleTimes,
    ) -> Self {
        Self {
            faults: Some(
                faults
                    .into_iter()
                    .map(|(b, m)| (b.into(), m.into()))
                    .collect(),
            ),
            times,
        }
    }

    /// Expand into scenarios, one per (block, mode, sample time).
    ///
    /// Sample times snap down onto the step grid. A mode's rate at a sample
    /// is `failrate * dist * opportunity share of the phase`, split evenly
    /// over the samples that fall in that phase.
    pub fn scenarios(&self, model: &Model) -> ConfigResult<Vec<Scenario>> {
        let candidates = self.candidates(model)?;
        let samples = self.samples(model)?;

        let mut per_phase: BTreeMap<usize, usize> = BTreeMap::new();
        for phase in samples.iter().filter_map(|(_, p)| *p) {
            *per_phase.entry(phase).or_default() += 1;
        }

        let mut scenarios = Vec::new();
        for (block_name, mode_name) in &candidates {
            let Some(block) = model.block(block_name) else {
                continue;
            };
            let Some(mode) = block.modes().get(mode_name) else {
                continue;
            };
            for (time, phase) in &samples {
                let (share, in_phase) = match phase {
                    Some(p) => (mode.opportunity_share(*p), per_phase[p]),
                    None => (0.0, 1),
                };
                if share == 0.0 && self.times.phase_derived() {
                    continue;
                }
                let rate = block.failrate() * mode.dist * share / in_phase as f64;
                scenarios.push(Scenario::single(block_name, mode_name, *time).with_rate(rate));
            }
        }
        debug!(
            faults = candidates.len(),
            samples = samples.len(),
            scenarios = scenarios.len(),
            "fault sweep expanded"
        );
        Ok(scenarios)
    }

    fn candidates(&self, model: &Model) -> ConfigResult<Vec<(String, String)>> {
        let Some(listed) = &self.faults else {
            return Ok(model
                .blocks()
                .iter()
                .flat_map(|b| {
                    b.modes()
                        .iter()
                        .map(move |(mode, _)| (b.name().to_string(), mode.to_string()))
                })
                .collect());
        };
        for (block, mode) in listed {
            let found = model.block(block).ok_or_else(|| ConfigError::UnknownBlock {
                name: block.clone(),
                context: "fault sweep".into(),
            })?;
            if !found.modes().contains(mode) {
                return Err(ConfigError::UnknownMode {
                    block: block.clone(),
                    mode: mode.clone(),
                });
            }
        }
        Ok(listed.clone())
    }

    /// Distinct snapped sample times with their phase.
    fn samples(&self, model: &Model) -> ConfigResult<Vec<(f64, Option<usize>)>> {
        let raw: Vec<f64> = match &self.times {
            SampleTimes::PhaseStarts => model.phases().iter().map(|p| p.start).collect(),
            SampleTimes::PhaseCenters => model.phases().iter().map(|p| p.center()).collect(),
            SampleTimes::Explicit(times) => times.clone(),
        };
        let grid = model.time();
        let mut seen = Vec::new();
        let mut samples = Vec::new();
        for t in raw {
            let index = grid.index_floor(t).ok_or_else(|| ConfigError::InvalidTimeRange {
                what: format!(
                    "sample time {t} outside the horizon [{}, {}]",
                    grid.start, grid.end
                ),
            })?;
            if seen.contains(&index) {
                continue;
            }
            seen.push(index);
            let time = grid.time_at(index);
            samples.push((time, model.phase_index(time)));
        }
        Ok(samples)
    }
}
