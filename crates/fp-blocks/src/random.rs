//! Stochastic sub-state of a block.
//!
//! A block may declare named random variables, each with a default value and
//! an optional update rule (a distribution sampled every `n` steps). Draws
//! come from the block's own seeded stream. With density tracking on, the
//! density of every draw is multiplied into the block's accumulator.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{BlockError, BlockResult};
use crate::rng::SimRng;

/// Whether and how stochastic variables are sampled during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StochasticMode {
    /// Variables keep their defaults; no draws happen.
    #[default]
    Off,
    /// Variables are sampled.
    On,
    /// Variables are sampled and draw densities are accumulated.
    TrackDensity,
}

impl StochasticMode {
    pub fn is_sampling(self) -> bool {
        !matches!(self, StochasticMode::Off)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution {
    Normal { mean: f64, std: f64 },
    Uniform { low: f64, high: f64 },
    Triangular { low: f64, mode: f64, high: f64 },
    Choice { values: Vec<f64> },
}

impl Distribution {
    pub fn validate(&self) -> BlockResult<()> {
        let bad = |what| Err(BlockError::InvalidDistribution { what });
        match self {
            Distribution::Normal { mean, std } => {
                if !mean.is_finite() || !std.is_finite() || *std <= 0.0 {
                    return bad("normal requires finite mean and std > 0");
                }
            }
            Distribution::Uniform { low, high } => {
                if !low.is_finite() || !high.is_finite() || low >= high {
                    return bad("uniform requires finite low < high");
                }
            }
            Distribution::Triangular { low, mode, high } => {
                let finite = low.is_finite() && mode.is_finite() && high.is_finite();
                if !finite || low >= high || mode < low || mode > high {
                    return bad("triangular requires low <= mode <= high and low < high");
                }
            }
            Distribution::Choice { values } => {
                if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
                    return bad("choice requires at least one finite value");
                }
            }
        }
        Ok(())
    }

    pub fn sample(&self, rng: &mut SimRng) -> f64 {
        match self {
            Distribution::Normal { mean, std } => rng.gen_normal(*mean, *std),
            Distribution::Uniform { low, high } => rng.gen_range_f64(*low, *high),
            Distribution::Triangular { low, mode, high } => {
                let u = rng.gen_f64();
                let span = high - low;
                let split = (mode - low) / span;
                if u < split {
                    low + (u * span * (mode - low)).sqrt()
                } else {
                    high - ((1.0 - u) * span * (high - mode)).sqrt()
                }
            }
            Distribution::Choice { values } => {
                let idx = (rng.gen_f64() * values.len() as f64) as usize;
                values[idx.min(values.len() - 1)]
            }
        }
    }

    /// Density (or probability mass for `Choice`) at `x`.
    pub fn pdf(&self, x: f64) -> f64 {
        match self {
            Distribution::Normal { mean, std } => {
                let z = (x - mean) / std;
                (-0.5 * z * z).exp() / (std * (2.0 * PI).sqrt())
            }
            Distribution::Uniform { low, high } => {
                if (*low..*high).contains(&x) {
                    1.0 / (high - low)
                } else {
                    0.0
                }
            }
            Distribution::Triangular { low, mode, high } => {
                if x < *low || x > *high {
                    0.0
                } else if x < *mode {
                    2.0 * (x - low) / ((high - low) * (mode - low))
                } else if x > *mode {
                    2.0 * (high - x) / ((high - low) * (high - mode))
                } else {
                    2.0 / (high - low)
                }
            }
            Distribution::Choice { values } => {
                let hits = values.iter().filter(|v| **v == x).count();
                hits as f64 / values.len() as f64
            }
        }
    }
}

/// Scheduled resampling of a random variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRule {
    pub distribution: Distribution,
    /// Resample on step indices divisible by this.
    #[serde(default = "default_every")]
    pub every: u32,
}

fn default_every() -> u32 {
    1
}

impl UpdateRule {
    pub fn is_due(&self, step_index: usize) -> bool {
        self.every > 0 && step_index % self.every as usize == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandVar {
    pub default: f64,
    #[serde(default)]
    pub update: Option<UpdateRule>,
    #[serde(skip)]
    value: Option<f64>,
}

impl RandVar {
    pub fn new(default: f64) -> Self {
        Self {
            default,
            update: None,
            value: None,
        }
    }

    pub fn with_update(mut self, distribution: Distribution, every: u32) -> Self {
        self.update = Some(UpdateRule {
            distribution,
            every,
        });
        self
    }

    /// Current value (the default until first drawn).
    pub fn value(&self) -> f64 {
        self.value.unwrap_or(self.default)
    }
}

/// Random variables of one block plus the stream they draw from.
#[derive(Debug, Clone)]
pub struct RandState {
    vars: BTreeMap<String, RandVar>,
    rng: SimRng,
    mode: StochasticMode,
    density: f64,
}

impl Default for RandState {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

impl RandState {
    pub fn new(vars: BTreeMap<String, RandVar>) -> Self {
        Self {
            vars,
            rng: SimRng::default(),
            mode: StochasticMode::Off,
            density: 1.0,
        }
    }

    /// Reseed the block's stream and reset every variable to its default.
    pub fn seed(&mut self, seed: u64, stream: u64, mode: StochasticMode) {
        self.rng = SimRng::stream(seed, stream);
        self.mode = mode;
        self.density = 1.0;
        self.to_default_all();
    }

    pub fn mode(&self) -> StochasticMode {
        self.mode
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &RandVar)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.vars.get(name).map(RandVar::value)
    }

    /// Accumulated density of all draws so far (1.0 when not tracking).
    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn validate(&self) -> BlockResult<()> {
        for var in self.vars.values() {
            if !var.default.is_finite() {
                return Err(BlockError::InvalidDistribution {
                    what: "default value must be finite",
                });
            }
            if let Some(rule) = &var.update {
                rule.distribution.validate()?;
                if rule.every == 0 {
                    return Err(BlockError::InvalidDistribution {
                        what: "update interval must be at least one step",
                    });
                }
            }
        }
        Ok(())
    }

    /// Draw `name` from `dist`. With sampling off, the current value is
    /// returned unchanged.
    pub fn draw(&mut self, name: &str, dist: &Distribution) -> BlockResult<f64> {
        let Some(var) = self.vars.get_mut(name) else {
            return Err(BlockError::UnknownVariable {
                name: name.to_string(),
            });
        };
        if !self.mode.is_sampling() {
            return Ok(var.value());
        }
        let x = dist.sample(&mut self.rng);
        var.value = Some(x);
        if self.mode == StochasticMode::TrackDensity {
            self.density *= dist.pdf(x);
        }
        Ok(x)
    }

    /// Run every update rule due at `step_index`.
    pub fn update_due(&mut self, step_index: usize) -> BlockResult<()> {
        if !self.mode.is_sampling() {
            return Ok(());
        }
        let due: Vec<(String, Distribution)> = self
            .vars
            .iter()
            .filter_map(|(name, var)| {
                var.update
                    .as_ref()
                    .filter(|rule| rule.is_due(step_index))
                    .map(|rule| (name.clone(), rule.distribution.clone()))
            })
            .collect();
        for (name, dist) in due {
            self.draw(&name, &dist)?;
        }
        Ok(())
    }

    pub fn to_default(&mut self, name: &str) -> BlockResult<()> {
        match self.vars.get_mut(name) {
            Some(var) => {
                var.value = None;
                Ok(())
            }
            None => Err(BlockError::UnknownVariable {
                name: name.to_string(),
            }),
        }
    }

    pub fn to_default_all(&mut self) {
        for var in self.vars.values_mut() {
            var.value = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pump_eff() -> RandState {
        let mut vars = BTreeMap::new();
        vars.insert(
            "eff".to_string(),
            RandVar::new(1.0).with_update(
                Distribution::Normal {
                    mean: 1.0,
                    std: 0.2,
                },
                1,
            ),
        );
        RandState::new(vars)
    }

    #[test]
    fn off_mode_keeps_defaults() {
        let mut state = pump_eff();
        state.seed(5, 3, StochasticMode::Off);
        state.update_due(0).unwrap();
        assert_eq!(state.value("eff"), Some(1.0));
        assert_eq!(state.density(), 1.0);
    }

    #[test]
    fn same_seed_same_draws() {
        let mut a = pump_eff();
        let mut b = pump_eff();
        a.seed(5, 3, StochasticMode::On);
        b.seed(5, 3, StochasticMode::On);
        for step in 0..10 {
            a.update_due(step).unwrap();
            b.update_due(step).unwrap();
            assert_eq!(a.value("eff"), b.value("eff"));
        }
        assert_ne!(a.value("eff"), Some(1.0));
    }

    #[test]
    fn density_tracking_multiplies() {
        let mut state = pump_eff();
        state.seed(9, 0, StochasticMode::TrackDensity);
        state.update_due(0).unwrap();
        let x = state.value("eff").unwrap();
        let expected = Distribution::Normal {
            mean: 1.0,
            std: 0.2,
        }
        .pdf(x);
        assert!((state.density() - expected).abs() < 1e-12);
    }

    #[test]
    fn schedule_respects_interval() {
        let rule = UpdateRule {
            distribution: Distribution::Choice {
                values: vec![1.0, 0.9, 1.1],
            },
            every: 5,
        };
        assert!(rule.is_due(0));
        assert!(!rule.is_due(3));
        assert!(rule.is_due(10));
    }

    #[test]
    fn to_default_restores() {
        let mut state = pump_eff();
        state.seed(1, 0, StochasticMode::On);
        state.update_due(0).unwrap();
        state.to_default("eff").unwrap();
        assert_eq!(state.value("eff"), Some(1.0));
        assert!(matches!(
            state.to_default("noise"),
            Err(BlockError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn invalid_distributions_rejected() {
        assert!(Distribution::Normal { mean: 0.0, std: 0.0 }.validate().is_err());
        assert!(Distribution::Uniform { low: 1.0, high: 1.0 }.validate().is_err());
        assert!(
            Distribution::Triangular {
                low: 0.9,
                mode: 1.2,
                high: 1.1
            }
            .validate()
            .is_err()
        );
        assert!(Distribution::Choice { values: vec![] }.validate().is_err());
        assert!(
            Distribution::Triangular {
                low: 0.9,
                mode: 1.0,
                high: 1.1
            }
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn triangular_samples_within_support() {
        let dist = Distribution::Triangular {
            low: 0.9,
            mode: 1.0,
            high: 1.1,
        };
        let mut rng = SimRng::new(11);
        for _ in 0..500 {
            let x = dist.sample(&mut rng);
            assert!((0.9..=1.1).contains(&x));
            assert!(dist.pdf(x) > 0.0 || x == 0.9 || x == 1.1);
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn uniform_draws_stay_in_support(
            seed in any::<u64>(),
            low in -10.0f64..10.0,
            span in 0.1f64..5.0,
        ) {
            let high = low + span;
            let dist = Distribution::Uniform { low, high };
            let mut rng = SimRng::new(seed);
            for _ in 0..16 {
                let x = dist.sample(&mut rng);
                prop_assert!(x >= low && x <= high);
            }
        }

        #[test]
        fn choice_draws_a_listed_value(seed in any::<u64>()) {
            let values = vec![1.0, 0.9, 1.1];
            let dist = Distribution::Choice { values: values.clone() };
            let mut rng = SimRng::new(seed);
            let x = dist.sample(&mut rng);
            prop_assert!(values.contains(&x));
            prop_assert!((dist.pdf(x) - 1.0 / 3.0).abs() < 1e-12);
        }
    }
}
