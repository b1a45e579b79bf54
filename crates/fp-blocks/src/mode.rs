//! Fault-mode registry.

use std::collections::BTreeSet;
use std::fmt;

use fp_core::{ConfigError, ConfigResult};
use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Active fault names of a block, kept sorted for stable output.
pub type FaultSet = BTreeSet<String>;

/// One declared fault mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultMode {
    /// Share of the block failure rate attributed to this mode.
    pub dist: f64,
    /// Relative likelihood per model phase.
    pub opportunity: Vec<f64>,
    #[serde(default)]
    pub repair_cost: f64,
}

impl FaultMode {
    pub fn new(dist: f64, opportunity: impl Into<Vec<f64>>, repair_cost: f64) -> Self {
        Self {
            dist,
            opportunity: opportunity.into(),
            repair_cost,
        }
    }

    /// Fraction of this mode's opportunity that falls in `phase`.
    ///
    /// Returns 0 when the vector sums to zero or the phase is out of range.
    pub fn opportunity_share(&self, phase: usize) -> f64 {
        let total: f64 = self.opportunity.iter().sum();
        match self.opportunity.get(phase) {
            Some(w) if total > 0.0 => w / total,
            _ => 0.0,
        }
    }
}

/// Ordered registry of fault modes keyed by unique name.
///
/// Deserializing rejects a name that appears twice in the source map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FaultModes {
    modes: IndexMap<String, FaultMode>,
}

impl FaultModes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting duplicate names.
    pub fn from_entries(
        block: &str,
        entries: impl IntoIterator<Item = (String, FaultMode)>,
    ) -> ConfigResult<Self> {
        let mut modes = Self::new();
        for (name, mode) in entries {
            modes.insert(block, name, mode)?;
        }
        Ok(modes)
    }

    pub fn insert(
        &mut self,
        block: &str,
        name: impl Into<String>,
        mode: FaultMode,
    ) -> ConfigResult<()> {
        let name = name.into();
        if self.modes.contains_key(&name) {
            return Err(ConfigError::DuplicateMode {
                block: block.to_string(),
                mode: name,
            });
        }
        self.modes.insert(name, mode);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FaultMode> {
        self.modes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modes.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FaultMode)> {
        self.modes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Check weights are finite and non-negative and every opportunity
    /// vector has one entry per phase.
    pub fn validate(&self, block: &str, phase_count: usize) -> ConfigResult<()> {
        for (name, mode) in &self.modes {
            if mode.opportunity.len() != phase_count {
                return Err(ConfigError::OpportunityLength {
                    block: block.to_string(),
                    mode: name.clone(),
                    expected: phase_count,
                    actual: mode.opportunity.len(),
                });
            }
            let weights_ok = std::iter::once(mode.dist)
                .chain(mode.opportunity.iter().copied())
                .chain(std::iter::once(mode.repair_cost))
                .all(|w| w.is_finite() && w >= 0.0);
            if !weights_ok {
                return Err(ConfigError::InvalidParam {
                    block: block.to_string(),
                    param: format!("modes.{name}"),
                    reason: "weights and costs must be finite and non-negative".into(),
                });
            }
        }
        Ok(())
    }
}

struct FaultModesVisitor;

impl<'de> Visitor<'de> for FaultModesVisitor {
    type Value = FaultModes;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of fault mode names to modes")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FaultModes, A::Error> {
        let mut modes = FaultModes::new();
        while let Some((name, mode)) = map.next_entry::<String, FaultMode>()? {
            if modes.modes.contains_key(&name) {
                return Err(de::Error::custom(format!("duplicate fault mode '{name}'")));
            }
            modes.modes.insert(name, mode);
        }
        Ok(modes)
    }
}

impl<'de> Deserialize<'de> for FaultModes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FaultModesVisitor)
    }
}
