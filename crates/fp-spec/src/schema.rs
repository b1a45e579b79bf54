//! Model file schema definitions.

use std::collections::BTreeMap;

use fp_blocks::{BlockKind, FaultModes, RandVar};
use fp_sim::{Phase, Scenario, TimeParams};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSpec {
    #[serde(default)]
    pub version: u32,
    pub name: String,
    pub time: TimeParams,
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub flows: Vec<FlowDef>,
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowDef {
    pub name: String,
    /// Field names with their initial values.
    pub fields: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockDef {
    pub name: String,
    pub kind: BlockKind,
    /// Flow names in the kind's role order.
    pub flows: Vec<String>,
    /// Overrides the kind's default timing when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<bool>,
    #[serde(default)]
    pub failrate: f64,
    #[serde(default)]
    pub modes: FaultModes,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub random: BTreeMap<String, RandVar>,
}

impl FlowDef {
    pub fn new<K: Into<String>>(name: impl Into<String>, fields: impl IntoIterator<Item = (K, f64)>) -> Self {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl BlockDef {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        kind: BlockKind,
        flows: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            flows: flows.into_iter().map(Into::into).collect(),
            dynamic: None,
            failrate: 0.0,
            modes: FaultModes::new(),
            random: BTreeMap::new(),
        }
    }
}
