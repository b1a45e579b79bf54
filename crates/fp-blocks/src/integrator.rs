//! Dynamic accumulator: `value += gain * in.input * dt` once per step.

use std::collections::BTreeMap;

use fp_graph::Access;
use serde::{Deserialize, Serialize};

use crate::behavior::{Behavior, BlockContext, FieldRef, Role};
use crate::error::{BlockError, BlockResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Integrator {
    pub input: String,
    pub output: String,
    #[serde(default = "unit_gain")]
    pub gain: f64,
    #[serde(default)]
    pub initial: f64,
    /// While active, the value stops changing.
    #[serde(default)]
    pub stuck_mode: Option<String>,
    #[serde(skip)]
    accumulated: f64,
}

fn unit_gain() -> f64 {
    1.0
}

impl Integrator {
    pub fn new(input: impl Into<String>, output: impl Into<String>, gain: f64) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            gain,
            initial: 0.0,
            stuck_mode: None,
            accumulated: 0.0,
        }
    }

    pub fn value(&self) -> f64 {
        self.initial + self.accumulated
    }
}

const IN: usize = 0;
const OUT: usize = 1;

impl Behavior for Integrator {
    fn roles(&self) -> Vec<Role> {
        vec![Role::new("in", Access::Read), Role::new("out", Access::Write)]
    }

    fn field_refs(&self) -> Vec<FieldRef> {
        vec![
            FieldRef::new(IN, self.input.clone()),
            FieldRef::new(OUT, self.output.clone()),
        ]
    }

    fn mode_refs(&self) -> Vec<String> {
        self.stuck_mode.iter().cloned().collect()
    }

    fn behavior(&mut self, ctx: &mut BlockContext<'_>) -> BlockResult<()> {
        let stuck = self.stuck_mode.as_deref().is_some_and(|m| ctx.has_fault(m));
        if ctx.advanced && !stuck {
            self.accumulated += self.gain * ctx.read(IN, &self.input)? * ctx.dt;
        }
        ctx.write(OUT, &self.output, self.value())
    }

    fn set_param(&mut self, param: &str, value: f64) -> BlockResult<()> {
        match param {
            "gain" => self.gain = value,
            "initial" => self.initial = value,
            _ => {
                return Err(BlockError::UnknownParam {
                    param: param.to_string(),
                });
            }
        }
        Ok(())
    }

    fn state(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([("value".to_string(), self.value())])
    }
}
