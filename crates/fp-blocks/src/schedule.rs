//! Piecewise-constant operating profile over time.

use fp_graph::Access;
use serde::{Deserialize, Serialize};

use crate::behavior::{Behavior, BlockContext, FieldRef, Role};
use crate::error::{BlockError, BlockResult};
use crate::source::{FaultOutput, Noise, active_override, noise_gain, reset_noise, write_values};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment applies while `time < until`.
    pub until: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub field: String,
    pub segments: Vec<Segment>,
    /// Value once every segment has ended.
    #[serde(default)]
    pub after: f64,
    #[serde(default)]
    pub fault_outputs: Vec<FaultOutput>,
    #[serde(default)]
    pub noise: Vec<Noise>,
}

impl Schedule {
    pub fn value_at(&self, time: f64) -> f64 {
        self.segments
            .iter()
            .find(|s| time < s.until)
            .map_or(self.after, |s| s.value)
    }
}

const OUT: usize = 0;

impl Behavior for Schedule {
    fn roles(&self) -> Vec<Role> {
        vec![Role::new("out", Access::Write)]
    }

    fn field_refs(&self) -> Vec<FieldRef> {
        std::iter::once(&self.field)
            .chain(self.fault_outputs.iter().flat_map(|o| o.values.keys()))
            .map(|f| FieldRef::new(OUT, f.clone()))
            .collect()
    }

    fn mode_refs(&self) -> Vec<String> {
        self.fault_outputs.iter().map(|o| o.mode.clone()).collect()
    }

    fn behavior(&mut self, ctx: &mut BlockContext<'_>) -> BlockResult<()> {
        if let Some(over) = active_override(&self.fault_outputs, ctx) {
            reset_noise(&self.noise, ctx)?;
            return write_values(ctx, OUT, &over.values);
        }
        let base = self.value_at(ctx.time);
        // Noise only perturbs an active profile.
        let value = if base == 0.0 {
            reset_noise(&self.noise, ctx)?;
            base
        } else {
            base * noise_gain(&self.noise, ctx)?
        };
        ctx.write(OUT, &self.field, value)
    }

    fn set_param(&mut self, param: &str, value: f64) -> BlockResult<()> {
        if param == "after" {
            self.after = value;
            return Ok(());
        }
        Err(BlockError::UnknownParam {
            param: param.to_string(),
        })
    }
}
