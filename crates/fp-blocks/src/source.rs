//! Source blocks: write fixed nominal values onto one flow, replaced by
//! per-fault overrides when a fault is active.

use std::collections::BTreeMap;

use fp_graph::Access;
use serde::{Deserialize, Serialize};

use crate::behavior::{Behavior, BlockContext, FieldRef, Role};
use crate::error::{BlockError, BlockResult};
use crate::random::Distribution;

/// Field values written while `mode` is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultOutput {
    pub mode: String,
    pub values: BTreeMap<String, f64>,
}

/// Self-triggered fault: activate `mode` once `field` rises above `above`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub field: String,
    pub above: f64,
    pub mode: String,
}

/// Multiplicative noise on nominal outputs.
///
/// With a distribution, the variable is drawn on every new step; without
/// one it follows the block's update rule (or stays at its default).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Noise {
    pub var: String,
    #[serde(default)]
    pub distribution: Option<Distribution>,
}

/// First listed override whose mode is active.
pub(crate) fn active_override<'o>(
    outputs: &'o [FaultOutput],
    ctx: &BlockContext<'_>,
) -> Option<&'o FaultOutput> {
    outputs.iter().find(|o| ctx.has_fault(&o.mode))
}

pub(crate) fn write_values(
    ctx: &mut BlockContext<'_>,
    port: usize,
    values: &BTreeMap<String, f64>,
) -> BlockResult<()> {
    for (field, value) in values {
        ctx.write(port, field, *value)?;
    }
    Ok(())
}

/// Product of all noise variables, drawing the explicit ones.
pub(crate) fn noise_gain(noise: &[Noise], ctx: &mut BlockContext<'_>) -> BlockResult<f64> {
    let mut gain = 1.0;
    for n in noise {
        gain *= match &n.distribution {
            Some(dist) => ctx.draw(&n.var, dist)?,
            None => ctx.rand_value(&n.var)?,
        };
    }
    Ok(gain)
}

pub(crate) fn reset_noise(noise: &[Noise], ctx: &mut BlockContext<'_>) -> BlockResult<()> {
    for n in noise {
        ctx.rand_to_default(&n.var)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub outputs: BTreeMap<String, f64>,
    #[serde(default)]
    pub fault_outputs: Vec<FaultOutput>,
    #[serde(default)]
    pub trip: Option<Trip>,
    #[serde(default)]
    pub noise: Vec<Noise>,
}

const OUT: usize = 0;

impl Behavior for Source {
    fn roles(&self) -> Vec<Role> {
        let access = if self.trip.is_some() {
            Access::ReadWrite
        } else {
            Access::Write
        };
        vec![Role::new("out", access)]
    }

    fn field_refs(&self) -> Vec<FieldRef> {
        let mut refs: Vec<FieldRef> = self
            .outputs
            .keys()
            .chain(self.fault_outputs.iter().flat_map(|o| o.values.keys()))
            .map(|f| FieldRef::new(OUT, f.clone()))
            .collect();
        if let Some(trip) = &self.trip {
            refs.push(FieldRef::new(OUT, trip.field.clone()));
        }
        refs
    }

    fn mode_refs(&self) -> Vec<String> {
        self.fault_outputs
            .iter()
            .map(|o| o.mode.clone())
            .chain(self.trip.iter().map(|t| t.mode.clone()))
            .collect()
    }

    fn condition(&mut self, ctx: &mut BlockContext<'_>) -> BlockResult<()> {
        if let Some(trip) = &self.trip
            && ctx.read(OUT, &trip.field)? > trip.above
        {
            ctx.add_fault(&trip.mode)?;
        }
        Ok(())
    }

    fn behavior(&mut self, ctx: &mut BlockContext<'_>) -> BlockResult<()> {
        if let Some(over) = active_override(&self.fault_outputs, ctx) {
            reset_noise(&self.noise, ctx)?;
            return write_values(ctx, OUT, &over.values);
        }
        let gain = noise_gain(&self.noise, ctx)?;
        for (field, value) in &self.outputs {
            ctx.write(OUT, field, value * gain)?;
        }
        Ok(())
    }

    fn set_param(&mut self, param: &str, value: f64) -> BlockResult<()> {
        match self.outputs.get_mut(param) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(BlockError::UnknownParam {
                param: param.to_string(),
            }),
        }
    }
}
