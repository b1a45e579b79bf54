//! Electric pump moving water between two water flows.
//!
//! Roles: `ee_in`, `sig_in`, `wat_in`, `wat_out`. Modes `short` and
//! `mech_break` raise the current draw and stop the pump. Sustained outlet
//! pressure above 5 breaks the pump after `delay` time units.

use std::collections::BTreeMap;

use fp_graph::Access;
use serde::{Deserialize, Serialize};

use crate::behavior::{Behavior, BlockContext, FieldRef, Role};
use crate::error::{BlockError, BlockResult};
use crate::timer::Timer;

pub const MECH_BREAK: &str = "mech_break";
pub const SHORT: &str = "short";

const EE_IN: usize = 0;
const SIG_IN: usize = 1;
const WAT_IN: usize = 2;
const WAT_OUT: usize = 3;

/// Outlet effort above which the break timer runs.
const OVERPRESSURE: f64 = 5.0;
/// Effort the pump can draw from the supply at most.
const MAX_DRIVE_EFFORT: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pump {
    #[serde(default)]
    pub delay: f64,
    /// Random variable scaling nominal effectiveness.
    #[serde(default)]
    pub eff_var: Option<String>,
    #[serde(skip, default = "full_eff")]
    eff: f64,
    #[serde(skip)]
    timer: Timer,
}

fn full_eff() -> f64 {
    1.0
}

impl Pump {
    pub fn new(delay: f64) -> Self {
        Self {
            delay,
            eff_var: None,
            eff: full_eff(),
            timer: Timer::new(),
        }
    }

    pub fn eff(&self) -> f64 {
        self.eff
    }
}

impl Behavior for Pump {
    fn roles(&self) -> Vec<Role> {
        vec![
            Role::new("ee_in", Access::ReadWrite),
            Role::new("sig_in", Access::Read),
            Role::new("wat_in", Access::ReadWrite),
            Role::new("wat_out", Access::ReadWrite),
        ]
    }

    fn field_refs(&self) -> Vec<FieldRef> {
        vec![
            FieldRef::new(EE_IN, "rate"),
            FieldRef::new(EE_IN, "effort"),
            FieldRef::new(SIG_IN, "power"),
            FieldRef::new(WAT_IN, "level"),
            FieldRef::new(WAT_IN, "rate"),
            FieldRef::new(WAT_IN, "effort"),
            FieldRef::new(WAT_OUT, "area"),
            FieldRef::new(WAT_OUT, "rate"),
            FieldRef::new(WAT_OUT, "effort"),
        ]
    }

    fn mode_refs(&self) -> Vec<String> {
        vec![MECH_BREAK.to_string()]
    }

    fn condition(&mut self, ctx: &mut BlockContext<'_>) -> BlockResult<()> {
        if ctx.read(WAT_OUT, "effort")? <= OVERPRESSURE {
            return Ok(());
        }
        if self.delay > 0.0 {
            if ctx.advanced {
                self.timer.inc(ctx.dt);
            }
            if self.timer.exceeds(self.delay) {
                ctx.add_fault(MECH_BREAK)?;
            }
        } else {
            ctx.add_fault(MECH_BREAK)?;
        }
        Ok(())
    }

    fn behavior(&mut self, ctx: &mut BlockContext<'_>) -> BlockResult<()> {
        let power = ctx.read(SIG_IN, "power")?;
        let supply = ctx.read(EE_IN, "effort")?;
        let level = ctx.read(WAT_IN, "level")?;
        let area = ctx.read(WAT_OUT, "area")?;

        let (draw, eff) = if ctx.has_fault(SHORT) {
            (500.0, 0.0)
        } else if ctx.has_fault(MECH_BREAK) {
            (5.0, 0.0)
        } else {
            let eff = match &self.eff_var {
                Some(var) => ctx.rand_value(var)?,
                None => 1.0,
            };
            (1.0, eff)
        };
        self.eff = eff;
        ctx.write(EE_IN, "rate", draw * power * supply)?;

        let drive = power * eff * supply.min(MAX_DRIVE_EFFORT) * level;
        let effort = drive / area;
        let rate = drive * area;
        ctx.write(WAT_OUT, "effort", effort)?;
        ctx.write(WAT_OUT, "rate", rate)?;
        ctx.write(WAT_IN, "effort", effort)?;
        ctx.write(WAT_IN, "rate", rate)
    }

    fn set_param(&mut self, param: &str, value: f64) -> BlockResult<()> {
        match param {
            "delay" if value.is_finite() && value >= 0.0 => {
                self.delay = value;
                Ok(())
            }
            "delay" => Err(BlockError::InvalidParam {
                param: param.to_string(),
                reason: "delay must be finite and non-negative".into(),
            }),
            _ => Err(BlockError::UnknownParam {
                param: param.to_string(),
            }),
        }
    }

    fn state(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("eff".to_string(), self.eff),
            ("timer".to_string(), self.timer.time),
        ])
    }
}
