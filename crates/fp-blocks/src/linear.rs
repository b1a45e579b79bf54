//! Affine map from one flow's fields to a field of another flow.

use fp_graph::Access;
use serde::{Deserialize, Serialize};

use crate::behavior::{Behavior, BlockContext, FieldRef, Role};
use crate::error::{BlockError, BlockResult};
use crate::source::{FaultOutput, active_override, write_values};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub field: String,
    pub coeff: f64,
}

/// `out.output = offset + sum(coeff * in.field)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    pub terms: Vec<Term>,
    pub output: String,
    #[serde(default)]
    pub offset: f64,
    #[serde(default)]
    pub fault_outputs: Vec<FaultOutput>,
}

const IN: usize = 0;
const OUT: usize = 1;

impl Linear {
    pub fn eval(&self, ctx: &BlockContext<'_>) -> BlockResult<f64> {
        let mut acc = self.offset;
        for term in &self.terms {
            acc += term.coeff * ctx.read(IN, &term.field)?;
        }
        Ok(acc)
    }
}

impl Behavior for Linear {
    fn roles(&self) -> Vec<Role> {
        vec![Role::new("in", Access::Read), Role::new("out", Access::Write)]
    }

    fn field_refs(&self) -> Vec<FieldRef> {
        self.terms
            .iter()
            .map(|t| FieldRef::new(IN, t.field.clone()))
            .chain(std::iter::once(FieldRef::new(OUT, self.output.clone())))
            .chain(
                self.fault_outputs
                    .iter()
                    .flat_map(|o| o.values.keys())
                    .map(|f| FieldRef::new(OUT, f.clone())),
            )
            .collect()
    }

    fn mode_refs(&self) -> Vec<String> {
        self.fault_outputs.iter().map(|o| o.mode.clone()).collect()
    }

    fn behavior(&mut self, ctx: &mut BlockContext<'_>) -> BlockResult<()> {
        if let Some(over) = active_override(&self.fault_outputs, ctx) {
            return write_values(ctx, OUT, &over.values);
        }
        let value = self.eval(ctx)?;
        ctx.write(OUT, &self.output, value)
    }

    fn set_param(&mut self, param: &str, value: f64) -> BlockResult<()> {
        if param == "offset" {
            self.offset = value;
            return Ok(());
        }
        let term = param
            .strip_prefix("coeff.")
            .and_then(|field| self.terms.iter_mut().find(|t| t.field == field));
        match term {
            Some(t) => {
                t.coeff = value;
                Ok(())
            }
            None => Err(BlockError::UnknownParam {
                param: param.to_string(),
            }),
        }
    }
}
