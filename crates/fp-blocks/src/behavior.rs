//! The capability interface every block kind implements.

use std::collections::BTreeMap;

use fp_core::FlowId;
use fp_graph::Access;

use crate::error::{BlockError, BlockResult};
use crate::flow::FlowState;
use crate::mode::{FaultModes, FaultSet};
use crate::random::{Distribution, RandState};

/// A positional connection a block kind declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub access: Access,
}

impl Role {
    pub fn new(name: impl Into<String>, access: Access) -> Self {
        Self {
            name: name.into(),
            access,
        }
    }
}

/// A flow field a block kind reads or writes, by role position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub port: usize,
    pub field: String,
}

impl FieldRef {
    pub fn new(port: usize, field: impl Into<String>) -> Self {
        Self {
            port,
            field: field.into(),
        }
    }
}

/// Everything a behavior may touch during one invocation.
pub struct BlockContext<'a> {
    /// Current simulation time.
    pub time: f64,
    pub dt: f64,
    /// `time` is strictly later than this block's previous invocation.
    pub advanced: bool,
    /// False while a condition runs; conditions only read flows.
    pub(crate) writable: bool,
    pub(crate) roles: &'a [Role],
    pub(crate) ports: &'a [FlowId],
    pub(crate) flows: &'a mut [FlowState],
    pub(crate) modes: &'a FaultModes,
    pub(crate) faults: &'a mut FaultSet,
    pub(crate) rand: &'a mut RandState,
}

impl<'a> BlockContext<'a> {
    fn flow_index(&self, port: usize) -> BlockResult<usize> {
        self.ports
            .get(port)
            .map(|id| id.slot())
            .ok_or(BlockError::PortOutOfRange {
                port,
                len: self.ports.len(),
            })
    }

    fn role_name(&self, port: usize) -> String {
        self.roles
            .get(port)
            .map_or_else(|| port.to_string(), |r| r.name.clone())
    }

    /// Read a field of the flow connected at `port`.
    pub fn read(&self, port: usize, field: &str) -> BlockResult<f64> {
        let idx = self.flow_index(port)?;
        self.flows
            .get(idx)
            .and_then(|f| f.get(field))
            .ok_or_else(|| BlockError::UnknownField {
                role: self.role_name(port),
                field: field.to_string(),
            })
    }

    /// Write a field of the flow connected at `port`. Non-finite values are
    /// rejected.
    pub fn write(&mut self, port: usize, field: &str, value: f64) -> BlockResult<()> {
        if !self.writable {
            return Err(BlockError::ReadOnly {
                role: self.role_name(port),
                field: field.to_string(),
            });
        }
        if !value.is_finite() {
            return Err(BlockError::NonFinite {
                role: self.role_name(port),
                field: field.to_string(),
                value,
            });
        }
        let idx = self.flow_index(port)?;
        let written = self
            .flows
            .get_mut(idx)
            .is_some_and(|f| f.set(field, value));
        if written {
            Ok(())
        } else {
            Err(BlockError::UnknownField {
                role: self.role_name(port),
                field: field.to_string(),
            })
        }
    }

    pub fn has_fault(&self, mode: &str) -> bool {
        self.faults.contains(mode)
    }

    pub fn has_any_fault(&self) -> bool {
        !self.faults.is_empty()
    }

    /// Activate a declared fault mode.
    pub fn add_fault(&mut self, mode: &str) -> BlockResult<()> {
        if !self.modes.contains(mode) {
            return Err(BlockError::UnknownMode {
                mode: mode.to_string(),
            });
        }
        self.faults.insert(mode.to_string());
        Ok(())
    }

    /// Current value of a random variable.
    pub fn rand_value(&self, name: &str) -> BlockResult<f64> {
        self.rand
            .value(name)
            .ok_or_else(|| BlockError::UnknownVariable {
                name: name.to_string(),
            })
    }

    /// Draw a random variable. Only advances the stream when time has moved
    /// on, so repeated passes within a step see the same value.
    pub fn draw(&mut self, name: &str, dist: &Distribution) -> BlockResult<f64> {
        if self.advanced {
            self.rand.draw(name, dist)
        } else {
            self.rand_value(name)
        }
    }

    pub fn rand_to_default(&mut self, name: &str) -> BlockResult<()> {
        self.rand.to_default(name)
    }
}

/// Behavior of one block kind.
///
/// `condition` runs once per step against the previous step's flows and may
/// activate faults but not write flows; `behavior` computes outputs and may
/// run several times per step for static blocks.
pub trait Behavior {
    /// Positional connections this kind expects.
    fn roles(&self) -> Vec<Role>;

    /// Flow fields this kind touches, checked against the connected flows
    /// when the model is built.
    fn field_refs(&self) -> Vec<FieldRef>;

    /// Fault modes this kind refers to, checked against the block's registry.
    fn mode_refs(&self) -> Vec<String> {
        Vec::new()
    }

    fn condition(&mut self, _ctx: &mut BlockContext<'_>) -> BlockResult<()> {
        Ok(())
    }

    fn behavior(&mut self, ctx: &mut BlockContext<'_>) -> BlockResult<()>;

    /// Override a construction parameter.
    fn set_param(&mut self, param: &str, _value: f64) -> BlockResult<()> {
        Err(BlockError::UnknownParam {
            param: param.to_string(),
        })
    }

    /// Observable internal state.
    fn state(&self) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }
}
