//! Turning a validated file into a runnable model.

use fp_blocks::{Block, FlowState};
use fp_graph::Timing;
use fp_sim::{Model, ModelBuilder, Scenario};
use tracing::debug;

use crate::ProjectResult;
use crate::schema::{BlockDef, ModelSpec};

impl BlockDef {
    pub fn to_block(&self) -> Block {
        let mut block = Block::new(&self.name, self.kind.clone())
            .with_failrate(self.failrate)
            .with_modes(self.modes.clone())
            .with_rand(self.random.clone());
        if let Some(dynamic) = self.dynamic {
            block = block.with_timing(if dynamic {
                Timing::Dynamic
            } else {
                Timing::Static
            });
        }
        block
    }
}

impl ModelSpec {
    /// Assemble the model. Structural problems the file validator cannot
    /// see (unknown fields, role counts, undeclared modes) surface here as
    /// [`fp_core::ConfigError`]s.
    pub fn build_model(&self) -> ProjectResult<Model> {
        let mut builder = ModelBuilder::new(&self.name, self.time);
        for phase in &self.phases {
            builder.add_phase(&phase.name, phase.start, phase.end);
        }
        for flow in &self.flows {
            builder.add_flow(&flow.name, FlowState::new(flow.fields.clone()));
        }
        for def in &self.blocks {
            builder.add_block(def.to_block(), def.flows.iter().cloned());
        }
        let model = builder.build()?;
        debug!(model = %self.name, blocks = self.blocks.len(), "model file assembled");
        Ok(model)
    }

    /// The file's scenarios, each resolved against `model`.
    pub fn resolved_scenarios(&self, model: &Model) -> ProjectResult<Vec<Scenario>> {
        for scenario in &self.scenarios {
            scenario.validate(model)?;
        }
        Ok(self.scenarios.clone())
    }
}
