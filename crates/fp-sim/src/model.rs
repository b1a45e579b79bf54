//! Runtime model: the flow arena, the blocks and their execution order.

use std::collections::{BTreeMap, HashSet};

use fp_blocks::{Block, FlowState};
use fp_core::{BlockId, ConfigError, ConfigResult};
use fp_graph::{ExecutionOrder, Graph, GraphBuilder, PortSpec};
use fp_results::{BlockRecord, FlowValues};
use tracing::debug;

use crate::time::{Phase, TimeParams, phase_of};

/// Name of the phase added when a model declares none.
pub const DEFAULT_PHASE: &str = "operation";

/// A built model. Structure is fixed; cloning yields an independent branch.
#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) name: String,
    pub(crate) graph: Graph,
    pub(crate) order: ExecutionOrder,
    pub(crate) flows: Vec<FlowState>,
    pub(crate) blocks: Vec<Block>,
    pub(crate) time: TimeParams,
    pub(crate) phases: Vec<Phase>,
}

impl Model {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn order(&self) -> &ExecutionOrder {
        &self.order
    }

    pub fn time(&self) -> TimeParams {
        self.time
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn phase_index(&self, time: f64) -> Option<usize> {
        phase_of(&self.phases, time)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block_index(&self, name: &str) -> Option<usize> {
        self.graph.block_by_name(name).map(BlockId::slot)
    }

    pub fn block(&self, name: &str) -> Option<&Block> {
        self.block_index(name).and_then(|i| self.blocks.get(i))
    }

    pub fn flows(&self) -> &[FlowState] {
        &self.flows
    }

    pub fn flow(&self, name: &str) -> Option<&FlowState> {
        self.graph
            .flow_by_name(name)
            .and_then(|id| self.flows.get(id.slot()))
    }

    /// Override a block construction parameter.
    pub fn set_param(&mut self, block: &str, param: &str, value: f64) -> ConfigResult<()> {
        let index = self
            .block_index(block)
            .ok_or_else(|| ConfigError::UnknownBlock {
                name: block.to_string(),
                context: format!("parameter '{param}'"),
            })?;
        self.blocks[index].set_param(param, value)
    }

    pub(crate) fn flow_values(&self) -> FlowValues {
        self.graph
            .flows()
            .iter()
            .zip(&self.flows)
            .map(|(node, state)| (node.name.clone(), state.fields().clone()))
            .collect()
    }

    pub(crate) fn block_records(&self) -> BTreeMap<String, BlockRecord> {
        self.blocks
            .iter()
            .map(|b| {
                let record = BlockRecord {
                    state: b.state(),
                    faults: b.faults().clone(),
                };
                (b.name().to_string(), record)
            })
            .collect()
    }
}

/// Assembles a [`Model`] from flows, blocks and phases.
///
/// Blocks name the flows they connect to in the role order of their kind;
/// names are resolved by [`ModelBuilder::build`].
#[derive(Debug)]
pub struct ModelBuilder {
    name: String,
    time: TimeParams,
    phases: Vec<Phase>,
    flows: Vec<(String, FlowState)>,
    blocks: Vec<(Block, Vec<String>)>,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>, time: TimeParams) -> Self {
        Self {
            name: name.into(),
            time,
            phases: Vec::new(),
            flows: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn add_phase(&mut self, name: impl Into<String>, start: f64, end: f64) -> &mut Self {
        self.phases.push(Phase::new(name, start, end));
        self
    }

    /// Add a flow with its fixed field set and initial values.
    pub fn add_flow(&mut self, name: impl Into<String>, state: FlowState) -> &mut Self {
        self.flows.push((name.into(), state));
        self
    }

    pub fn add_block<S: Into<String>>(
        &mut self,
        block: Block,
        flows: impl IntoIterator<Item = S>,
    ) -> &mut Self {
        self.blocks
            .push((block, flows.into_iter().map(Into::into).collect()));
        self
    }

    /// Validate and freeze the model.
    pub fn build(self) -> ConfigResult<Model> {
        self.time.validate()?;
        let phases = self.checked_phases()?;

        let mut graph_builder = GraphBuilder::new();
        for (name, _) in &self.flows {
            graph_builder.add_flow(name.clone());
        }
        for (block, flow_names) in &self.blocks {
            if flow_names.len() != block.roles().len() {
                return Err(ConfigError::ConnectionCount {
                    block: block.name().to_string(),
                    expected: block.roles().len(),
                    actual: flow_names.len(),
                });
            }
            let ports = block
                .roles()
                .iter()
                .zip(flow_names)
                .map(|(role, flow)| PortSpec::new(role.name.clone(), flow.clone(), role.access));
            graph_builder.add_block(block.name(), block.timing(), ports);
        }
        let graph = graph_builder.build()?;

        let (flow_names, flows): (Vec<String>, Vec<FlowState>) = self.flows.into_iter().unzip();
        let mut blocks = Vec::with_capacity(self.blocks.len());
        for (node, (mut block, _)) in graph.blocks().iter().zip(self.blocks) {
            block.connect(graph.block_flows(node.id));
            block.validate(&flow_names, &flows, phases.len())?;
            blocks.push(block);
        }

        let order = ExecutionOrder::compute(&graph);
        debug!(
            model = %self.name,
            flows = flows.len(),
            blocks = blocks.len(),
            static_cycles = order.static_cycles().len(),
            "model built"
        );

        Ok(Model {
            name: self.name,
            graph,
            order,
            flows,
            blocks,
            time: self.time,
            phases,
        })
    }

    fn checked_phases(&self) -> ConfigResult<Vec<Phase>> {
        if self.phases.is_empty() {
            return Ok(vec![Phase::new(
                DEFAULT_PHASE,
                self.time.start,
                self.time.end,
            )]);
        }
        let mut seen = HashSet::new();
        for phase in &self.phases {
            if !seen.insert(phase.name.as_str()) {
                return Err(ConfigError::DuplicateName {
                    kind: "phase",
                    name: phase.name.clone(),
                });
            }
            let inside = self.time.start <= phase.start && phase.end <= self.time.end;
            if !(phase.start <= phase.end) || !inside {
                return Err(ConfigError::InvalidTimeRange {
                    what: format!(
                        "phase '{}' [{}, {}] must be ordered and lie in [{}, {}]",
                        phase.name, phase.start, phase.end, self.time.start, self.time.end
                    ),
                });
            }
        }
        Ok(self.phases.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fp_blocks::{BlockKind, Linear, Source, Term};

    fn source(name: &str, value: f64) -> Block {
        Block::new(
            name,
            BlockKind::Source(Source {
                outputs: BTreeMap::from([("x".to_string(), value)]),
                ..Source::default()
            }),
        )
    }

    fn doubler(name: &str) -> Block {
        Block::new(
            name,
            BlockKind::Linear(Linear {
                terms: vec![Term {
                    field: "x".into(),
                    coeff: 2.0,
                }],
                output: "x".into(),
                offset: 0.0,
                fault_outputs: Vec::new(),
            }),
        )
    }

    fn chain() -> ModelBuilder {
        let mut b = ModelBuilder::new("chain", TimeParams::new(0.0, 3.0, 1.0));
        b.add_flow("a", FlowState::new([("x", 0.0)]))
            .add_flow("b", FlowState::new([("x", 0.0)]))
            .add_block(doubler("double"), ["a", "b"])
            .add_block(source("feed", 1.5), ["a"]);
        b
    }

    #[test]
    fn builds_and_orders() {
        let model = chain().build().unwrap();
        assert_eq!(model.blocks().len(), 2);
        assert_eq!(model.phases()[0].name, DEFAULT_PHASE);
        let order: Vec<usize> = model
            .order()
            .static_order()
            .iter()
            .map(|id| id.slot())
            .collect();
        assert_eq!(order, vec![1, 0]);
        assert_eq!(model.block_index("feed"), Some(1));
        assert!(model.flow("b").is_some());
    }

    #[test]
    fn connection_count_checked() {
        let mut b = ModelBuilder::new("bad", TimeParams::default());
        b.add_flow("a", FlowState::new([("x", 0.0)]))
            .add_block(doubler("double"), ["a"]);
        assert!(matches!(
            b.build(),
            Err(ConfigError::ConnectionCount {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn unknown_flow_and_field() {
        let mut b = ModelBuilder::new("bad", TimeParams::default());
        b.add_flow("a", FlowState::new([("x", 0.0)]))
            .add_block(source("feed", 1.0), ["nowhere"]);
        assert!(matches!(b.build(), Err(ConfigError::UnknownFlow { .. })));

        let mut b = ModelBuilder::new("bad", TimeParams::default());
        b.add_flow("a", FlowState::new([("y", 0.0)]))
            .add_block(source("feed", 1.0), ["a"]);
        assert!(matches!(b.build(), Err(ConfigError::UnknownField { .. })));
    }

    #[test]
    fn phases_checked() {
        let mut b = chain();
        b.add_phase("on", 0.0, 2.0).add_phase("on", 2.0, 3.0);
        assert!(matches!(b.build(), Err(ConfigError::DuplicateName { kind: "phase", .. })));

        let mut b = chain();
        b.add_phase("late", 2.0, 9.0);
        assert!(matches!(b.build(), Err(ConfigError::InvalidTimeRange { .. })));

        let mut b = chain();
        b.time = TimeParams::new(0.0, 3.0, -1.0);
        assert!(matches!(b.build(), Err(ConfigError::InvalidTimeRange { .. })));

        let mut b = chain();
        b.time = TimeParams::new(0.0, 1e30, 1.0);
        assert!(matches!(b.build(), Err(ConfigError::InvalidTimeRange { .. })));
    }

    #[test]
    fn set_param_resolves_block() {
        let mut model = chain().build().unwrap();
        model.set_param("feed", "x", 4.0).unwrap();
        assert!(matches!(
            model.set_param("pump", "x", 1.0),
            Err(ConfigError::UnknownBlock { .. })
        ));
    }
}
