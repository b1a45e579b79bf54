//! Incremental graph builder.

use std::collections::HashMap;

use fp_core::{BlockId, ConfigError, ConfigResult, FlowId, PortId};

use crate::graph::{Access, BlockNode, FlowNode, Graph, Port, Timing};
use crate::validate;

/// A block's connection to a flow, named by the flow's name.
///
/// Flow names are resolved when the graph is built, so a block may be
/// declared before the flows it uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub role: String,
    pub flow: String,
    pub access: Access,
}

impl PortSpec {
    pub fn new(role: impl Into<String>, flow: impl Into<String>, access: Access) -> Self {
        Self {
            role: role.into(),
            flow: flow.into(),
            access,
        }
    }
}

#[derive(Debug)]
struct PendingBlock {
    id: BlockId,
    name: String,
    timing: Timing,
    ports: Vec<PortSpec>,
}

/// Builder for constructing a graph incrementally.
///
/// Use `add_flow` and `add_block` to build up the graph,
/// then call `build()` to validate and freeze it into an immutable `Graph`.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    flows: Vec<FlowNode>,
    blocks: Vec<PendingBlock>,
    next_flow_id: u32,
    next_block_id: u32,
}

impl GraphBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a flow to the graph and return its ID.
    pub fn add_flow(&mut self, name: impl Into<String>) -> FlowId {
        let id = FlowId::from_index(self.next_flow_id);
        self.next_flow_id += 1;
        self.flows.push(FlowNode {
            id,
            name: name.into(),
        });
        id
    }

    /// Add a block with its flow connections (in role order).
    ///
    /// Returns the block ID. Unknown flow names are reported by `build()`.
    pub fn add_block(
        &mut self,
        name: impl Into<String>,
        timing: Timing,
        ports: impl IntoIterator<Item = PortSpec>,
    ) -> BlockId {
        let id = BlockId::from_index(self.next_block_id);
        self.next_block_id += 1;
        self.blocks.push(PendingBlock {
            id,
            name: name.into(),
            timing,
            ports: ports.into_iter().collect(),
        });
        id
    }

    /// Build and validate the graph, returning an immutable `Graph`.
    ///
    /// This resolves flow names, checks for duplicates and constructs
    /// compact adjacency lists.
    pub fn build(self) -> ConfigResult<Graph> {
        validate::validate_names(
            self.flows.iter().map(|f| f.name.as_str()),
            self.blocks.iter().map(|b| b.name.as_str()),
        )?;

        let flow_lookup: HashMap<&str, FlowId> =
            self.flows.iter().map(|f| (f.name.as_str(), f.id)).collect();

        let mut ports = Vec::new();
        let mut blocks = Vec::with_capacity(self.blocks.len());
        for pending in &self.blocks {
            let mut port_ids = Vec::with_capacity(pending.ports.len());
            for spec in &pending.ports {
                let flow = *flow_lookup.get(spec.flow.as_str()).ok_or_else(|| {
                    ConfigError::UnknownFlow {
                        block: pending.name.clone(),
                        flow: spec.flow.clone(),
                    }
                })?;
                let id = PortId::from_index(ports.len() as u32);
                ports.push(Port {
                    id,
                    block: pending.id,
                    flow,
                    role: spec.role.clone(),
                    access: spec.access,
                });
                port_ids.push(id);
            }
            blocks.push(BlockNode {
                id: pending.id,
                name: pending.name.clone(),
                timing: pending.timing,
                ports: port_ids,
            });
        }

        validate::validate_ports(&self.flows, &blocks, &ports)?;

        let (flow_port_offsets, flow_ports) = Self::build_adjacency(&self.flows, &ports);

        Ok(Graph {
            flows: self.flows,
            blocks,
            ports,
            flow_port_offsets,
            flow_ports,
        })
    }

    /// Build compact adjacency lists: for each flow, collect its incident ports.
    fn build_adjacency(flows: &[FlowNode], ports: &[Port]) -> (Vec<usize>, Vec<PortId>) {
        let mut flow_to_ports: HashMap<FlowId, Vec<PortId>> = HashMap::new();
        for port in ports {
            flow_to_ports.entry(port.flow).or_default().push(port.id);
        }

        // Sort each flow's port list for determinism
        for ports_list in flow_to_ports.values_mut() {
            ports_list.sort();
        }

        let mut offsets = Vec::with_capacity(flows.len() + 1);
        let mut flat_ports = Vec::new();
        offsets.push(0);

        for flow in flows {
            if let Some(ports_list) = flow_to_ports.get(&flow.id) {
                flat_ports.extend_from_slice(ports_list);
            }
            offsets.push(flat_ports.len());
        }

        (offsets, flat_ports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_basic() {
        let mut builder = GraphBuilder::new();
        let f1 = builder.add_flow("ee_1");
        let f2 = builder.add_flow("wat_1");
        let b1 = builder.add_block(
            "import_ee",
            Timing::Static,
            [PortSpec::new("out", "ee_1", Access::Write)],
        );

        assert_eq!(f1.index(), 0);
        assert_eq!(f2.index(), 1);
        assert_eq!(b1.index(), 0);
        assert_eq!(builder.flows.len(), 2);
        assert_eq!(builder.blocks.len(), 1);
    }

    #[test]
    fn builder_build_simple() {
        let mut builder = GraphBuilder::new();
        let ee = builder.add_flow("ee_1");
        let src = builder.add_block(
            "import_ee",
            Timing::Static,
            [PortSpec::new("out", "ee_1", Access::Write)],
        );
        let sink = builder.add_block(
            "use_ee",
            Timing::Dynamic,
            [PortSpec::new("in", "ee_1", Access::Read)],
        );

        let graph = builder.build().unwrap();
        assert_eq!(graph.flows().len(), 1);
        assert_eq!(graph.blocks().len(), 2);
        assert_eq!(graph.ports().len(), 2);
        assert_eq!(graph.flow_ports(ee).len(), 2);
        assert_eq!(graph.writers_of(ee), vec![src]);
        assert_eq!(graph.readers_of(ee), vec![sink]);
        assert_eq!(graph.block_flows(sink), vec![ee]);
    }

    #[test]
    fn unknown_flow_fails_at_build() {
        let mut builder = GraphBuilder::new();
        builder.add_flow("ee_1");
        builder.add_block(
            "move_water",
            Timing::Static,
            [PortSpec::new("wat_in", "wat_1", Access::Read)],
        );

        let err = builder.build().unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownFlow {
                block: "move_water".into(),
                flow: "wat_1".into(),
            }
        );
    }
}
