//! Core graph data structures.

use fp_core::{BlockId, FlowId, PortId};
use serde::{Deserialize, Serialize};

/// How a block uses one of its connected flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// The block only reads the flow.
    Read,
    /// The block only writes the flow.
    Write,
    /// The block reads and writes the flow.
    ReadWrite,
}

impl Access {
    pub fn reads(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    pub fn writes(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }
}

/// Execution class of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timing {
    /// Outputs are algebraically coupled within a step and must settle to a
    /// fixed point before time advances.
    #[default]
    Static,
    /// Runs exactly once per step on settled flow values.
    Dynamic,
}

/// A flow in the model graph (a shared state record).
///
/// Nodes are minimal: they hold no field data, just an ID and a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowNode {
    pub id: FlowId,
    pub name: String,
}

/// A port connects a block to a flow in a named role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub id: PortId,
    pub block: BlockId,
    pub flow: FlowId,
    /// Role name declared by the block kind (e.g. `ee_in`).
    pub role: String,
    pub access: Access,
}

/// A behavioral unit in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNode {
    pub id: BlockId,
    pub name: String,
    pub timing: Timing,
    /// Ports in positional role order.
    pub ports: Vec<PortId>,
}

/// The graph: a validated, immutable collection of flows, blocks, and ports.
///
/// The graph stores:
/// - All flows, blocks, and ports in vectors (indexed by their IDs).
/// - Compact adjacency: for each flow, which ports are incident.
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) flows: Vec<FlowNode>,
    pub(crate) blocks: Vec<BlockNode>,
    pub(crate) ports: Vec<Port>,

    /// Offsets for flow->port adjacency: flow i's ports are in flow_ports[flow_port_offsets[i]..flow_port_offsets[i+1]].
    pub(crate) flow_port_offsets: Vec<usize>,

    /// Flat list of port IDs incident to flows (sorted by flow ID then port ID for determinism).
    pub(crate) flow_ports: Vec<PortId>,
}

impl Graph {
    /// Return all flows.
    pub fn flows(&self) -> &[FlowNode] {
        &self.flows
    }

    /// Return all blocks in declaration order.
    pub fn blocks(&self) -> &[BlockNode] {
        &self.blocks
    }

    /// Return all ports.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Get a flow by ID (returns None if ID out of bounds).
    pub fn flow(&self, id: FlowId) -> Option<&FlowNode> {
        self.flows.get(id.slot())
    }

    /// Get a block by ID (returns None if ID out of bounds).
    pub fn block(&self, id: BlockId) -> Option<&BlockNode> {
        self.blocks.get(id.slot())
    }

    /// Get a port by ID (returns None if ID out of bounds).
    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id.slot())
    }

    pub fn flow_by_name(&self, name: &str) -> Option<FlowId> {
        self.flows.iter().find(|f| f.name == name).map(|f| f.id)
    }

    pub fn block_by_name(&self, name: &str) -> Option<BlockId> {
        self.blocks.iter().find(|b| b.name == name).map(|b| b.id)
    }

    /// Iterate over all port IDs incident to a given flow.
    pub fn flow_ports(&self, flow_id: FlowId) -> &[PortId] {
        let idx = flow_id.slot();
        if idx >= self.flows.len() {
            return &[];
        }
        let start = self.flow_port_offsets[idx];
        let end = self.flow_port_offsets[idx + 1];
        &self.flow_ports[start..end]
    }

    /// Ports of a block, in role order.
    pub fn block_ports(&self, block_id: BlockId) -> impl Iterator<Item = &Port> + '_ {
        self.block(block_id)
            .into_iter()
            .flat_map(|b| b.ports.iter())
            .filter_map(|&p| self.port(p))
    }

    /// Flows a block is connected to, in role order.
    pub fn block_flows(&self, block_id: BlockId) -> Vec<FlowId> {
        self.block_ports(block_id).map(|p| p.flow).collect()
    }

    /// Blocks that write to the given flow.
    pub fn writers_of(&self, flow_id: FlowId) -> Vec<BlockId> {
        self.incident_blocks(flow_id, Access::writes)
    }

    /// Blocks that read the given flow.
    pub fn readers_of(&self, flow_id: FlowId) -> Vec<BlockId> {
        self.incident_blocks(flow_id, Access::reads)
    }

    fn incident_blocks(&self, flow_id: FlowId, pred: fn(Access) -> bool) -> Vec<BlockId> {
        let mut out: Vec<BlockId> = self
            .flow_ports(flow_id)
            .iter()
            .filter_map(|&p| self.port(p))
            .filter(|p| pred(p.access))
            .map(|p| p.block)
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_flags() {
        assert!(Access::Read.reads());
        assert!(!Access::Read.writes());
        assert!(Access::Write.writes());
        assert!(!Access::Write.reads());
        assert!(Access::ReadWrite.reads() && Access::ReadWrite.writes());
    }

    #[test]
    fn timing_defaults_to_static() {
        assert_eq!(Timing::default(), Timing::Static);
    }
}
