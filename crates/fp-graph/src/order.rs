//! Execution ordering of blocks.
//!
//! Dependency edges run from a block that writes a flow to every other block
//! of the same timing class that reads it. Strongly connected components are
//! collapsed, the condensed DAG is sorted with Kahn's algorithm (ties broken
//! by declaration order), and members of a component keep declaration order.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use fp_core::BlockId;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::graph::{Graph, Timing};

/// Deterministic execution order for one model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionOrder {
    static_order: Vec<BlockId>,
    dynamic_order: Vec<BlockId>,
    static_cycles: Vec<Vec<BlockId>>,
}

impl ExecutionOrder {
    pub fn compute(graph: &Graph) -> Self {
        let (static_order, static_cycles) = order_class(graph, Timing::Static);
        let (dynamic_order, dynamic_cycles) = order_class(graph, Timing::Dynamic);

        debug!(
            static_blocks = static_order.len(),
            dynamic_blocks = dynamic_order.len(),
            static_cycles = static_cycles.len(),
            dynamic_cycles = dynamic_cycles.len(),
            "computed execution order"
        );

        Self {
            static_order,
            dynamic_order,
            static_cycles,
        }
    }

    /// Static blocks, run repeatedly until the step's flows settle.
    pub fn static_order(&self) -> &[BlockId] {
        &self.static_order
    }

    /// Dynamic blocks, each run once per step.
    pub fn dynamic_order(&self) -> &[BlockId] {
        &self.dynamic_order
    }

    /// Groups of static blocks with circular read/write dependencies.
    pub fn static_cycles(&self) -> &[Vec<BlockId>] {
        &self.static_cycles
    }

    pub fn has_static_cycles(&self) -> bool {
        !self.static_cycles.is_empty()
    }
}

fn order_class(graph: &Graph, timing: Timing) -> (Vec<BlockId>, Vec<Vec<BlockId>>) {
    let members: Vec<BlockId> = graph
        .blocks()
        .iter()
        .filter(|b| b.timing == timing)
        .map(|b| b.id)
        .collect();
    if members.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let mut deps: DiGraph<BlockId, ()> = DiGraph::with_capacity(members.len(), 0);
    let nodes: HashMap<BlockId, NodeIndex> =
        members.iter().map(|&id| (id, deps.add_node(id))).collect();

    let mut edges = BTreeSet::new();
    for flow in graph.flows() {
        let writers = graph.writers_of(flow.id);
        let readers = graph.readers_of(flow.id);
        for w in &writers {
            for r in &readers {
                if w == r {
                    continue;
                }
                if let (Some(&from), Some(&to)) = (nodes.get(w), nodes.get(r)) {
                    edges.insert((from, to));
                }
            }
        }
    }
    for &(from, to) in &edges {
        deps.add_edge(from, to, ());
    }

    // Component membership, each component sorted by declaration order.
    let mut components = tarjan_scc(&deps);
    for comp in &mut components {
        comp.sort_by_key(|&n| deps[n]);
    }
    components.sort_by_key(|comp| deps[comp[0]]);

    let mut component_of = vec![0usize; deps.node_count()];
    for (k, comp) in components.iter().enumerate() {
        for &n in comp {
            component_of[n.index()] = k;
        }
    }

    // Condensed DAG
    let mut adj: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); components.len()];
    let mut in_degree = vec![0usize; components.len()];
    for &(from, to) in &edges {
        let (a, b) = (component_of[from.index()], component_of[to.index()]);
        if a != b && adj[a].insert(b) {
            in_degree[b] += 1;
        }
    }

    // Kahn's algorithm; components are sorted by their first member, so the
    // smallest component index is the earliest declared.
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, deg)| **deg == 0)
        .map(|(k, _)| Reverse(k))
        .collect();

    let mut order = Vec::with_capacity(members.len());
    while let Some(Reverse(k)) = ready.pop() {
        order.extend(components[k].iter().map(|&n| deps[n]));
        for &next in &adj[k] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    let cycles = components
        .iter()
        .filter(|comp| comp.len() > 1)
        .map(|comp| comp.iter().map(|&n| deps[n]).collect())
        .collect();

    (order, cycles)
}
