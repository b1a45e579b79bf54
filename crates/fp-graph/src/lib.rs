//! fp-graph: structural layer for faultprop models.
//!
//! Provides:
//! - Core graph data structures (FlowNode, BlockNode, Port, Graph)
//! - Incremental graph builder with validation
//! - Deterministic static/dynamic execution order
//!
//! # Example
//!
//! ```
//! use fp_graph::{Access, ExecutionOrder, GraphBuilder, PortSpec, Timing};
//!
//! let mut builder = GraphBuilder::new();
//! builder.add_flow("ee_1");
//! builder.add_block("import_ee", Timing::Static, [PortSpec::new("out", "ee_1", Access::Write)]);
//! builder.add_block("move_water", Timing::Static, [PortSpec::new("ee_in", "ee_1", Access::Read)]);
//! let graph = builder.build().unwrap();
//!
//! assert_eq!(graph.flows().len(), 1);
//! assert_eq!(ExecutionOrder::compute(&graph).static_order().len(), 2);
//! ```

pub mod builder;
pub mod graph;
pub mod order;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::{GraphBuilder, PortSpec};
pub use graph::{Access, BlockNode, FlowNode, Graph, Port, Timing};
pub use order::ExecutionOrder;
