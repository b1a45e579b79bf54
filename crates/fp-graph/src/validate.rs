//! Graph validation logic.

use std::collections::HashSet;

use fp_core::{ConfigError, ConfigResult};

use crate::graph::{BlockNode, FlowNode, Port};

/// Flow names and block names must each be unique.
pub(crate) fn validate_names<'a>(
    flows: impl IntoIterator<Item = &'a str>,
    blocks: impl IntoIterator<Item = &'a str>,
) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for name in flows {
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateName {
                kind: "flow",
                name: name.to_string(),
            });
        }
    }

    let mut seen = HashSet::new();
    for name in blocks {
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateName {
                kind: "block",
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Validate port bookkeeping: contiguous IDs, in-range references, and each
/// block's port list pointing back at the block.
pub(crate) fn validate_ports(
    flows: &[FlowNode],
    blocks: &[BlockNode],
    ports: &[Port],
) -> ConfigResult<()> {
    for (i, port) in ports.iter().enumerate() {
        let block_name = blocks
            .get(port.block.slot())
            .map_or_else(|| port.block.to_string(), |b| b.name.clone());

        if port.id.slot() != i || port.block.slot() >= blocks.len() {
            return Err(ConfigError::UnknownBlock {
                name: block_name,
                context: format!("port {}", port.id),
            });
        }
        if port.flow.slot() >= flows.len() {
            return Err(ConfigError::UnknownFlow {
                block: block_name,
                flow: port.flow.to_string(),
            });
        }
    }

    for block in blocks {
        for &port_id in &block.ports {
            let owner = ports.get(port_id.slot()).map(|p| p.block);
            if owner != Some(block.id) {
                return Err(ConfigError::UnknownBlock {
                    name: block.name.clone(),
                    context: format!("port {port_id} ownership"),
                });
            }
        }
    }

    Ok(())
}
