//! Filtering helpers for `nodeset filter`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::core::policy::NodeSet;
use crate::io::config::{SelectionOverrides, load_node_set};
use crate::io::inventory::load_inventory;
use crate::node::NodeEntry;

/// Node names split by verdict, each in inventory order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    pub selected: Vec<String>,
    pub excluded: Vec<String>,
}

/// Keep the nodes `set` does not exclude, preserving input order.
pub fn filter_nodes<'a, N: NodeEntry>(set: &NodeSet, nodes: &'a [N]) -> Vec<&'a N> {
    nodes.iter().filter(|node| !set.should_exclude(*node)).collect()
}

/// Split node names into selected and excluded.
pub fn partition_nodes<N: NodeEntry>(set: &NodeSet, nodes: &[N]) -> FilterReport {
    let mut report = FilterReport::default();
    for node in nodes {
        let name = node.nodename().to_string();
        if set.should_exclude(node) {
            report.excluded.push(name);
        } else {
            report.selected.push(name);
        }
    }
    debug!(
        selected = report.selected.len(),
        excluded = report.excluded.len(),
        "filtered nodes"
    );
    report
}

/// Load configuration and inventory from disk and filter.
pub fn filter_from_files(
    config_path: &Path,
    inventory_path: &Path,
    overrides: &SelectionOverrides,
) -> Result<FilterReport> {
    let set = load_node_set(config_path, overrides)
        .with_context(|| format!("load selection {}", config_path.display()))?;
    debug!(node_set = %set, "loaded node set");
    let nodes = load_inventory(inventory_path)?;
    Ok(partition_nodes(&set, &nodes))
}
