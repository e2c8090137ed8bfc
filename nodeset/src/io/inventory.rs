//! Node inventory stored as a JSON array of node objects.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::node::Node;

/// Load and validate an inventory from disk.
pub fn load_inventory(path: &Path) -> Result<Vec<Node>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read inventory {}", path.display()))?;
    let nodes = parse_inventory(&contents)
        .with_context(|| format!("load inventory {}", path.display()))?;
    debug!(path = %path.display(), nodes = nodes.len(), "loaded inventory");
    Ok(nodes)
}

/// Parse inventory JSON and check node names.
pub fn parse_inventory(contents: &str) -> Result<Vec<Node>> {
    let nodes: Vec<Node> = serde_json::from_str(contents).context("parse inventory json")?;
    let errors = validate_inventory(&nodes);
    if !errors.is_empty() {
        return Err(anyhow!("invalid inventory: {}", errors.join("; ")));
    }
    Ok(nodes)
}

/// Node names must be non-empty and unique.
fn validate_inventory(nodes: &[Node]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    for (index, node) in nodes.iter().enumerate() {
        if node.nodename.trim().is_empty() {
            errors.push(format!("node {} has an empty nodename", index));
        } else if !seen.insert(node.nodename.as_str()) {
            errors.push(format!("duplicate nodename '{}'", node.nodename));
        }
    }
    errors
}
