//! Selection configuration stored in a TOML file (default `nodeset.toml`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::policy::NodeSet;
use crate::core::selector::Selector;

/// Selection configuration (TOML).
///
/// Intended to be edited by humans. Missing fields default to a blank
/// configuration, which selects no node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SelectionConfig {
    /// Select only the node with this name, ignoring include/exclude.
    pub node: Option<String>,

    /// Parallelism hint for whoever runs work on the selected nodes.
    pub thread_count: usize,

    /// Keep going on other nodes after a node fails.
    pub keepgoing: bool,

    /// Where to record the names of failed nodes.
    pub failed_nodes_file: Option<PathBuf>,

    pub include: Option<FilterConfig>,
    pub exclude: Option<FilterConfig>,
}

/// One `[include]` or `[exclude]` table.
///
/// Every key other than `dominant` is a filter key (`hostname`, `tags`, ...)
/// or a custom attribute name, mapped to a match expression.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilterConfig {
    pub dominant: bool,
    #[serde(flatten)]
    pub keys: BTreeMap<String, String>,
}

impl FilterConfig {
    fn to_selector(&self) -> Selector {
        Selector::populate(&self.keys).with_dominant(self.dominant)
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            node: None,
            thread_count: 1,
            keepgoing: false,
            failed_nodes_file: None,
            include: None,
            exclude: None,
        }
    }
}

impl SelectionConfig {
    /// Checks file-only fields. Execution hints are checked by
    /// [`NodeSet::validate`] once the set is built.
    pub fn validate(&self) -> Result<()> {
        if self.node.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(anyhow!("node must be a non-empty node name"));
        }
        Ok(())
    }
}

/// Filters supplied on the command line on top of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionOverrides {
    pub node: Option<String>,
    pub include: Vec<(String, String)>,
    pub exclude: Vec<(String, String)>,
    /// Mark the include selector (from file or command line) dominant.
    pub dominant: bool,
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SelectionConfig::default()`.
pub fn load_config(path: &Path) -> Result<SelectionConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no selection config, using defaults");
        return Ok(SelectionConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SelectionConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Build the node set described by `cfg` plus command-line overrides.
///
/// Command-line include/exclude filters are a second include/exclude when the
/// file already configures one, which is rejected.
pub fn build_node_set(cfg: &SelectionConfig, overrides: &SelectionOverrides) -> Result<NodeSet> {
    let mut set = NodeSet::new();
    set.thread_count = cfg.thread_count;
    set.keepgoing = cfg.keepgoing;
    set.failed_nodes_file = cfg.failed_nodes_file.clone();
    set.set_single_node(overrides.node.clone().or_else(|| cfg.node.clone()));

    if let Some(include) = &cfg.include {
        let selector = include.to_selector();
        let dominant = selector.is_dominant() || overrides.dominant;
        set.set_include(selector.with_dominant(dominant))
            .context("configure include")?;
    }
    if !overrides.include.is_empty() {
        let selector = Selector::populate(overrides.include.iter().cloned());
        set.set_include(selector.with_dominant(overrides.dominant))
            .context("configure include from command line")?;
    }
    if let Some(exclude) = &cfg.exclude {
        set.set_exclude(exclude.to_selector())
            .context("configure exclude")?;
    }
    if !overrides.exclude.is_empty() {
        set.set_exclude(Selector::populate(overrides.exclude.iter().cloned()))
            .context("configure exclude from command line")?;
    }

    set.validate().context("validate node set")?;
    Ok(set)
}

/// Load the configuration at `path` and build its node set.
pub fn load_node_set(path: &Path, overrides: &SelectionOverrides) -> Result<NodeSet> {
    let cfg = load_config(path)?;
    build_node_set(&cfg, overrides)
}
