use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Read-only view of a node that the selection engine evaluates.
///
/// Empty strings mean "absent" for the hostname and OS fields.
pub trait NodeEntry {
    fn nodename(&self) -> &str;
    fn hostname(&self) -> &str;
    fn tags(&self) -> &[String];
    fn os_family(&self) -> &str;
    fn os_arch(&self) -> &str;
    fn os_name(&self) -> &str;
    fn os_version(&self) -> &str;
    fn attributes(&self) -> &BTreeMap<String, String>;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub nodename: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub os_family: String,
    #[serde(default)]
    pub os_arch: String,
    #[serde(default)]
    pub os_name: String,
    #[serde(default)]
    pub os_version: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Node {
    pub fn new(nodename: impl Into<String>) -> Self {
        Self {
            nodename: nodename.into(),
            ..Self::default()
        }
    }
}

impl NodeEntry for Node {
    fn nodename(&self) -> &str {
        &self.nodename
    }

    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn os_family(&self) -> &str {
        &self.os_family
    }

    fn os_arch(&self) -> &str {
        &self.os_arch
    }

    fn os_name(&self) -> &str {
        &self.os_name
    }

    fn os_version(&self) -> &str {
        &self.os_version
    }

    fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}
