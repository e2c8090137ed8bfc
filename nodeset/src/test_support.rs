//! Test-only helpers for constructing node descriptors.

use crate::node::Node;

/// Create a node with only a name; every other field is empty.
pub fn node(name: &str) -> Node {
    Node::new(name)
}

/// Create a node with hostname, tags and OS family set.
pub fn node_with(name: &str, tags: &[&str], os_family: &str) -> Node {
    Node {
        hostname: format!("{}.example.com", name),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        os_family: os_family.to_string(),
        ..Node::new(name)
    }
}

/// `web01`, tagged `prod` and `web`, running unix.
pub fn web_node() -> Node {
    node_with("web01", &["prod", "web"], "unix")
}

/// Small deterministic inventory: two web nodes, a database and a windows box.
pub fn fleet() -> Vec<Node> {
    vec![
        web_node(),
        node_with("web02", &["staging", "web"], "unix"),
        node_with("db01", &["db", "prod"], "unix"),
        node_with("win01", &["app"], "windows"),
    ]
}
