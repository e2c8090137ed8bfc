//! Node selection with include/exclude filters.
//!
//! Given an inventory of nodes, each described by a hostname, name, tags, OS
//! fields and custom attributes, decide which nodes an operation should run
//! against. The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic matching (expressions, selectors, and
//!   include/exclude resolution). No I/O.
//! - **[`io`]**: Loading selection configuration (TOML) and inventories (JSON).
//!
//! [`filter`] ties the two together for the `nodeset` CLI.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod filter;
pub mod io;
pub mod logging;
pub mod node;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::core::policy::NodeSet;
pub use crate::core::selector::Selector;
pub use crate::error::SelectionError;
pub use crate::node::{Node, NodeEntry};
