//! Stable exit codes for nodeset CLI commands.

/// Command succeeded; `nodeset filter` selected at least one node.
pub const OK: i32 = 0;
/// Invalid configuration, inventory or match expression.
pub const INVALID: i32 = 1;
/// `nodeset filter` selected no node.
pub const EMPTY: i32 = 2;
