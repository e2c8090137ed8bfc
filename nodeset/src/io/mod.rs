//! I/O helpers: selection configuration and node inventories.

pub mod config;
pub mod inventory;
