//! Deterministic, pure selection logic.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! node descriptors and selector configuration and return deterministic
//! verdicts suitable for tests.

pub mod expr;
pub mod policy;
pub mod selector;
