//! Errors raised while configuring or evaluating a node set.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SelectionError {
    /// A second include block was configured for the same node set.
    #[error("only one include is allowed")]
    DuplicateInclude,

    /// A second exclude block was configured for the same node set.
    #[error("only one exclude is allowed")]
    DuplicateExclude,

    /// An explicit `/.../` expression failed to compile.
    #[error("invalid regex for '{field}': {expression}")]
    InvalidPattern {
        field: String,
        expression: String,
        #[source]
        source: regex::Error,
    },

    #[error("thread_count must be > 0")]
    InvalidThreadCount,
}

impl SelectionError {
    pub(crate) fn invalid_pattern(field: &str, expression: &str, source: regex::Error) -> Self {
        Self::InvalidPattern {
            field: field.to_string(),
            expression: expression.to_string(),
            source,
        }
    }
}
