//! Unreachable-invariant errors.

use thiserror::Error;

/// Raised when a structural invariant that should be unreachable is violated,
/// e.g. merging a task with itself. Never part of the normal error flow.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("internal error: {0}")]
pub struct InternalError(pub String);

impl InternalError {
    /// Creates an internal error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        InternalError(message.into())
    }
}
