//! Error types for tree and color operations.

use thiserror::Error;

/// Errors surfaced by the color coder and the tree.
///
/// Every mutating operation validates its arguments before it touches any
/// counter, so a returned error means the tree is exactly as it was.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// An index outside `[0, size)` of the color space it was measured in.
    #[error("index {index} out of range for size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    /// A label or mask the coder never registered.
    #[error("unknown color: {color}")]
    UnknownColor { color: String },

    /// A programming error: stale handle, empty run, malformed tree.
    #[error("invariant violated: {reason}")]
    InvariantViolation { reason: String },

    /// A sorted operation on a tree built without an ordering.
    #[error("tree has no ordering for sorted operations")]
    Unordered,
}

impl TreeError {
    pub(crate) fn out_of_range(index: usize, size: usize) -> TreeError {
        return TreeError::IndexOutOfRange { index, size };
    }

    pub(crate) fn unknown(color: impl Into<String>) -> TreeError {
        return TreeError::UnknownColor { color: color.into() };
    }

    pub(crate) fn violation(reason: impl Into<String>) -> TreeError {
        return TreeError::InvariantViolation { reason: reason.into() };
    }

    /// Check if this error came from a bad index.
    pub fn is_out_of_range(&self) -> bool {
        return matches!(self, TreeError::IndexOutOfRange { .. });
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TreeError>;
