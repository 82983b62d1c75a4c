//! Error types for the binding engine.

use thiserror::Error;

/// Errors raised by binders, strategies and notifying lists.
///
/// Every variant is recoverable: the operation that produced it left the
/// binding table and list contents as they were before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// A target item is already bound, or index correspondence disagrees
    /// with the binding table.
    #[error("duplicate binding: {0}")]
    DuplicateBinding(String),

    /// An item lacks a capability the requested binding needs.
    #[error("unsupported item: {0}")]
    UnsupportedItem(String),

    /// A reentrant call was detected and rejected.
    #[error("reentrancy rejected: {0}")]
    Reentrancy(String),

    /// A list index was outside the valid range.
    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for binding operations.
pub type Result<T, E = BindError> = std::result::Result<T, E>;

/// Fail with [`BindError::IndexOutOfRange`] unless `index < len`.
pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(BindError::IndexOutOfRange { index, len })
    }
}
