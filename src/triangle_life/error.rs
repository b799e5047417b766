//! Error types for field construction.

use thiserror::Error;

/// Errors that can occur while building a field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// One of the dimensions is zero.
    #[error("invalid field dimensions {width}x{height}: both sides must be positive")]
    InvalidDimensions {
        /// Requested number of columns.
        width: usize,
        /// Requested number of rows.
        height: usize,
    },

    /// The cell count does not fit the linear index space.
    #[error("field dimensions {width}x{height} are too large to index")]
    TooLarge {
        /// Requested number of columns.
        width: usize,
        /// Requested number of rows.
        height: usize,
    },
}
