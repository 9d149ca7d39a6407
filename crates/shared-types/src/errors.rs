//! Error types for data model construction.

use thiserror::Error;

/// Errors raised when building typed values from raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// A fixed-size value was built from a slice of the wrong length.
    #[error("invalid {what} length: expected {expected}, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An interval-clock parameter was zero or out of range.
    #[error("invalid interval clock: {0}")]
    InvalidClock(String),
}
