//! Error types for the contact filter.

use thiserror::Error;

/// Errors raised while building a filter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("Invalid false positive rate: {fpr} (must be in (0, 1))")]
    InvalidFpr { fpr: f64 },

    #[error("Invalid filter parameters: {0}")]
    InvalidParameters(String),

    #[error("Too many identifiers: {count} > {max}")]
    TooManyIdentifiers { count: usize, max: usize },
}
