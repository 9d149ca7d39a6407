//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// HKDF expansion failed
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// A block cipher context was used before it was keyed
    #[error("Cipher context unavailable")]
    ContextUnavailable,

    /// Output buffer cannot hold the result
    #[error("Buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes required
        needed: usize,
        /// Bytes available
        available: usize,
    },

    /// Encrypted metadata is not the expected length
    #[error("Invalid metadata length: expected {expected}, got {actual}")]
    InvalidMetadataLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Invalid input for cryptographic operation
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CryptoError {
    /// Whether the error comes from shared cipher state rather than from one
    /// key's material. Context failures poison every later key in a run.
    pub fn is_context_failure(&self) -> bool {
        matches!(
            self,
            CryptoError::ContextUnavailable | CryptoError::BufferTooSmall { .. }
        )
    }
}
