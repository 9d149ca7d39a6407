//! # Key Derivation
//!
//! HKDF-SHA256 without salt, used to derive 16-byte sub-keys from diagnosis
//! keys under a fixed info string.

use crate::CryptoError;
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

/// Length of derived sub-keys and of accepted input keys.
pub const SUB_KEY_LENGTH: usize = 16;

/// Derived sub-key (128-bit).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SubKey([u8; SUB_KEY_LENGTH]);

impl SubKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; SUB_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; SUB_KEY_LENGTH] {
        &self.0
    }
}

/// Fill `output` with HKDF-SHA256(`ikm`, no salt, `info`).
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivationFailed` if `output` exceeds the HKDF
/// output limit.
pub fn hkdf_sha256(ikm: &[u8], info: &[u8], output: &mut [u8]) -> Result<(), CryptoError> {
    Hkdf::<Sha256>::new(None, ikm)
        .expand(info, output)
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))
}

/// Derive a 16-byte sub-key from a 16-byte key.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKeyLength` if `key` is not 16 bytes.
pub fn derive_sub_key(key: &[u8], info: &[u8]) -> Result<SubKey, CryptoError> {
    if key.len() != SUB_KEY_LENGTH {
        return Err(CryptoError::InvalidKeyLength {
            expected: SUB_KEY_LENGTH,
            actual: key.len(),
        });
    }
    let mut bytes = [0u8; SUB_KEY_LENGTH];
    hkdf_sha256(key, info, &mut bytes)?;
    Ok(SubKey(bytes))
}
