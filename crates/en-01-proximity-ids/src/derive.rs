//! Stateless derivation entry point.

use shared_crypto::CryptoError;
use shared_types::{BluetoothMetadata, GeneratedProximityId};

use crate::constants::AEMK_HKDF_INFO;
use crate::generator::{DerivationParams, ProximityIdFactory};

/// Derive identifiers for the inclusive interval range `start_interval..=end_interval`.
///
/// Builds a throwaway generator; hot paths should hold a
/// [`RollingProximityIdGenerator`](crate::RollingProximityIdGenerator) instead.
///
/// # Errors
///
/// - `InvalidInput` if `end_interval < start_interval` or the parameters are
///   not an AES-128 derivation
/// - `InvalidKeyLength` if `key_bytes` is not 16 bytes
pub fn derive(
    key_bytes: &[u8],
    start_interval: u32,
    end_interval: u32,
    sub_key_size: usize,
    hkdf_info: &str,
    aes_pad: &str,
    metadata: Option<&BluetoothMetadata>,
) -> Result<Vec<GeneratedProximityId>, CryptoError> {
    if end_interval < start_interval {
        return Err(CryptoError::InvalidInput(format!(
            "end interval {} precedes start interval {}",
            end_interval, start_interval
        )));
    }
    let factory = ProximityIdFactory::new(DerivationParams {
        rpik_info: hkdf_info.to_string(),
        aemk_info: AEMK_HKDF_INFO.to_string(),
        padded_prefix: aes_pad.to_string(),
        sub_key_size,
    })?;
    let count = end_interval - start_interval + 1;
    factory
        .generator()
        .generate(key_bytes, start_interval, count, metadata)
}
