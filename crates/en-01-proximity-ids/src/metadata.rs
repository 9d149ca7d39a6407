//! Associated encrypted metadata.
//!
//! The metadata key is bound to the diagnosis key; the IV is the identifier
//! the metadata was broadcast with. Decrypting with any other identifier
//! yields garbage, so callers must pass the identifier that matched.

use shared_crypto::{aes_ctr_apply, derive_sub_key, CryptoError, SubKey};
use shared_types::{
    AssociatedEncryptedMetadata, BluetoothMetadata, RollingProximityId, ASSOCIATED_METADATA_LENGTH,
};

/// Encrypts and decrypts metadata for one diagnosis key.
pub struct AssociatedEncryptedMetadataGenerator {
    aemk: SubKey,
}

impl AssociatedEncryptedMetadataGenerator {
    pub fn new(key: &[u8], aemk_info: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            aemk: derive_sub_key(key, aemk_info)?,
        })
    }

    pub fn encrypt(
        &self,
        proximity_id: &RollingProximityId,
        metadata: &BluetoothMetadata,
    ) -> Result<AssociatedEncryptedMetadata, CryptoError> {
        let mut bytes = metadata.to_bytes();
        aes_ctr_apply(&self.aemk, proximity_id.as_bytes(), &mut bytes)?;
        Ok(AssociatedEncryptedMetadata::new(bytes))
    }

    /// Decrypt metadata received alongside `proximity_id`.
    ///
    /// # Errors
    ///
    /// `InvalidMetadataLength` if `encrypted` is not exactly 4 bytes.
    pub fn decrypt(
        &self,
        proximity_id: &RollingProximityId,
        encrypted: &[u8],
    ) -> Result<BluetoothMetadata, CryptoError> {
        let mut bytes: [u8; ASSOCIATED_METADATA_LENGTH] =
            encrypted
                .try_into()
                .map_err(|_| CryptoError::InvalidMetadataLength {
                    expected: ASSOCIATED_METADATA_LENGTH,
                    actual: encrypted.len(),
                })?;
        aes_ctr_apply(&self.aemk, proximity_id.as_bytes(), &mut bytes)?;
        Ok(BluetoothMetadata::from_bytes(&bytes))
    }
}
