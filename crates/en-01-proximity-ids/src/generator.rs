//! # Rolling Proximity Identifier Generator
//!
//! One generator per matching run. Each call re-keys the shared AES context
//! with the key's RPIK and encrypts all padded blocks of the requested range
//! in one batch.

use shared_crypto::{derive_sub_key, BlockCipherContext, CryptoError};
use shared_types::{GeneratedProximityId, RollingProximityId};
use tracing::debug;

use crate::constants::*;
use crate::metadata::AssociatedEncryptedMetadataGenerator;
use shared_types::BluetoothMetadata;

/// Derivation constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationParams {
    /// HKDF info used for the identifier key.
    pub rpik_info: String,
    /// HKDF info used for the metadata key.
    pub aemk_info: String,
    /// Prefix written at the start of each padded block.
    pub padded_prefix: String,
    /// Sub-key size in bytes.
    pub sub_key_size: usize,
}

impl Default for DerivationParams {
    fn default() -> Self {
        Self {
            rpik_info: RPIK_HKDF_INFO.to_string(),
            aemk_info: AEMK_HKDF_INFO.to_string(),
            padded_prefix: RPI_PADDED_PREFIX.to_string(),
            sub_key_size: SUB_KEY_SIZE,
        }
    }
}

impl DerivationParams {
    /// Check that the parameters describe an AES-128 derivation.
    pub fn validate(&self) -> Result<(), CryptoError> {
        if self.sub_key_size != SUB_KEY_SIZE {
            return Err(CryptoError::InvalidInput(format!(
                "sub key size must be {}, got {}",
                SUB_KEY_SIZE, self.sub_key_size
            )));
        }
        if self.padded_prefix.len() > INTERVAL_OFFSET {
            return Err(CryptoError::InvalidInput(format!(
                "padded prefix longer than {} bytes",
                INTERVAL_OFFSET
            )));
        }
        Ok(())
    }
}

/// Creates generators that share derivation parameters.
#[derive(Debug, Clone, Default)]
pub struct ProximityIdFactory {
    params: DerivationParams,
}

impl ProximityIdFactory {
    pub fn new(params: DerivationParams) -> Result<Self, CryptoError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &DerivationParams {
        &self.params
    }

    /// A generator with buffers sized for one full key.
    pub fn generator(&self) -> RollingProximityIdGenerator {
        RollingProximityIdGenerator::with_capacity(self.params.clone(), MAX_INTERVALS_PER_KEY as usize)
    }

    /// A generator that takes over a caller-provided output buffer.
    pub fn generator_with_buffer(&self, buffer: Vec<u8>) -> RollingProximityIdGenerator {
        RollingProximityIdGenerator {
            params: self.params.clone(),
            context: BlockCipherContext::new(),
            padded: Vec::with_capacity(buffer.capacity()),
            output: buffer,
        }
    }
}

/// Stateful identifier generator with reusable buffers.
pub struct RollingProximityIdGenerator {
    params: DerivationParams,
    context: BlockCipherContext,
    padded: Vec<u8>,
    output: Vec<u8>,
}

impl RollingProximityIdGenerator {
    pub fn with_capacity(params: DerivationParams, intervals: usize) -> Self {
        Self {
            params,
            context: BlockCipherContext::new(),
            padded: Vec::with_capacity(intervals * PADDED_BLOCK_LENGTH),
            output: Vec::with_capacity(intervals * PADDED_BLOCK_LENGTH),
        }
    }

    pub fn params(&self) -> &DerivationParams {
        &self.params
    }

    /// Derive `count` identifiers starting at `start_interval` as one flat
    /// buffer of `count * 16` bytes.
    ///
    /// The slice stays valid until the next call.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength` for malformed key material
    /// - context failures (`ContextUnavailable`, `BufferTooSmall`) from the
    ///   shared AES context
    pub fn generate_raw(&mut self, key: &[u8], start_interval: u32, count: u32) -> Result<&[u8], CryptoError> {
        let rpik = derive_sub_key(key, self.params.rpik_info.as_bytes()).inspect_err(|e| {
            debug!(error = %e, key_len = key.len(), start_interval, "Identifier key derivation failed");
        })?;
        self.context.rekey(&rpik).inspect_err(|e| {
            debug!(error = %e, "Re-keying the identifier cipher failed");
        })?;

        let len = count as usize * PADDED_BLOCK_LENGTH;
        self.padded.clear();
        self.padded.resize(len, 0);
        let prefix = self.params.padded_prefix.as_bytes();
        for (i, block) in self.padded.chunks_exact_mut(PADDED_BLOCK_LENGTH).enumerate() {
            block[..prefix.len()].copy_from_slice(prefix);
            let interval = start_interval.wrapping_add(i as u32);
            block[INTERVAL_OFFSET..].copy_from_slice(&interval.to_le_bytes());
        }

        self.output.clear();
        self.output.resize(len, 0);
        self.context.encrypt_blocks(&self.padded, &mut self.output)?;
        Ok(&self.output[..len])
    }

    /// Derive identifiers into `out`, replacing its contents.
    ///
    /// When `metadata` is given, each identifier also carries its encrypted
    /// metadata; otherwise `encrypted_metadata` is `None`.
    pub fn generate_into(
        &mut self,
        key: &[u8],
        start_interval: u32,
        count: u32,
        metadata: Option<&BluetoothMetadata>,
        out: &mut Vec<GeneratedProximityId>,
    ) -> Result<(), CryptoError> {
        let aem = match metadata {
            Some(metadata) => Some((
                AssociatedEncryptedMetadataGenerator::new(key, self.params.aemk_info.as_bytes())?,
                *metadata,
            )),
            None => None,
        };
        let raw = self.generate_raw(key, start_interval, count)?;

        out.clear();
        out.reserve(count as usize);
        for (i, chunk) in raw.chunks_exact(PADDED_BLOCK_LENGTH).enumerate() {
            let mut bytes = [0u8; PADDED_BLOCK_LENGTH];
            bytes.copy_from_slice(chunk);
            let proximity_id = RollingProximityId::new(bytes);
            let encrypted_metadata = match &aem {
                Some((generator, metadata)) => Some(generator.encrypt(&proximity_id, metadata)?),
                None => None,
            };
            out.push(GeneratedProximityId {
                proximity_id,
                encrypted_metadata,
                interval_number: start_interval.wrapping_add(i as u32),
            });
        }
        Ok(())
    }

    /// Allocating variant of [`Self::generate_into`].
    pub fn generate(
        &mut self,
        key: &[u8],
        start_interval: u32,
        count: u32,
        metadata: Option<&BluetoothMetadata>,
    ) -> Result<Vec<GeneratedProximityId>, CryptoError> {
        let mut out = Vec::with_capacity(count as usize);
        self.generate_into(key, start_interval, count, metadata, &mut out)?;
        Ok(out)
    }
}
