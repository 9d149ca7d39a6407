//! # Symmetric Encryption
//!
//! AES-128 in ECB mode over batches of independent blocks, and AES-128-CTR
//! for short payloads.
//!
//! ## Security Properties
//!
//! - **ECB**: only applied to distinct, structured blocks (one per interval);
//!   never to arbitrary plaintext
//! - **CTR**: 128-bit big-endian counter, IV supplied by the caller

use crate::kdf::SubKey;
use crate::CryptoError;
use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Reusable AES-128-ECB context.
///
/// Created once per matching run and re-keyed per diagnosis key.
#[derive(Default)]
pub struct BlockCipherContext {
    cipher: Option<Aes128>,
}

impl BlockCipherContext {
    /// Create an unkeyed context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new key.
    pub fn rekey(&mut self, key: &SubKey) -> Result<(), CryptoError> {
        let cipher = Aes128::new_from_slice(key.as_bytes()).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: BLOCK_SIZE,
                actual: key.as_bytes().len(),
            }
        })?;
        self.cipher = Some(cipher);
        Ok(())
    }

    /// Encrypt each 16-byte block of `input` into the same position of `output`.
    ///
    /// # Errors
    ///
    /// - `ContextUnavailable` if the context has never been keyed
    /// - `InvalidInput` if `input` is not block aligned
    /// - `BufferTooSmall` if `output` is shorter than `input`
    pub fn encrypt_blocks(&self, input: &[u8], output: &mut [u8]) -> Result<(), CryptoError> {
        let cipher = self.cipher.as_ref().ok_or(CryptoError::ContextUnavailable)?;
        if input.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::InvalidInput(format!(
                "input length {} is not a multiple of {}",
                input.len(),
                BLOCK_SIZE
            )));
        }
        if output.len() < input.len() {
            return Err(CryptoError::BufferTooSmall {
                needed: input.len(),
                available: output.len(),
            });
        }
        for (block_in, block_out) in input
            .chunks_exact(BLOCK_SIZE)
            .zip(output.chunks_exact_mut(BLOCK_SIZE))
        {
            cipher.encrypt_block_b2b(
                GenericArray::from_slice(block_in),
                GenericArray::from_mut_slice(block_out),
            );
        }
        Ok(())
    }
}

/// Apply the AES-128-CTR keystream for (`key`, `iv`) to `data` in place.
///
/// Encryption and decryption are the same operation.
pub fn aes_ctr_apply(key: &SubKey, iv: &[u8; BLOCK_SIZE], data: &mut [u8]) -> Result<(), CryptoError> {
    let mut cipher = Aes128Ctr::new_from_slices(key.as_bytes(), iv).map_err(|_| {
        CryptoError::InvalidKeyLength {
            expected: BLOCK_SIZE,
            actual: key.as_bytes().len(),
        }
    })?;
    cipher.apply_keystream(data);
    Ok(())
}
