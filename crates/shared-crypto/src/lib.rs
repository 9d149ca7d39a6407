//! # Shared Crypto - Identifier Derivation Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `kdf` | HKDF-SHA256 | Sub-key derivation from diagnosis keys |
//! | `symmetric` | AES-128-ECB, AES-128-CTR | Identifier and metadata encryption |
//!
//! ## Security Properties
//!
//! - **Sub-keys**: zeroized on drop
//! - **Block contexts**: reusable across keys; a failed context is reported as
//!   a context failure so callers can abort instead of skipping a key

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod kdf;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use kdf::{derive_sub_key, hkdf_sha256, SubKey, SUB_KEY_LENGTH};
pub use symmetric::{aes_ctr_apply, BlockCipherContext, BLOCK_SIZE};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
