//! # Proximity Identifier Derivation
//!
//! Turns a diagnosis key and an interval range into the ordered sequence of
//! rolling proximity identifiers it broadcast, plus per-interval encrypted
//! metadata.
//!
//! ## Derivation
//!
//! ```text
//! RPIK = HKDF-SHA256(key, salt = none, "EN-RPIK", 16)
//! PaddedData(i) = "EN-RPI" || 0x00 * 6 || i as u32 LE
//! RPI(i) = AES-128-ECB(RPIK, PaddedData(i))
//!
//! AEMK = HKDF-SHA256(key, salt = none, "EN-AEMK", 16)
//! AEM(i) = AES-128-CTR(AEMK, IV = RPI(i), metadata)
//! ```
//!
//! ## Buffer reuse
//!
//! [`RollingProximityIdGenerator`] owns its padded-input and ciphertext
//! buffers and re-keys one AES context per key. A matching run creates one
//! generator from a [`ProximityIdFactory`] and keeps it for the whole run; a
//! generator is never shared between runs.

pub mod constants;
pub mod derive;
pub mod generator;
pub mod metadata;

pub use constants::*;
pub use derive::derive;
pub use generator::{DerivationParams, ProximityIdFactory, RollingProximityIdGenerator};
pub use metadata::AssociatedEncryptedMetadataGenerator;
pub use shared_crypto::CryptoError;
