//! Protocol constants.

/// HKDF info for the rolling proximity identifier key.
pub const RPIK_HKDF_INFO: &str = "EN-RPIK";

/// HKDF info for the associated encrypted metadata key.
pub const AEMK_HKDF_INFO: &str = "EN-AEMK";

/// Prefix of every padded identifier block.
pub const RPI_PADDED_PREFIX: &str = "EN-RPI";

/// Sub-key size in bytes (AES-128).
pub const SUB_KEY_SIZE: usize = 16;

/// Size of one padded block / identifier.
pub const PADDED_BLOCK_LENGTH: usize = 16;

/// Offset of the little-endian interval number inside a padded block.
pub const INTERVAL_OFFSET: usize = 12;

/// Maximum number of intervals a single key covers.
pub const MAX_INTERVALS_PER_KEY: u32 = 144;
