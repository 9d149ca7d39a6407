//! Contact lookup table.

use tracing::debug;

use super::bloom_filter::BloomFilter;
use crate::error::FilterError;

/// Approximate set of every stored sighting identifier.
#[derive(Debug, Clone)]
pub enum ContactLookupTable {
    /// Filtering disabled: every identifier is a candidate.
    PassThrough,
    /// Bloom filter over all stored identifiers.
    Bloom(BloomFilter),
}

impl ContactLookupTable {
    /// Build from all raw identifiers currently in the contact store.
    pub fn create(raw_ids: &[Vec<u8>], false_positive_rate: f64) -> Result<Self, FilterError> {
        let mut filter = BloomFilter::with_fpr(raw_ids.len(), false_positive_rate)?;
        for id in raw_ids {
            filter.insert(id);
        }
        debug!(
            ids = raw_ids.len(),
            size_bits = filter.size_bits(),
            hash_count = filter.hash_count(),
            "Contact lookup table built"
        );
        Ok(Self::Bloom(filter))
    }

    pub fn create_default() -> Self {
        Self::PassThrough
    }

    /// `false` only if no sighting of `id` can exist.
    pub fn contains_candidate(&self, id: &[u8]) -> bool {
        match self {
            Self::PassThrough => true,
            Self::Bloom(filter) => filter.contains(id),
        }
    }

    pub fn is_filtering(&self) -> bool {
        matches!(self, Self::Bloom(_))
    }
}
