//! Exact identifier set indexed by 16-bit prefix.
//!
//! Identifiers are stored contiguously, sorted by their first two bytes read
//! as a little-endian `u16`. `prefix_end[p]` is the index one past the last
//! identifier with prefix `<= p`, so a lookup scans only the identifiers that
//! share its prefix. Identifiers are uniformly random, so with fewer than a
//! few million sightings a bucket rarely holds more than one entry.

use shared_types::ROLLING_PROXIMITY_ID_LENGTH;
use tracing::{debug, warn};

use crate::error::FilterError;

const PREFIX_INDEX_SIZE: usize = 1 << 16;

pub struct PrefixIdMap {
    ids: Vec<[u8; ROLLING_PROXIMITY_ID_LENGTH]>,
    prefix_end: Box<[u32]>,
}

#[inline]
fn prefix(id: &[u8]) -> usize {
    u16::from_le_bytes([id[0], id[1]]) as usize
}

impl PrefixIdMap {
    /// Build from raw stored identifiers.
    ///
    /// Entries that are not identifier-sized can never equal a derived
    /// identifier and are dropped.
    pub fn build<I, R>(raw_ids: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[u8]>,
    {
        let mut ids = Vec::new();
        let mut dropped = 0usize;
        for raw in raw_ids {
            match <[u8; ROLLING_PROXIMITY_ID_LENGTH]>::try_from(raw.as_ref()) {
                Ok(id) => ids.push(id),
                Err(_) => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(dropped, "Ignoring stored identifiers of unexpected length");
        }
        if ids.len() > u32::MAX as usize {
            return Err(FilterError::TooManyIdentifiers {
                count: ids.len(),
                max: u32::MAX as usize,
            });
        }

        ids.sort_unstable_by_key(|id| prefix(id));

        let mut prefix_end = vec![0u32; PREFIX_INDEX_SIZE].into_boxed_slice();
        let mut next_prefix = 0usize;
        for (index, id) in ids.iter().enumerate() {
            let p = prefix(id);
            while next_prefix < p {
                prefix_end[next_prefix] = index as u32;
                next_prefix += 1;
            }
        }
        for end in prefix_end.iter_mut().skip(next_prefix) {
            *end = ids.len() as u32;
        }

        debug!(ids = ids.len(), "PrefixIdMap loaded");
        Ok(Self { ids, prefix_end })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Exact membership test. Slices of the wrong length are never members.
    pub fn contains(&self, id: &[u8]) -> bool {
        if id.len() != ROLLING_PROXIMITY_ID_LENGTH {
            return false;
        }
        let p = prefix(id);
        let start = if p > 0 { self.prefix_end[p - 1] as usize } else { 0 };
        let end = self.prefix_end[p] as usize;
        self.ids[start..end].iter().any(|stored| stored.as_slice() == id)
    }

    /// Whether any identifier in a flat buffer of concatenated identifiers is stored.
    pub fn contains_any(&self, flat_ids: &[u8]) -> bool {
        flat_ids
            .chunks_exact(ROLLING_PROXIMITY_ID_LENGTH)
            .any(|id| self.contains(id))
    }
}
