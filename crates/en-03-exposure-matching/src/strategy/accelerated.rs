//! Batched exact-match path.
//!
//! Loads every stored identifier into a [`PrefixIdMap`] once, then derives
//! identifiers batch by batch with a generator owned by the batch and keeps
//! keys with at least one exact hit.

use en_01_proximity_ids::ProximityIdFactory;
use en_02_contact_filter::PrefixIdMap;
use shared_types::{DiagnosisKey, ROLLING_PROXIMITY_ID_LENGTH};
use std::collections::HashSet;
use tracing::{debug, info};

use super::{CandidateSelection, CandidateSelector, CandidateSet};
use crate::error::MatchingError;
use crate::ports::outbound::ContactStore;

#[derive(Debug, Clone, Copy)]
pub struct AcceleratedSelector {
    batch_size: usize,
}

impl AcceleratedSelector {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }
}

impl CandidateSelector for AcceleratedSelector {
    fn name(&self) -> &'static str {
        "accelerated"
    }

    fn select(
        &self,
        contacts: &dyn ContactStore,
        keys: &[DiagnosisKey],
        factory: &ProximityIdFactory,
        max_intervals: u32,
    ) -> Result<CandidateSelection, MatchingError> {
        let map = PrefixIdMap::build(contacts.get_all_raw_ids()?)?;
        let mut candidates = HashSet::new();
        let mut processed = 0usize;

        for (batch_index, batch) in keys.chunks(self.batch_size).enumerate() {
            let buffer = Vec::with_capacity(max_intervals as usize * ROLLING_PROXIMITY_ID_LENGTH);
            let mut generator = factory.generator_with_buffer(buffer);
            let mut hits = 0usize;

            for key in batch {
                processed += 1;
                match generator.generate_raw(key.key_data(), key.rolling_start_interval_number(), max_intervals) {
                    Ok(ids) => {
                        if map.contains_any(ids) {
                            candidates.insert(key.identity());
                            hits += 1;
                        }
                    }
                    Err(e) if e.is_context_failure() => return Err(e.into()),
                    Err(e) => {
                        debug!(error = %e, "Keeping underivable key as candidate");
                        candidates.insert(key.identity());
                    }
                }
            }
            debug!(batch = batch_index, keys = batch.len(), hits, "Accelerated batch done");
        }

        info!(
            keys = keys.len(),
            stored_ids = map.len(),
            candidates = candidates.len(),
            "Accelerated candidate selection done"
        );
        Ok(CandidateSelection {
            candidates: CandidateSet::Only(candidates),
            processed_key_count: Some(processed),
            lookup_table: None,
        })
    }
}
