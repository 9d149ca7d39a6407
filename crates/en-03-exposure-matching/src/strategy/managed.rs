//! In-process matching paths.

use en_01_proximity_ids::ProximityIdFactory;
use en_02_contact_filter::ContactLookupTable;
use shared_types::{DiagnosisKey, ROLLING_PROXIMITY_ID_LENGTH};
use std::collections::HashSet;
use tracing::{debug, info};

use super::{CandidateSelection, CandidateSelector, CandidateSet};
use crate::error::MatchingError;
use crate::ports::outbound::ContactStore;

/// Every key is a candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManagedSelector;

impl CandidateSelector for ManagedSelector {
    fn name(&self) -> &'static str {
        "managed"
    }

    fn select(
        &self,
        _contacts: &dyn ContactStore,
        _keys: &[DiagnosisKey],
        _factory: &ProximityIdFactory,
        _max_intervals: u32,
    ) -> Result<CandidateSelection, MatchingError> {
        Ok(CandidateSelection::all())
    }
}

/// Drops keys none of whose identifiers pass the Bloom lookup table.
#[derive(Debug, Clone, Copy)]
pub struct ManagedPrefilterSelector {
    false_positive_rate: f64,
}

impl ManagedPrefilterSelector {
    pub fn new(false_positive_rate: f64) -> Self {
        Self { false_positive_rate }
    }
}

impl CandidateSelector for ManagedPrefilterSelector {
    fn name(&self) -> &'static str {
        "managed_prefilter"
    }

    fn select(
        &self,
        contacts: &dyn ContactStore,
        keys: &[DiagnosisKey],
        factory: &ProximityIdFactory,
        max_intervals: u32,
    ) -> Result<CandidateSelection, MatchingError> {
        let table = ContactLookupTable::create(&contacts.get_all_raw_ids()?, self.false_positive_rate)?;
        let mut generator = factory.generator();
        let mut candidates = HashSet::new();
        let mut processed = 0usize;

        for key in keys {
            processed += 1;
            match generator.generate_raw(key.key_data(), key.rolling_start_interval_number(), max_intervals) {
                Ok(ids) => {
                    if ids
                        .chunks_exact(ROLLING_PROXIMITY_ID_LENGTH)
                        .any(|id| table.contains_candidate(id))
                    {
                        candidates.insert(key.identity());
                    }
                }
                Err(e) if e.is_context_failure() => return Err(e.into()),
                Err(e) => {
                    debug!(error = %e, "Keeping underivable key as candidate");
                    candidates.insert(key.identity());
                }
            }
        }

        info!(
            keys = processed,
            candidates = candidates.len(),
            "Prefilter candidate selection done"
        );
        Ok(CandidateSelection {
            candidates: CandidateSet::Only(candidates),
            processed_key_count: Some(processed),
            lookup_table: Some(table),
        })
    }
}
