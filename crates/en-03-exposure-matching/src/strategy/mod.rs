//! Matching-path strategies.
//!
//! A selector runs once per request, before the per-key loop, and decides
//! which keys are worth resolving. It never applies policy: a key it leaves
//! out has none of its identifiers in the contact store, so resolving it
//! would find nothing anyway.

pub mod accelerated;
pub mod managed;

use en_01_proximity_ids::ProximityIdFactory;
use en_02_contact_filter::ContactLookupTable;
use shared_types::{DiagnosisKey, KeyIdentity};
use std::collections::HashSet;

use crate::domain::{MatchingConfig, MatchingPathKind};
use crate::error::MatchingError;
use crate::ports::outbound::ContactStore;

pub use accelerated::AcceleratedSelector;
pub use managed::{ManagedPrefilterSelector, ManagedSelector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSet {
    All,
    Only(HashSet<KeyIdentity>),
}

impl CandidateSet {
    pub fn contains(&self, identity: &KeyIdentity) -> bool {
        match self {
            CandidateSet::All => true,
            CandidateSet::Only(set) => set.contains(identity),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CandidateSelection {
    pub candidates: CandidateSet,
    /// Keys the selector itself went through, when it tracks that.
    pub processed_key_count: Option<usize>,
    /// Bloom table the selector built over the contact store, if any.
    pub lookup_table: Option<ContactLookupTable>,
}

impl CandidateSelection {
    pub fn all() -> Self {
        Self {
            candidates: CandidateSet::All,
            processed_key_count: None,
            lookup_table: None,
        }
    }
}

pub trait CandidateSelector: Send + Sync {
    fn name(&self) -> &'static str;

    /// # Errors
    ///
    /// `Storage` / `Filter` failures while loading the identifier set, and
    /// derivation-context failures. Malformed keys are kept as candidates so
    /// the per-key loop reports them.
    fn select(
        &self,
        contacts: &dyn ContactStore,
        keys: &[DiagnosisKey],
        factory: &ProximityIdFactory,
        max_intervals: u32,
    ) -> Result<CandidateSelection, MatchingError>;
}

/// Selector for the configured matching path.
pub fn selector_for(config: &MatchingConfig) -> Box<dyn CandidateSelector> {
    match config.matching_path {
        MatchingPathKind::Managed => Box::new(ManagedSelector),
        MatchingPathKind::ManagedPrefilter => {
            Box::new(ManagedPrefilterSelector::new(config.lookup_false_positive_rate))
        }
        MatchingPathKind::Accelerated => {
            Box::new(AcceleratedSelector::new(config.native_buffer_key_size))
        }
    }
}
