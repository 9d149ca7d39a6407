//! # Contact Lookup Prefilter
//!
//! Cheap membership tests over every stored sighting identifier, used to
//! skip identifiers (and whole diagnosis keys) that cannot have a sighting
//! before the contact store is queried.
//!
//! ## Structures
//!
//! | Type | Exactness | Used by |
//! |------|-----------|---------|
//! | [`ContactLookupTable`] | Bloom filter, no false negatives | resolver, prefilter path |
//! | [`PrefixIdMap`] | exact | accelerated path |
//!
//! ## Invariants
//!
//! - No false negatives: every identifier the table was built from is
//!   reported as a candidate.
//! - The pass-through table reports every identifier as a candidate.

pub mod domain;
pub mod error;

pub use domain::bloom_filter::BloomFilter;
pub use domain::lookup_table::ContactLookupTable;
pub use domain::parameters::{calculate_fpr, calculate_optimal_parameters, BloomFilterParams};
pub use domain::prefix_id_map::PrefixIdMap;
pub use error::FilterError;
