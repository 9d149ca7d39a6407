//! # Exposure Matching (en-03)
//!
//! Matches published diagnosis keys against locally stored sightings.
//!
//! ## Pipeline
//!
//! ```text
//! diagnosis keys ──→ [candidate selection] ──→ per key, sequentially:
//!                      Managed | ManagedPrefilter | Accelerated
//!
//!   dedupe / transition ─→ policy skips ─→ derive 144 ids ─→ resolver
//!        (result store)     (attempted-key store)              │
//!                                                              ↓
//!                      result store ←── evaluator ←── sightings with metadata
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforced by |
//! |-----------|-------------|
//! | Rolling period never changes for a key identity | `AttemptedKeyStore` check before derivation |
//! | A stored result only changes through an allowed transition | `TransitionTable` |
//! | Sightings outside the drift window are never matched | `SightingWindowResolver` |
//! | All matching paths produce the same results | candidate selection is a pure pre-pass |
//! | Keys are processed strictly in order, one at a time | `ExposureMatchingTracer` |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - configuration, windows, transitions, cancellation, reports
//! - `ports/` - inbound API and outbound store / scoring / geo / time traits
//! - `service/` - resolver, evaluator and tracer
//! - `strategy/` - matching-path candidate selectors
//! - `adapters/` - in-memory stores, bucketized scorer, geo filter, clock

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;
pub mod strategy;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::{
    BucketizedRiskScorer, InMemoryStores, SystemTimeSource, VisitedCellFilter,
};
pub use domain::{
    CancellationToken, MatchingConfig, MatchingConfigBuilder, MatchingPathKind, MatchingRequest,
    RunOutcome, SkipReason, SkipTally, TraceReport, TracerState, TracingParams, TransitionDecision,
    TransitionTable, ValidWindow,
};
pub use error::{ConfigError, MatchingError, ProtocolViolation, StorageError};
pub use ports::inbound::ExposureMatchingApi;
pub use ports::outbound::{
    AttemptedKeyStore, ContactStore, ExposureResultStore, GeoCellFilter, RiskAssessment,
    RiskScorer, StoreProvider, TimeSource,
};
pub use service::{ExposureEvaluator, ExposureMatchingTracer, ResolverSettings, SightingWindowResolver};
pub use strategy::{
    selector_for, AcceleratedSelector, CandidateSelection, CandidateSelector, CandidateSet,
    ManagedPrefilterSelector, ManagedSelector,
};
