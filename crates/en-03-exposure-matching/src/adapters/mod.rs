//! Adapters: concrete collaborators for the outbound ports.

pub mod geo;
pub mod memory;
pub mod scoring;
pub mod time;

pub use geo::VisitedCellFilter;
pub use memory::{InMemoryAttemptedKeyStore, InMemoryContactStore, InMemoryResultStore, InMemoryStores};
pub use scoring::BucketizedRiskScorer;
pub use time::SystemTimeSource;
