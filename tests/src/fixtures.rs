//! Shared scenario fixtures.

use en_03_exposure_matching::test_utils::FixedTimeSource;
use en_03_exposure_matching::{
    ExposureMatchingTracer, InMemoryStores, MatchingConfig, MatchingRequest,
};
use shared_types::DiagnosisKey;
use std::sync::Arc;

pub const PACKAGE: &str = "org.example.exposure";
pub const SIGNATURE: [u8; 32] = [0x5A; 32];
pub const TOKEN: &str = "SCENARIO";

/// 2021-05-03T00:00:00Z
pub const NOW_MILLIS: u64 = 1_620_000_000_000;

pub fn request(keys: Vec<DiagnosisKey>) -> MatchingRequest {
    MatchingRequest::new(PACKAGE, SIGNATURE.to_vec(), TOKEN, keys)
}

pub fn tracer(stores: &InMemoryStores, config: MatchingConfig) -> ExposureMatchingTracer<InMemoryStores> {
    ExposureMatchingTracer::new(stores.clone(), config)
        .expect("valid config")
        .with_time_source(Arc::new(FixedTimeSource::new(NOW_MILLIS)))
}
