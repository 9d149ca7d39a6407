//! # Exposure Matching Benchmarks
//!
//! | Group | Measures |
//! |-------|----------|
//! | contact-filter | Bloom and prefix-map membership over a day of sightings |
//! | matching-paths | Full run per matching path, 2% of keys seen |

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use en_02_contact_filter::{ContactLookupTable, PrefixIdMap};
use en_03_exposure_matching::test_utils::{
    record_sighting_at_offset, test_key_on_day, FixedTimeSource, TEST_DAY,
};
use en_03_exposure_matching::{
    ExposureMatchingApi, ExposureMatchingTracer, InMemoryStores, MatchingConfigBuilder,
    MatchingPathKind, MatchingRequest,
};
use rand::Rng;
use shared_types::DiagnosisKey;
use std::sync::Arc;
use std::time::Duration;

fn random_ids(count: usize) -> Vec<Vec<u8>> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen::<[u8; 16]>().to_vec()).collect()
}

// ============================================================================
// Contact filter
// ============================================================================

fn bench_contact_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("contact-filter");

    for stored in [10_000usize, 100_000] {
        let ids = random_ids(stored);
        let lookups = random_ids(1_000);
        let table = ContactLookupTable::create(&ids, 0.001).expect("valid fpr");
        let map = PrefixIdMap::build(&ids).expect("fits");

        group.throughput(Throughput::Elements(lookups.len() as u64));
        group.bench_with_input(BenchmarkId::new("bloom_lookup", stored), &lookups, |b, lookups| {
            b.iter(|| lookups.iter().filter(|p| table.contains_candidate(p)).count())
        });
        group.bench_with_input(BenchmarkId::new("prefix_map_lookup", stored), &lookups, |b, lookups| {
            b.iter(|| lookups.iter().filter(|p| map.contains(p)).count())
        });
    }
    group.finish();
}

// ============================================================================
// Matching paths
// ============================================================================

const KEYS: u8 = 200;

fn populated_stores() -> (InMemoryStores, Vec<DiagnosisKey>) {
    let stores = InMemoryStores::new();
    let keys: Vec<DiagnosisKey> = (0..KEYS).map(|seed| test_key_on_day(seed, TEST_DAY)).collect();
    for key in keys.iter().step_by(50) {
        record_sighting_at_offset(&stores, key, 60);
    }
    (stores, keys)
}

fn bench_matching_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching-paths");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);
    group.throughput(Throughput::Elements(u64::from(KEYS)));

    for path in [
        MatchingPathKind::Managed,
        MatchingPathKind::ManagedPrefilter,
        MatchingPathKind::Accelerated,
    ] {
        let config = MatchingConfigBuilder::new()
            .matching_path(path)
            .build()
            .expect("valid config");

        group.bench_function(BenchmarkId::new("trace", format!("{:?}", path)), |b| {
            b.iter_batched(
                || {
                    let (stores, keys) = populated_stores();
                    let tracer = ExposureMatchingTracer::new(stores, config.clone())
                        .expect("valid config")
                        .with_time_source(Arc::new(FixedTimeSource::new(0)));
                    let request = MatchingRequest::new("org.example.bench", vec![0; 32], "BENCH", keys);
                    (tracer, request)
                },
                |(tracer, request)| black_box(tracer.trace(&request).map(|r| r.matches_found)),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_contact_filter, bench_matching_paths);
criterion_main!(benches);
