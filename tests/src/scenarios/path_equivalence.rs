//! # Matching Path Equivalence
//!
//! Managed, ManagedPrefilter and Accelerated must store identical results
//! for the same keys and sightings. Only the per-reason skip tallies differ:
//! the filtering paths count keys without sightings as prefiltered out.

use en_03_exposure_matching::test_utils::{
    record_sighting, record_sighting_at_offset, test_key_on_day, TEST_DAY,
};
use en_03_exposure_matching::{
    ExposureMatchingApi, InMemoryStores, MatchingConfigBuilder, MatchingPathKind, TraceReport,
};
use shared_types::{DayNumber, DiagnosisKey, ExposureResult, ReportType};

use crate::fixtures::{request, tracer};

/// Key mix: plain matches, a miss, a policy skip, a key seen only outside
/// its declared period, and a malformed key.
pub fn mixed_keys(stores: &InMemoryStores) -> Vec<DiagnosisKey> {
    let mut keys = Vec::new();
    for seed in 0..6u8 {
        let key = test_key_on_day(seed, TEST_DAY);
        record_sighting_at_offset(stores, &key, 10 + u32::from(seed) * 20);
        keys.push(key);
    }

    keys.push(test_key_on_day(100, TEST_DAY));

    let recursive = test_key_on_day(101, TEST_DAY).with_report_type(ReportType::Recursive);
    record_sighting_at_offset(stores, &recursive, 5);
    keys.push(recursive);

    let short = test_key_on_day(102, TEST_DAY).with_rolling_period(50);
    record_sighting_at_offset(stores, &short, 80);
    keys.push(short);

    let next_day = test_key_on_day(103, DayNumber(TEST_DAY.0 + 1));
    let interval = next_day.rolling_start_interval_number() + 3;
    record_sighting(stores, &next_day, interval, interval * 600 + 30, -70, -5);
    keys.push(next_day);

    keys.push(DiagnosisKey::new(vec![0x11; 8], TEST_DAY.0 * 144, 144));
    keys
}

pub fn run_path(path: MatchingPathKind, batch_size: usize) -> (InMemoryStores, TraceReport, Vec<DiagnosisKey>) {
    let stores = InMemoryStores::new();
    let keys = mixed_keys(&stores);
    let config = MatchingConfigBuilder::new()
        .matching_path(path)
        .native_buffer_key_size(batch_size)
        .build()
        .expect("valid config");
    let report = tracer(&stores, config)
        .trace(&request(keys.clone()))
        .expect("run succeeds");
    (stores, report, keys)
}

pub fn stored_results(stores: &InMemoryStores, keys: &[DiagnosisKey]) -> Vec<Option<ExposureResult>> {
    let root = request(vec![]).token_root();
    keys.iter().map(|k| stores.result(&root, k.key_data())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use en_03_exposure_matching::SkipReason;
    use proptest::prelude::*;

    #[test]
    fn test_all_paths_store_identical_results() {
        let (managed_stores, managed, keys) = run_path(MatchingPathKind::Managed, 1000);
        let expected = stored_results(&managed_stores, &keys);
        assert_eq!(managed.matches_found, 7, "Six plain keys plus the next-day key");

        for (path, batch) in [
            (MatchingPathKind::ManagedPrefilter, 1000),
            (MatchingPathKind::Accelerated, 1000),
            (MatchingPathKind::Accelerated, 3),
        ] {
            let (stores, report, _) = run_path(path, batch);
            assert_eq!(report.matches_found, managed.matches_found, "{:?} match count", path);
            assert_eq!(
                stored_results(&stores, &keys),
                expected,
                "{:?} (batch {}) stored results differ from managed",
                path,
                batch
            );
        }
    }

    #[test]
    fn test_policy_and_crypto_skips_agree_across_paths() {
        for path in [
            MatchingPathKind::Managed,
            MatchingPathKind::ManagedPrefilter,
            MatchingPathKind::Accelerated,
        ] {
            let (_, report, keys) = run_path(path, 4);
            assert_eq!(report.processed_keys as usize, keys.len());
            assert_eq!(report.skipped.get(SkipReason::RecursiveDisabled), 1, "{:?}", path);
            assert_eq!(report.skipped.get(SkipReason::CryptoFailure), 1, "{:?}", path);
        }
    }

    #[test]
    fn test_filtering_paths_tally_prefiltered_keys() {
        let (_, managed, _) = run_path(MatchingPathKind::Managed, 1000);
        assert_eq!(managed.skipped.get(SkipReason::PrefilteredOut), 0);

        let (_, accelerated, _) = run_path(MatchingPathKind::Accelerated, 1000);
        assert_eq!(
            accelerated.skipped.get(SkipReason::PrefilteredOut),
            1,
            "Only the key with no sightings at all has no exact identifier hit"
        );
    }

    #[test]
    fn test_short_key_records_attempt_on_every_path() {
        for path in [MatchingPathKind::Managed, MatchingPathKind::Accelerated] {
            let (stores, _, keys) = run_path(path, 1000);
            let short = &keys[8];
            assert_eq!(short.rolling_period(), 50);
            assert_eq!(
                stores.attempted_rolling_period(&request(vec![]).package_root(), &short.identity()),
                Some(50),
                "{:?}: sighting beyond the declared period still records the attempt",
                path
            );
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn prop_accelerated_matches_managed(
            offsets in proptest::collection::vec(proptest::option::of(0u32..144), 1..8),
            batch in 1usize..5,
        ) {
            let populate = |stores: &InMemoryStores| -> Vec<DiagnosisKey> {
                offsets
                    .iter()
                    .enumerate()
                    .map(|(i, offset)| {
                        let key = test_key_on_day(i as u8 + 50, TEST_DAY);
                        if let Some(offset) = offset {
                            record_sighting_at_offset(stores, &key, *offset);
                        }
                        key
                    })
                    .collect()
            };

            let managed_stores = InMemoryStores::new();
            let keys = populate(&managed_stores);
            let config = MatchingConfigBuilder::new().build().unwrap();
            tracer(&managed_stores, config).trace(&request(keys.clone())).unwrap();

            let accelerated_stores = InMemoryStores::new();
            populate(&accelerated_stores);
            let config = MatchingConfigBuilder::new()
                .matching_path(MatchingPathKind::Accelerated)
                .native_buffer_key_size(batch)
                .build()
                .unwrap();
            tracer(&accelerated_stores, config).trace(&request(keys.clone())).unwrap();

            prop_assert_eq!(
                stored_results(&accelerated_stores, &keys),
                stored_results(&managed_stores, &keys)
            );
        }
    }
}
