//! # End-to-End Matching
//!
//! One diagnosis key, sightings recorded with its real identifiers, full
//! tracer run over the in-memory stores.

#[cfg(test)]
mod tests {
    use en_03_exposure_matching::test_utils::{
        day_start_interval, record_sighting, test_key_on_day, TEST_DAY,
    };
    use en_03_exposure_matching::{
        ExposureMatchingApi, InMemoryStores, MatchingConfig, MatchingConfigBuilder, RunOutcome,
    };

    use crate::fixtures::{request, tracer};

    #[test]
    fn test_interval_37_sighting_yields_one_window() {
        let stores = InMemoryStores::new();
        let key = test_key_on_day(37, TEST_DAY);
        let interval = day_start_interval(TEST_DAY) + 37;
        record_sighting(&stores, &key, interval, interval * 600, -62, -8);

        let request = request(vec![key.clone()]);
        let report = tracer(&stores, MatchingConfig::default()).trace(&request).unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.diagnosis_key_count, 1);
        assert_eq!(report.processed_keys, 1);
        assert_eq!(report.matches_found, 1);

        let result = stores
            .result(&request.token_root(), key.key_data())
            .expect("result stored");
        assert_eq!(result.exposure_windows.len(), 1, "Exactly one exposure window");
        let window = &result.exposure_windows[0];
        assert!(window.covers_interval(interval), "Window must cover interval 37");
        assert_eq!(window.first_interval_number, interval);
        assert_eq!(window.last_interval_number, interval);
        assert_eq!(window.day_number, TEST_DAY);
        assert_eq!(window.scan_instances[0].min_attenuation_db, 54);
    }

    #[test]
    fn test_out_of_range_tx_power_never_matches() {
        let stores = InMemoryStores::new();
        let key = test_key_on_day(38, TEST_DAY);
        let interval = day_start_interval(TEST_DAY) + 37;
        record_sighting(&stores, &key, interval, interval * 600, -62, 21);

        let report = tracer(&stores, MatchingConfig::default())
            .trace(&request(vec![key]))
            .unwrap();
        assert_eq!(report.matches_found, 0);
    }

    #[test]
    fn test_replayed_identifier_counts_once() {
        let stores = InMemoryStores::new();
        let key = test_key_on_day(39, TEST_DAY);
        let interval = day_start_interval(TEST_DAY) + 90;
        let t0 = interval * 600;
        record_sighting(&stores, &key, interval, t0, -60, -10);
        // Replayed 2 intervals + 1 s after the first sighting, still inside drift
        record_sighting(&stores, &key, interval, t0 + 1201, -40, -10);

        let request = request(vec![key.clone()]);
        tracer(&stores, MatchingConfig::default()).trace(&request).unwrap();

        let result = stores.result(&request.token_root(), key.key_data()).unwrap();
        let scans: usize = result.exposure_windows.iter().map(|w| w.scan_instances.len()).sum();
        assert_eq!(scans, 1, "Replayed sighting must be dropped");
        assert_eq!(result.exposure_windows[0].scan_instances[0].min_attenuation_db, 50);
    }

    #[test]
    fn test_sightings_across_midnight_one_key() {
        let stores = InMemoryStores::new();
        let key = test_key_on_day(40, TEST_DAY);
        let last = day_start_interval(TEST_DAY) + 143;
        // Broadcast in the key's last interval, seen just after midnight
        record_sighting(&stores, &key, last, (last + 2) * 600, -60, -10);

        let request = request(vec![key.clone()]);
        let report = tracer(&stores, MatchingConfig::default()).trace(&request).unwrap();
        assert_eq!(report.matches_found, 1);

        let window = &stores.result(&request.token_root(), key.key_data()).unwrap().exposure_windows[0];
        assert_eq!(window.day_number, shared_types::DayNumber(TEST_DAY.0 + 1));
        assert!(window.covers_interval(last));
    }

    #[test]
    fn test_aggregation_collapses_scan_bursts() {
        let stores = InMemoryStores::new();
        let key = test_key_on_day(41, TEST_DAY);
        let interval = day_start_interval(TEST_DAY) + 100;
        let t0 = interval * 600;
        for (offset, rssi) in [(0, -70), (4, -55), (8, -65), (300, -60)] {
            record_sighting(&stores, &key, interval, t0 + offset, rssi, -10);
        }

        let request = request(vec![key.clone()]);
        let config = MatchingConfigBuilder::new().aggregate_sightings(true).build().unwrap();
        tracer(&stores, config).trace(&request).unwrap();

        let result = stores.result(&request.token_root(), key.key_data()).unwrap();
        let scans = &result.exposure_windows[0].scan_instances;
        assert_eq!(scans.len(), 2);
        assert_eq!(scans[0].min_attenuation_db, 45, "Strongest sighting of the burst is kept");
        assert_eq!(scans[0].typical_attenuation_db, 45, "Weaker burst sightings are dropped");
    }

    #[test]
    fn test_verbose_logs_do_not_change_results() {
        let stores = InMemoryStores::new();
        let key = test_key_on_day(42, TEST_DAY);
        let interval = day_start_interval(TEST_DAY) + 12;
        record_sighting(&stores, &key, interval, interval * 600, -60, -10);

        let config = MatchingConfigBuilder::new().verbose_matching_logs(true).build().unwrap();
        let report = tracer(&stores, config).trace(&request(vec![key])).unwrap();
        assert_eq!(report.matches_found, 1);
    }
}
