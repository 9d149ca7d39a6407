//! # Report Types Across Runs
//!
//! Dedupe of stored results, the report-type transition table and its cap,
//! and rolling-period immutability shared by every token of a package.

#[cfg(test)]
mod tests {
    use en_03_exposure_matching::test_utils::{record_sighting_at_offset, test_key_on_day, TEST_DAY};
    use en_03_exposure_matching::{
        ExposureMatchingApi, InMemoryStores, MatchingConfig, MatchingConfigBuilder,
        MatchingRequest, SkipReason,
    };
    use shared_types::{DiagnosisKey, ReportType};

    use crate::fixtures::{request, tracer, PACKAGE, SIGNATURE};

    fn matched_key(stores: &InMemoryStores, seed: u8, report_type: ReportType) -> DiagnosisKey {
        let key = test_key_on_day(seed, TEST_DAY).with_report_type(report_type);
        record_sighting_at_offset(stores, &key, 20);
        key
    }

    #[test]
    fn test_resubmitted_key_is_not_matched_twice() {
        let stores = InMemoryStores::new();
        let key = matched_key(&stores, 1, ReportType::ConfirmedTest);
        let tracer = tracer(&stores, MatchingConfig::default());
        let request = request(vec![key]);

        let first = tracer.trace(&request).unwrap();
        let second = tracer.trace(&request).unwrap();

        assert_eq!(first.matches_found, 1);
        assert_eq!(second.matches_found, 0);
        assert_eq!(second.skipped.get(SkipReason::AlreadyMatched), 1);
        assert_eq!(stores.result_count(&request.token_root()), 1);
        assert_eq!(
            stores.completed_requests(&request.token_root()).len(),
            2,
            "Every run is recorded"
        );
    }

    #[test]
    fn test_self_report_upgraded_then_invalid_follow_up() {
        let stores = InMemoryStores::new();
        let key = matched_key(&stores, 2, ReportType::SelfReport);
        let tracer = tracer(&stores, MatchingConfig::default());

        let first = request(vec![key.clone()]);
        tracer.trace(&first).unwrap();

        let upgrade = request(vec![key.clone().with_report_type(ReportType::ConfirmedTest)]);
        let report = tracer.trace(&upgrade).unwrap();
        assert_eq!(report.transitions_applied, 1);

        let stored = stores.result(&first.token_root(), key.key_data()).unwrap();
        assert_eq!(stored.report_type, ReportType::ConfirmedTest);
        assert_eq!(stored.report_type_transition_count, 1);
        assert!(
            stored.exposure_windows.iter().all(|w| w.report_type == ReportType::ConfirmedTest),
            "Windows carry the new report type"
        );

        // CONFIRMED_TEST has no outgoing transitions
        let downgrade = request(vec![key
            .clone()
            .with_report_type(ReportType::ConfirmedClinicalDiagnosis)]);
        let report = tracer.trace(&downgrade).unwrap();
        assert_eq!(report.transitions_applied, 0);
        assert_eq!(report.skipped.get(SkipReason::InvalidTransition), 1);
        assert_eq!(
            stores.result(&first.token_root(), key.key_data()).unwrap().report_type,
            ReportType::ConfirmedTest
        );
    }

    #[test]
    fn test_transition_cap() {
        let stores = InMemoryStores::new();
        let key = matched_key(&stores, 3, ReportType::SelfReport);
        let config = MatchingConfigBuilder::new()
            .allowed_report_type_transitions(1)
            .build()
            .unwrap();
        let tracer = tracer(&stores, config);

        tracer.trace(&request(vec![key.clone()])).unwrap();
        let to_clinical = key.clone().with_report_type(ReportType::ConfirmedClinicalDiagnosis);
        assert_eq!(tracer.trace(&request(vec![to_clinical])).unwrap().transitions_applied, 1);

        let to_test = key.clone().with_report_type(ReportType::ConfirmedTest);
        let report = tracer.trace(&request(vec![to_test])).unwrap();
        assert_eq!(report.skipped.get(SkipReason::TransitionLimitReached), 1);

        let stored = stores.result(&request(vec![]).token_root(), key.key_data()).unwrap();
        assert_eq!(stored.report_type, ReportType::ConfirmedClinicalDiagnosis);
        assert_eq!(stored.report_type_transition_count, 1);
    }

    #[test]
    fn test_transitions_disabled() {
        let stores = InMemoryStores::new();
        let key = matched_key(&stores, 4, ReportType::SelfReport);
        let config = MatchingConfigBuilder::new()
            .support_report_type_transitions(false)
            .build()
            .unwrap();
        let tracer = tracer(&stores, config);

        tracer.trace(&request(vec![key.clone()])).unwrap();
        let report = tracer
            .trace(&request(vec![key.with_report_type(ReportType::ConfirmedTest)]))
            .unwrap();
        assert_eq!(report.transitions_applied, 0);
        assert_eq!(report.skipped.get(SkipReason::AlreadyMatched), 1);
    }

    #[test]
    fn test_rolling_period_shared_across_tokens() {
        let stores = InMemoryStores::new();
        let key = matched_key(&stores, 5, ReportType::ConfirmedTest);
        let first_token = MatchingRequest::new(PACKAGE, SIGNATURE.to_vec(), "FIRST", vec![key.clone()]);
        let tracer = tracer(&stores, MatchingConfig::default());
        assert_eq!(tracer.trace(&first_token).unwrap().matches_found, 1);

        let shortened = key.clone().with_rolling_period(72);
        let second_token =
            MatchingRequest::new(PACKAGE, SIGNATURE.to_vec(), "SECOND", vec![shortened]);
        let report = tracer.trace(&second_token).unwrap();

        assert_eq!(report.matches_found, 0);
        assert_eq!(report.skipped.get(SkipReason::RollingPeriodChanged), 1);
        assert_eq!(stores.result_count(&second_token.token_root()), 0);
    }

    #[test]
    fn test_other_package_has_its_own_rolling_periods() {
        let stores = InMemoryStores::new();
        let key = matched_key(&stores, 6, ReportType::ConfirmedTest);
        let tracer = tracer(&stores, MatchingConfig::default());
        tracer.trace(&request(vec![key.clone()])).unwrap();

        let other = MatchingRequest::new(
            "org.example.other",
            SIGNATURE.to_vec(),
            "OTHER",
            vec![key.with_rolling_period(72)],
        );
        let report = tracer.trace(&other).unwrap();
        assert_eq!(report.skipped.get(SkipReason::RollingPeriodChanged), 0);
        assert_eq!(report.matches_found, 1, "Sighting at offset 20 is inside 72 intervals");
    }

    #[test]
    fn test_unknown_report_type_takes_configured_default() {
        let stores = InMemoryStores::new();
        let key = matched_key(&stores, 7, ReportType::Unknown);
        let config = MatchingConfigBuilder::new()
            .report_type_when_missing(ReportType::ConfirmedClinicalDiagnosis)
            .build()
            .unwrap();
        let request = request(vec![key.clone()]);
        tracer(&stores, config).trace(&request).unwrap();

        let stored = stores.result(&request.token_root(), key.key_data()).unwrap();
        assert_eq!(stored.report_type, ReportType::ConfirmedClinicalDiagnosis);
    }

    #[test]
    fn test_revoked_key_skipped_for_ordinary_token() {
        let stores = InMemoryStores::new();
        let key = matched_key(&stores, 8, ReportType::Revoked);
        let config = MatchingConfigBuilder::new()
            .store_matches_for_revoked_keys(true)
            .privileged_token("PRIVILEGED")
            .build()
            .unwrap();
        let report = tracer(&stores, config).trace(&request(vec![key])).unwrap();
        assert_eq!(report.skipped.get(SkipReason::ReportTypeNotAllowed), 1);
    }
}
