//! # Run Lifecycle
//!
//! Stop requests, the one-run-at-a-time guard, storage failures and store
//! handle release.

#[cfg(test)]
mod tests {
    use en_01_proximity_ids::ProximityIdFactory;
    use en_03_exposure_matching::test_utils::{record_sighting_at_offset, test_key_on_day, TEST_DAY};
    use en_03_exposure_matching::{
        BucketizedRiskScorer, CancellationToken, CandidateSelection, CandidateSelector,
        ContactStore, ExposureMatchingApi, InMemoryStores, MatchingConfig, MatchingConfigBuilder,
        MatchingError, RiskAssessment, RiskScorer, RunOutcome, StorageError, TracerState,
    };
    use parking_lot::Mutex;
    use shared_types::{DiagnosisKey, ExposureWindow};
    use std::sync::mpsc::{channel, Receiver, Sender};
    use std::sync::Arc;
    use std::thread;

    use crate::fixtures::{request, tracer};

    /// Runs `hook` each time a key reaches scoring, then scores normally.
    struct HookScorer<F> {
        inner: BucketizedRiskScorer,
        hook: F,
    }

    impl<F: Fn() + Send + Sync> RiskScorer for HookScorer<F> {
        fn score(&self, key: &DiagnosisKey, windows: &[ExposureWindow]) -> Option<RiskAssessment> {
            (self.hook)();
            self.inner.score(key, windows)
        }
    }

    fn hooked<F: Fn() + Send + Sync + 'static>(hook: F) -> Arc<dyn RiskScorer> {
        Arc::new(HookScorer {
            inner: BucketizedRiskScorer::default(),
            hook,
        })
    }

    /// Parks the run inside candidate selection until released.
    struct GateSelector {
        entered: Mutex<Sender<()>>,
        release: Mutex<Receiver<()>>,
    }

    impl CandidateSelector for GateSelector {
        fn name(&self) -> &'static str {
            "gate"
        }

        fn select(
            &self,
            _contacts: &dyn ContactStore,
            _keys: &[DiagnosisKey],
            _factory: &ProximityIdFactory,
            _max_intervals: u32,
        ) -> Result<CandidateSelection, MatchingError> {
            let _ = self.entered.lock().send(());
            let _ = self.release.lock().recv();
            Ok(CandidateSelection::all())
        }
    }

    fn keys_with_sightings(stores: &InMemoryStores, count: u8) -> Vec<DiagnosisKey> {
        (0..count)
            .map(|seed| {
                let key = test_key_on_day(seed, TEST_DAY);
                record_sighting_at_offset(stores, &key, u32::from(seed) + 1);
                key
            })
            .collect()
    }

    #[test]
    fn test_concurrent_run_rejected_and_stop_honoured() {
        let stores = InMemoryStores::new();
        let keys = keys_with_sightings(&stores, 3);
        let (entered_tx, entered_rx) = channel();
        let (release_tx, release_rx) = channel();
        let gate = GateSelector {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        };
        let tracer = Arc::new(tracer(&stores, MatchingConfig::default()).with_selector(Box::new(gate)));
        let request = request(keys);

        let running = {
            let tracer = Arc::clone(&tracer);
            let request = request.clone();
            thread::spawn(move || tracer.trace(&request))
        };
        entered_rx.recv().unwrap();

        assert_eq!(tracer.state(), TracerState::Running);
        assert!(
            matches!(tracer.trace(&request), Err(MatchingError::AlreadyRunning)),
            "Second run must be rejected while the first is in flight"
        );

        tracer.stop();
        release_tx.send(()).unwrap();
        let report = running.join().unwrap().unwrap();

        assert_eq!(report.outcome, RunOutcome::Stopped);
        assert_eq!(report.processed_keys, 0);
        assert_eq!(tracer.state(), TracerState::Stopped);
        assert_eq!(stores.completed_requests(&request.token_root()).len(), 1);
        assert_eq!(stores.open_handles(), 0);
    }

    #[test]
    fn test_tracer_reusable_after_stop() {
        let stores = InMemoryStores::new();
        let keys = keys_with_sightings(&stores, 2);
        let tracer = tracer(&stores, MatchingConfig::default());
        let request = request(keys);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let stopped = tracer.trace_with_token(&request, cancel).unwrap();
        assert_eq!(stopped.outcome, RunOutcome::Stopped);
        assert_eq!(stores.result_count(&request.token_root()), 0);

        let report = tracer.trace(&request).unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.matches_found, 2);
        assert_eq!(tracer.state(), TracerState::Completed);
    }

    #[test]
    fn test_unavailable_storage_fails_run() {
        let stores = InMemoryStores::new();
        let keys = keys_with_sightings(&stores, 1);
        stores.set_unavailable(true);
        let tracer = tracer(&stores, MatchingConfig::default());

        let err = tracer.trace(&request(keys)).unwrap_err();
        assert!(matches!(err, MatchingError::Storage(StorageError::Unavailable(_))));
        assert_eq!(tracer.state(), TracerState::Failed);
        assert_eq!(stores.open_handles(), 0);
    }

    #[test]
    fn test_failed_commit_discards_pending_results() {
        let stores = InMemoryStores::new();
        let keys = keys_with_sightings(&stores, 3);
        stores.fail_next_commit();
        let tracer = tracer(&stores, MatchingConfig::default());
        let request = request(keys);

        let err = tracer.trace(&request).unwrap_err();
        assert!(matches!(err, MatchingError::Storage(StorageError::CommitFailed(_))));
        assert_eq!(stores.result_count(&request.token_root()), 0, "Nothing may leak from a failed commit");
        assert!(stores.completed_requests(&request.token_root()).is_empty());
        assert_eq!(stores.open_handles(), 0);

        let retry = tracer.trace(&request).unwrap();
        assert_eq!(retry.matches_found, 3, "Retry matches everything again");
    }

    #[test]
    fn test_contact_read_failure_keeps_earlier_writes_uncommitted() {
        let stores = InMemoryStores::new();
        let keys = keys_with_sightings(&stores, 2);
        let config = MatchingConfigBuilder::new().use_matching_filter(false).build().unwrap();
        let failing = stores.clone();
        let tracer = tracer(&stores, config).with_risk_scorer(hooked(move || failing.fail_contact_reads(true)));
        let request = request(keys);

        let err = tracer.trace(&request).unwrap_err();
        assert!(matches!(err, MatchingError::Storage(StorageError::Io(_))));
        assert_eq!(
            stores.result_count(&request.token_root()),
            0,
            "First key matched before the failure but its write must not be committed"
        );
        assert!(stores.completed_requests(&request.token_root()).is_empty());
        assert_eq!(stores.open_handles(), 0);
    }

    #[test]
    fn test_stop_mid_run_commits_finished_keys_only() {
        let stores = InMemoryStores::new();
        let keys = keys_with_sightings(&stores, 3);
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        let tracer = tracer(&stores, MatchingConfig::default()).with_risk_scorer(hooked(move || stopper.cancel()));
        let request = request(keys.clone());

        let report = tracer.trace_with_token(&request, cancel).unwrap();

        assert_eq!(report.outcome, RunOutcome::Stopped);
        assert_eq!(report.processed_keys, 1, "The key being scored finishes, the rest are left");
        assert!(stores.result(&request.token_root(), keys[0].key_data()).is_some());
        for key in &keys[1..] {
            assert!(stores.result(&request.token_root(), key.key_data()).is_none());
            assert_eq!(stores.attempted_rolling_period(&request.package_root(), &key.identity()), None);
        }
        assert_eq!(stores.completed_requests(&request.token_root())[0].key_count, 1);
        assert_eq!(tracer.state(), TracerState::Stopped);
        assert_eq!(stores.open_handles(), 0);
    }
}
