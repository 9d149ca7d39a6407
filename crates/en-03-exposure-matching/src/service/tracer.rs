//! Exposure matching tracer.
//!
//! ## Per-key order
//!
//! 1. stored result: skip, or apply a report-type transition in place
//! 2. rolling period must be valid and unchanged since the last attempt
//! 3. RECURSIVE keys only when enabled
//! 4. REVOKED and above only for the privileged token, when opted in
//! 5. geo filter and candidate selection
//! 6. resolve the maximum-period identifiers, record the attempt
//! 7. restrict to the declared period, optionally aggregate, evaluate, store
//!
//! Keys are processed one at a time; later keys see what earlier keys
//! stored in the same run.

use chrono::{DateTime, Utc};
use en_01_proximity_ids::{ProximityIdFactory, RollingProximityIdGenerator, MAX_INTERVALS_PER_KEY};
use en_02_contact_filter::ContactLookupTable;
use parking_lot::Mutex;
use shared_types::{
    CompletedMatchingRequestRecord, DiagnosisKey, GeneratedProximityId, PackageRoot, ReportType,
    TokenRoot,
};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::adapters::{BucketizedRiskScorer, SystemTimeSource};
use crate::domain::{
    CancellationToken, MatchingConfig, MatchingRequest, RunOutcome, SkipReason, SkipTally,
    TraceReport, TracerState, TransitionDecision, TransitionTable,
};
use crate::error::{MatchingError, ProtocolViolation, StorageError};
use crate::ports::inbound::ExposureMatchingApi;
use crate::ports::outbound::{
    AttemptedKeyStore, ContactStore, ExposureResultStore, GeoCellFilter, RiskScorer,
    StoreProvider, TimeSource,
};
use crate::service::{ExposureEvaluator, ResolverSettings, SightingWindowResolver};
use crate::strategy::{selector_for, CandidateSelector, CandidateSet};

/// Keys dumped when verbose matching logs are on.
const VERBOSE_KEY_DUMP_LIMIT: usize = 10;

enum KeyOutcome {
    Matched,
    Transitioned,
    NoMatch,
    Skipped(SkipReason),
}

/// Everything one run's per-key loop works with.
struct RunScope<'r, C: ContactStore, R: ExposureResultStore, A: AttemptedKeyStore> {
    resolver: SightingWindowResolver<'r, C>,
    evaluator: &'r ExposureEvaluator,
    results: &'r mut R,
    attempted: &'r mut A,
    generator: RollingProximityIdGenerator,
    ids: Vec<GeneratedProximityId>,
    candidates: &'r CandidateSet,
    token_root: TokenRoot,
    package_root: PackageRoot,
    privileged: bool,
}

pub struct ExposureMatchingTracer<P: StoreProvider> {
    stores: P,
    config: MatchingConfig,
    factory: ProximityIdFactory,
    transitions: TransitionTable,
    selector: Box<dyn CandidateSelector>,
    scorer: Arc<dyn RiskScorer>,
    geo_filter: Option<Arc<dyn GeoCellFilter>>,
    time_source: Arc<dyn TimeSource>,
    state: Mutex<TracerState>,
    current_run: Mutex<Option<CancellationToken>>,
}

impl<P: StoreProvider> ExposureMatchingTracer<P> {
    /// # Errors
    ///
    /// `Config` if the configuration does not validate, `Crypto` if its
    /// derivation parameters are unusable.
    pub fn new(stores: P, config: MatchingConfig) -> Result<Self, MatchingError> {
        config.validate()?;
        let factory = ProximityIdFactory::new(config.derivation_params())?;
        Ok(Self {
            stores,
            factory,
            transitions: TransitionTable::new(config.allowed_report_type_transitions),
            selector: selector_for(&config),
            scorer: Arc::new(BucketizedRiskScorer::new(config.tracing.clone())),
            geo_filter: None,
            time_source: Arc::new(SystemTimeSource),
            state: Mutex::new(TracerState::Idle),
            current_run: Mutex::new(None),
            config,
        })
    }

    pub fn with_risk_scorer(mut self, scorer: Arc<dyn RiskScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_geo_filter(mut self, filter: Arc<dyn GeoCellFilter>) -> Self {
        self.geo_filter = Some(filter);
        self
    }

    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    /// Replace the selector picked from `matching_path`.
    pub fn with_selector(mut self, selector: Box<dyn CandidateSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Run with a caller-owned cancellation token.
    pub fn trace_with_token(
        &self,
        request: &MatchingRequest,
        cancel: CancellationToken,
    ) -> Result<TraceReport, MatchingError> {
        {
            let mut state = self.state.lock();
            if *state == TracerState::Running {
                return Err(MatchingError::AlreadyRunning);
            }
            *state = TracerState::Running;
            *self.current_run.lock() = Some(cancel.clone());
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("matching_run", run_id = %run_id);
        let result = span.in_scope(|| self.run(run_id, request, &cancel));

        *self.current_run.lock() = None;
        *self.state.lock() = match &result {
            Ok(report) => report.outcome.into(),
            Err(_) => TracerState::Failed,
        };
        result
    }

    fn run(
        &self,
        run_id: Uuid,
        request: &MatchingRequest,
        cancel: &CancellationToken,
    ) -> Result<TraceReport, MatchingError> {
        let keys = &request.diagnosis_keys;
        info!(
            keys = keys.len(),
            path = self.selector.name(),
            "Matching run started"
        );
        if self.config.verbose_matching_logs {
            log_keys(keys, self.config.id_rolling_period_minutes.saturating_mul(60));
        }

        let contacts = self.stores.open_contact_store()?;
        let mut results = self.stores.open_result_store()?;
        let mut attempted = self.stores.open_attempted_key_store()?;

        let max_intervals = self.config.key_rolling_period_intervals;
        let mut selection = self
            .selector
            .select(&contacts, keys, &self.factory, max_intervals)?;

        let lookup = match selection.lookup_table.take() {
            Some(table) if self.config.use_matching_filter => {
                debug!("Reusing selector lookup table");
                table
            }
            _ if self.config.use_matching_filter => ContactLookupTable::create(
                &contacts.get_all_raw_ids()?,
                self.config.lookup_false_positive_rate,
            )?,
            _ => ContactLookupTable::create_default(),
        };
        let evaluator = ExposureEvaluator::new(&self.config, Arc::clone(&self.scorer))?;

        let mut scope = RunScope {
            resolver: SightingWindowResolver::new(
                &contacts,
                &lookup,
                ResolverSettings::from_config(&self.config)?,
            ),
            evaluator: &evaluator,
            results: &mut results,
            attempted: &mut attempted,
            generator: self.factory.generator(),
            ids: Vec::with_capacity(MAX_INTERVALS_PER_KEY as usize),
            candidates: &selection.candidates,
            token_root: request.token_root(),
            package_root: request.package_root(),
            privileged: self.config.is_privileged_token(&request.token),
        };

        let mut outcome = RunOutcome::Completed;
        let mut processed = 0u32;
        let mut matches_found = 0u32;
        let mut transitions_applied = 0u32;
        let mut skipped = SkipTally::default();

        for key in keys {
            if cancel.is_cancelled() {
                info!(processed, remaining = keys.len() - processed as usize, "Matching run stopped");
                outcome = RunOutcome::Stopped;
                break;
            }
            processed += 1;

            match self.process_key(key, &mut scope) {
                Ok(KeyOutcome::Matched) => matches_found += 1,
                Ok(KeyOutcome::Transitioned) => transitions_applied += 1,
                Ok(KeyOutcome::NoMatch) => {}
                Ok(KeyOutcome::Skipped(reason)) => skipped.record(reason),
                Err(e) if e.is_per_key() => {
                    warn!(error = %e, "Skipping diagnosis key with malformed key material");
                    skipped.record(SkipReason::CryptoFailure);
                }
                Err(e) => {
                    error!(error = %e, processed, "Matching run failed");
                    return Err(e);
                }
            }
        }
        drop(scope);

        if self.config.store_results_in_transaction {
            results.commit_transaction().inspect_err(|e| {
                error!(error = %e, "Committing matching results failed");
            })?;
        }

        let key_count = selection
            .processed_key_count
            .map(|n| n as u32)
            .unwrap_or(processed);
        results.record_completed_request(
            &request.token_root(),
            CompletedMatchingRequestRecord {
                key_batch_hash: request.key_batch_hash(),
                timestamp_millis: self.time_source.now_millis(),
                key_count,
                matches_count: matches_found,
            },
        )?;

        info!(
            outcome = ?outcome,
            processed,
            matches_found,
            transitions_applied,
            skipped = skipped.total(),
            "Matching run finished"
        );
        Ok(TraceReport {
            run_id,
            outcome,
            diagnosis_key_count: keys.len() as u32,
            processed_keys: processed,
            matches_found,
            transitions_applied,
            skipped,
        })
    }

    fn process_key<C, R, A>(
        &self,
        key: &DiagnosisKey,
        scope: &mut RunScope<'_, C, R, A>,
    ) -> Result<KeyOutcome, MatchingError>
    where
        C: ContactStore,
        R: ExposureResultStore,
        A: AttemptedKeyStore,
    {
        let config = &self.config;
        let effective_type = key.report_type().or_when_missing(config.report_type_when_missing);
        let identity = key.identity();

        if scope.results.has_result(&scope.token_root, key.key_data())? {
            return self.revisit_stored_result(key, effective_type, scope);
        }

        let rolling_period = key.rolling_period();
        if rolling_period == 0 || rolling_period > config.key_rolling_period_intervals {
            return Ok(skip(ProtocolViolation::InvalidRollingPeriod {
                rolling_period,
                max: config.key_rolling_period_intervals,
            }));
        }
        if scope
            .attempted
            .rolling_period_changed(&scope.package_root, &identity, rolling_period)?
        {
            return Ok(skip(ProtocolViolation::RollingPeriodChanged { rolling_period }));
        }

        if key.report_type() == ReportType::Recursive && !config.enable_recursive_report_type {
            return Ok(skip(ProtocolViolation::RecursiveReportDisabled));
        }
        if effective_type >= ReportType::Revoked {
            let revoked_allowed = scope.privileged
                && effective_type == ReportType::Revoked
                && config.store_matches_for_revoked_keys;
            if !revoked_allowed {
                return Ok(skip(ProtocolViolation::ReportTypeNotAllowed {
                    report_type: effective_type,
                }));
            }
        }

        if let Some(filter) = &self.geo_filter {
            if !filter.admits(key) {
                debug!("Diagnosis key outside visited cells");
                return Ok(KeyOutcome::Skipped(SkipReason::GeoFiltered));
            }
        }
        if !scope.candidates.contains(&identity) {
            return Ok(KeyOutcome::Skipped(SkipReason::PrefilteredOut));
        }

        let start = key.rolling_start_interval_number();
        scope.generator.generate_into(
            key.key_data(),
            start,
            config.key_rolling_period_intervals,
            None,
            &mut scope.ids,
        )?;
        let all = scope.resolver.fetch_valid_sightings(key, &scope.ids, false)?;
        if all.is_empty() {
            return Ok(KeyOutcome::NoMatch);
        }
        scope
            .attempted
            .store_attempted_key_rolling_period(&scope.package_root, &identity, rolling_period)?;

        let declared_end = u64::from(start) + u64::from(rolling_period);
        let plain: Vec<_> = all
            .into_iter()
            .filter(|s| u64::from(s.interval_number) < declared_end)
            .collect();
        if plain.is_empty() {
            return Ok(KeyOutcome::NoMatch);
        }

        let aggregated;
        let scans = if config.aggregate_sightings {
            let declared = &scope.ids[..rolling_period as usize];
            aggregated = scope.resolver.fetch_valid_sightings(key, declared, true)?;
            aggregated.as_slice()
        } else {
            plain.as_slice()
        };

        let Some(mut result) = scope.evaluator.find_exposures(key, scans) else {
            return Ok(KeyOutcome::NoMatch);
        };
        if scope.privileged {
            result.raw_exposure_windows = scope.evaluator.find_exposure_windows(key, &plain);
        }
        scope.results.store_result(
            &scope.token_root,
            key.key_data(),
            &result,
            config.store_results_in_transaction,
        )?;
        info!(
            windows = result.exposure_windows.len(),
            exposure_minutes = result.exposure_minutes,
            report_type = ?result.report_type,
            "Exposure found"
        );
        Ok(KeyOutcome::Matched)
    }

    fn revisit_stored_result<C, R, A>(
        &self,
        key: &DiagnosisKey,
        effective_type: ReportType,
        scope: &mut RunScope<'_, C, R, A>,
    ) -> Result<KeyOutcome, MatchingError>
    where
        C: ContactStore,
        R: ExposureResultStore,
        A: AttemptedKeyStore,
    {
        if !self.config.support_report_type_transitions {
            debug!("Diagnosis key already matched");
            return Ok(KeyOutcome::Skipped(SkipReason::AlreadyMatched));
        }
        let stored = scope
            .results
            .get_result(&scope.token_root, key.key_data())?
            .ok_or_else(|| StorageError::Corrupt("result listed but not readable".into()))?;

        match self.transitions.evaluate(&stored, effective_type) {
            TransitionDecision::AlreadyMatched => {
                debug!("Diagnosis key already matched");
                Ok(KeyOutcome::Skipped(SkipReason::AlreadyMatched))
            }
            TransitionDecision::Rejected(violation) => Ok(skip(violation)),
            TransitionDecision::Apply(updated) => {
                scope
                    .results
                    .store_result(&scope.token_root, key.key_data(), &updated, false)?;
                info!(
                    from = ?stored.report_type,
                    to = ?updated.report_type,
                    transition_count = updated.report_type_transition_count,
                    "Report type transition applied"
                );
                Ok(KeyOutcome::Transitioned)
            }
        }
    }
}

fn skip(violation: ProtocolViolation) -> KeyOutcome {
    match violation {
        ProtocolViolation::RollingPeriodChanged { .. } | ProtocolViolation::InvalidRollingPeriod { .. } => {
            warn!(reason = %violation, "Skipping diagnosis key")
        }
        _ => info!(reason = %violation, "Skipping diagnosis key"),
    }
    KeyOutcome::Skipped(SkipReason::from(&violation))
}

fn log_keys(keys: &[DiagnosisKey], interval_seconds: u32) {
    for key in keys.iter().take(VERBOSE_KEY_DUMP_LIMIT) {
        let start_seconds = i64::from(key.rolling_start_interval_number()) * i64::from(interval_seconds);
        let start_time = DateTime::<Utc>::from_timestamp(start_seconds, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        info!(
            key = %hex::encode(key.key_data()),
            rolling_start = key.rolling_start_interval_number(),
            rolling_period = key.rolling_period(),
            start_time = %start_time,
            report_type = ?key.report_type(),
            "Diagnosis key"
        );
    }
}

impl<P: StoreProvider> ExposureMatchingApi for ExposureMatchingTracer<P> {
    fn trace(&self, request: &MatchingRequest) -> Result<TraceReport, MatchingError> {
        self.trace_with_token(request, CancellationToken::new())
    }

    fn stop(&self) {
        if let Some(token) = self.current_run.lock().as_ref() {
            info!("Stop requested");
            token.cancel();
        }
    }

    fn state(&self) -> TracerState {
        *self.state.lock()
    }
}
