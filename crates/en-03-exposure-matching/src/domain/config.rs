//! Matching configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use en_03_exposure_matching::{MatchingConfigBuilder, MatchingPathKind};
//!
//! let config = MatchingConfigBuilder::new()
//!     .matching_path(MatchingPathKind::Accelerated)
//!     .aggregate_sightings(true)
//!     .build()
//!     .expect("Valid config");
//! ```

use en_01_proximity_ids::{
    DerivationParams, AEMK_HKDF_INFO, MAX_INTERVALS_PER_KEY, RPIK_HKDF_INFO, RPI_PADDED_PREFIX,
    SUB_KEY_SIZE,
};
use serde::{Deserialize, Serialize};
use shared_types::{IntervalClock, ReportType, ROLLING_PROXIMITY_ID_LENGTH};
use std::ops::RangeInclusive;
use std::str::FromStr;
use tracing::warn;

use crate::error::ConfigError;

/// How candidate diagnosis keys are selected before per-key matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchingPathKind {
    /// Every key is a candidate.
    #[default]
    Managed,
    /// Keys with no identifier in the Bloom lookup table are dropped.
    ManagedPrefilter,
    /// Keys with no exact identifier hit in the prefix map are dropped,
    /// processed in fixed-size batches.
    Accelerated,
}

impl FromStr for MatchingPathKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "managed" => Ok(Self::Managed),
            "managed_prefilter" | "prefilter" => Ok(Self::ManagedPrefilter),
            "accelerated" | "native" => Ok(Self::Accelerated),
            other => Err(ConfigError::new("matching_path", format!("unknown path '{}'", other))),
        }
    }
}

/// Evaluator and default risk-engine parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TracingParams {
    /// A gap longer than this between sightings closes an exposure window.
    pub window_gap_seconds: u32,
    /// Scan duration assumed when a sighting has no previous-scan timestamp.
    pub default_seconds_since_last_scan: u32,
    /// Cap on the duration a single scan can stand for.
    pub max_seconds_since_last_scan: u32,
    /// Exposure minutes are rounded up to a multiple of this.
    pub bucket_minutes: u32,
    /// Bucketized exposures shorter than this are not reported.
    pub min_exposure_bucketized_minutes: u32,
    /// Attenuation thresholds (dB) separating immediate / near / other scans.
    pub attenuation_thresholds_db: [i32; 2],
    /// Percent weights of immediate / near / other scan durations.
    pub attenuation_weights_percent: [u32; 3],
}

impl Default for TracingParams {
    fn default() -> Self {
        Self {
            window_gap_seconds: 1800,
            default_seconds_since_last_scan: 300,
            max_seconds_since_last_scan: 600,
            bucket_minutes: 5,
            min_exposure_bucketized_minutes: 5,
            attenuation_thresholds_db: [55, 63],
            attenuation_weights_percent: [100, 50, 0],
        }
    }
}

/// Matching configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// ± tolerance, in identifier intervals, around an identifier's interval
    pub clock_drift_rolling_periods: u32,
    /// Identifier rotation period in minutes
    pub id_rolling_period_minutes: u32,
    /// Maximum rolling period of a key (intervals per day)
    pub key_rolling_period_intervals: u32,
    /// Scan duration used for aggregation thresholding
    pub scan_time_seconds: u32,
    /// Extended scan duration used for aggregation thresholding
    pub scan_time_extend_seconds: u32,
    /// Lowest accepted transmit power (dBm, inclusive)
    pub tx_power_lower_bound: i32,
    /// Highest accepted transmit power (dBm, inclusive)
    pub tx_power_upper_bound: i32,
    /// Cap on a stored result's report-type transition count
    pub allowed_report_type_transitions: u32,
    /// Keys per batch on the accelerated path
    pub native_buffer_key_size: usize,
    /// Candidate selection strategy
    pub matching_path: MatchingPathKind,
    /// Resolver consults the contact lookup table before querying storage
    pub use_matching_filter: bool,
    /// Target false positive rate of the contact lookup table
    pub lookup_false_positive_rate: f64,
    /// Re-run resolution with scan aggregation for the final evaluation
    pub aggregate_sightings: bool,
    /// Defer result writes to one commit at the end of the run
    pub store_results_in_transaction: bool,
    /// Match keys with the RECURSIVE report type
    pub enable_recursive_report_type: bool,
    /// Allow report-type transitions of previously matched keys
    pub support_report_type_transitions: bool,
    /// Match REVOKED keys for the privileged token
    pub store_matches_for_revoked_keys: bool,
    /// Token allowed to match REVOKED keys and receive raw windows
    pub privileged_token: Option<String>,
    /// Effective report type of keys without one
    pub report_type_when_missing: ReportType,
    /// Dump keys, sightings and discards at info level
    pub verbose_matching_logs: bool,
    pub rpik_hkdf_info: String,
    pub aemk_hkdf_info: String,
    pub rpi_padded_prefix: String,
    pub sub_key_size_bytes: usize,
    pub contact_id_length: usize,
    /// Evaluator / scorer parameters
    pub tracing: TracingParams,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            clock_drift_rolling_periods: 12,
            id_rolling_period_minutes: 10,
            key_rolling_period_intervals: MAX_INTERVALS_PER_KEY,
            scan_time_seconds: 4,
            scan_time_extend_seconds: 8,
            tx_power_lower_bound: -50,
            tx_power_upper_bound: 20,
            allowed_report_type_transitions: 2,
            native_buffer_key_size: 1000,
            matching_path: MatchingPathKind::Managed,
            use_matching_filter: true,
            lookup_false_positive_rate: 0.001,
            aggregate_sightings: false,
            store_results_in_transaction: true,
            enable_recursive_report_type: false,
            support_report_type_transitions: true,
            store_matches_for_revoked_keys: false,
            privileged_token: None,
            report_type_when_missing: ReportType::ConfirmedTest,
            verbose_matching_logs: false,
            rpik_hkdf_info: RPIK_HKDF_INFO.to_string(),
            aemk_hkdf_info: AEMK_HKDF_INFO.to_string(),
            rpi_padded_prefix: RPI_PADDED_PREFIX.to_string(),
            sub_key_size_bytes: SUB_KEY_SIZE,
            contact_id_length: ROLLING_PROXIMITY_ID_LENGTH,
            tracing: TracingParams::default(),
        }
    }
}

impl MatchingConfig {
    /// Validate field ranges and cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id_rolling_period_minutes == 0
            || self.id_rolling_period_minutes > IntervalClock::MAX_ID_ROLLING_PERIOD_MINUTES
        {
            return Err(ConfigError::new(
                "id_rolling_period_minutes",
                format!("must be in 1..={}", IntervalClock::MAX_ID_ROLLING_PERIOD_MINUTES),
            ));
        }
        if self
            .scan_time_seconds
            .checked_add(self.scan_time_extend_seconds)
            .is_none()
        {
            return Err(ConfigError::new(
                "scan_time_extend_seconds",
                "scan time plus extension must fit a u32",
            ));
        }
        if self.key_rolling_period_intervals == 0
            || self.key_rolling_period_intervals > MAX_INTERVALS_PER_KEY
        {
            return Err(ConfigError::new(
                "key_rolling_period_intervals",
                format!("must be in 1..={}", MAX_INTERVALS_PER_KEY),
            ));
        }
        if self.clock_drift_rolling_periods >= self.key_rolling_period_intervals {
            return Err(ConfigError::new(
                "clock_drift_rolling_periods",
                "must be shorter than a full rolling period",
            ));
        }
        if self.tx_power_lower_bound > self.tx_power_upper_bound {
            return Err(ConfigError::new(
                "tx_power_lower_bound",
                "must not exceed tx_power_upper_bound",
            ));
        }
        let i8_range = i8::MIN as i32..=i8::MAX as i32;
        if !i8_range.contains(&self.tx_power_lower_bound) || !i8_range.contains(&self.tx_power_upper_bound) {
            return Err(ConfigError::new("tx_power_upper_bound", "must fit a signed byte"));
        }
        if self.native_buffer_key_size == 0 {
            return Err(ConfigError::new("native_buffer_key_size", "must be positive"));
        }
        if !(self.lookup_false_positive_rate > 0.0 && self.lookup_false_positive_rate < 1.0) {
            return Err(ConfigError::new("lookup_false_positive_rate", "must be in (0, 1)"));
        }
        if self.sub_key_size_bytes != SUB_KEY_SIZE {
            return Err(ConfigError::new(
                "sub_key_size_bytes",
                format!("only {}-byte sub-keys are supported", SUB_KEY_SIZE),
            ));
        }
        if self.contact_id_length != ROLLING_PROXIMITY_ID_LENGTH {
            return Err(ConfigError::new(
                "contact_id_length",
                format!("only {}-byte identifiers are supported", ROLLING_PROXIMITY_ID_LENGTH),
            ));
        }
        if self.rpi_padded_prefix.len() > 12 {
            return Err(ConfigError::new("rpi_padded_prefix", "must be at most 12 bytes"));
        }
        if self.tracing.bucket_minutes == 0 {
            return Err(ConfigError::new("tracing.bucket_minutes", "must be positive"));
        }
        Ok(())
    }

    pub fn interval_clock(&self) -> Result<IntervalClock, ConfigError> {
        IntervalClock::new(self.id_rolling_period_minutes, self.key_rolling_period_intervals)
            .map_err(|e| ConfigError::new("id_rolling_period_minutes", e.to_string()))
    }

    pub fn derivation_params(&self) -> DerivationParams {
        DerivationParams {
            rpik_info: self.rpik_hkdf_info.clone(),
            aemk_info: self.aemk_hkdf_info.clone(),
            padded_prefix: self.rpi_padded_prefix.clone(),
            sub_key_size: self.sub_key_size_bytes,
        }
    }

    /// Gap (seconds) after which the next sighting starts a new scan group.
    pub fn aggregation_gap_seconds(&self) -> f64 {
        1.5 * (f64::from(self.scan_time_seconds) + f64::from(self.scan_time_extend_seconds))
    }

    pub fn tx_power_range(&self) -> RangeInclusive<i32> {
        self.tx_power_lower_bound..=self.tx_power_upper_bound
    }

    /// Whether `token` is the configured privileged token.
    pub fn is_privileged_token(&self, token: &str) -> bool {
        self.privileged_token.as_deref() == Some(token)
    }

    /// Defaults overridden from `EN_*` environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `EN_CLOCK_DRIFT_ROLLING_PERIODS`, `EN_ID_ROLLING_PERIOD_MINUTES`
    /// - `EN_SCAN_TIME_SECONDS`, `EN_SCAN_TIME_EXTEND_SECONDS`
    /// - `EN_TX_POWER_LOWER_BOUND`, `EN_TX_POWER_UPPER_BOUND`
    /// - `EN_ALLOWED_REPORT_TYPE_TRANSITIONS`, `EN_NATIVE_BUFFER_KEY_SIZE`
    /// - `EN_MATCHING_PATH` (`managed`, `managed_prefilter`, `accelerated`)
    /// - `EN_USE_MATCHING_FILTER`, `EN_LOOKUP_FALSE_POSITIVE_RATE`
    /// - `EN_AGGREGATE_SIGHTINGS`, `EN_STORE_RESULTS_IN_TRANSACTION`
    /// - `EN_ENABLE_RECURSIVE_REPORT_TYPE`, `EN_SUPPORT_REPORT_TYPE_TRANSITIONS`
    /// - `EN_STORE_MATCHES_FOR_REVOKED_KEYS`, `EN_PRIVILEGED_TOKEN`
    /// - `EN_REPORT_TYPE_WHEN_MISSING` (wire value, e.g. `1`)
    /// - `EN_VERBOSE_MATCHING_LOGS`
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let lookup = &lookup;

        override_parsed(lookup, "EN_CLOCK_DRIFT_ROLLING_PERIODS", &mut config.clock_drift_rolling_periods);
        override_parsed(lookup, "EN_ID_ROLLING_PERIOD_MINUTES", &mut config.id_rolling_period_minutes);
        override_parsed(lookup, "EN_SCAN_TIME_SECONDS", &mut config.scan_time_seconds);
        override_parsed(lookup, "EN_SCAN_TIME_EXTEND_SECONDS", &mut config.scan_time_extend_seconds);
        override_parsed(lookup, "EN_TX_POWER_LOWER_BOUND", &mut config.tx_power_lower_bound);
        override_parsed(lookup, "EN_TX_POWER_UPPER_BOUND", &mut config.tx_power_upper_bound);
        override_parsed(
            lookup,
            "EN_ALLOWED_REPORT_TYPE_TRANSITIONS",
            &mut config.allowed_report_type_transitions,
        );
        override_parsed(lookup, "EN_NATIVE_BUFFER_KEY_SIZE", &mut config.native_buffer_key_size);
        override_parsed(lookup, "EN_MATCHING_PATH", &mut config.matching_path);
        override_flag(lookup, "EN_USE_MATCHING_FILTER", &mut config.use_matching_filter);
        override_parsed(
            lookup,
            "EN_LOOKUP_FALSE_POSITIVE_RATE",
            &mut config.lookup_false_positive_rate,
        );
        override_flag(lookup, "EN_AGGREGATE_SIGHTINGS", &mut config.aggregate_sightings);
        override_flag(
            lookup,
            "EN_STORE_RESULTS_IN_TRANSACTION",
            &mut config.store_results_in_transaction,
        );
        override_flag(
            lookup,
            "EN_ENABLE_RECURSIVE_REPORT_TYPE",
            &mut config.enable_recursive_report_type,
        );
        override_flag(
            lookup,
            "EN_SUPPORT_REPORT_TYPE_TRANSITIONS",
            &mut config.support_report_type_transitions,
        );
        override_flag(
            lookup,
            "EN_STORE_MATCHES_FOR_REVOKED_KEYS",
            &mut config.store_matches_for_revoked_keys,
        );
        override_flag(lookup, "EN_VERBOSE_MATCHING_LOGS", &mut config.verbose_matching_logs);

        if let Some(token) = lookup("EN_PRIVILEGED_TOKEN").filter(|t| !t.is_empty()) {
            config.privileged_token = Some(token);
        }
        if let Some(raw) = lookup("EN_REPORT_TYPE_WHEN_MISSING") {
            match raw.parse::<i32>().ok().and_then(ReportType::from_value) {
                Some(report_type) => config.report_type_when_missing = report_type,
                None => warn!(variable = "EN_REPORT_TYPE_WHEN_MISSING", value = %raw, "Ignoring unparsable value"),
            }
        }

        config
    }
}

fn override_parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, field: &mut T) {
    if let Some(raw) = lookup(name) {
        match raw.trim().parse() {
            Ok(value) => *field = value,
            Err(_) => warn!(variable = name, value = %raw, "Ignoring unparsable value"),
        }
    }
}

fn override_flag(lookup: &impl Fn(&str) -> Option<String>, name: &str, field: &mut bool) {
    if let Some(raw) = lookup(name) {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => *field = true,
            "0" | "false" | "no" | "off" => *field = false,
            _ => warn!(variable = name, value = %raw, "Ignoring unparsable flag"),
        }
    }
}

/// Builder for MatchingConfig with validation
#[derive(Default)]
pub struct MatchingConfigBuilder {
    config: MatchingConfig,
}

impl MatchingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: MatchingConfig) -> Self {
        Self { config }
    }

    pub fn clock_drift_rolling_periods(mut self, periods: u32) -> Self {
        self.config.clock_drift_rolling_periods = periods;
        self
    }

    pub fn id_rolling_period_minutes(mut self, minutes: u32) -> Self {
        self.config.id_rolling_period_minutes = minutes;
        self
    }

    pub fn scan_time(mut self, scan_seconds: u32, extend_seconds: u32) -> Self {
        self.config.scan_time_seconds = scan_seconds;
        self.config.scan_time_extend_seconds = extend_seconds;
        self
    }

    pub fn tx_power_range(mut self, lower: i32, upper: i32) -> Self {
        self.config.tx_power_lower_bound = lower;
        self.config.tx_power_upper_bound = upper;
        self
    }

    pub fn allowed_report_type_transitions(mut self, cap: u32) -> Self {
        self.config.allowed_report_type_transitions = cap;
        self
    }

    pub fn native_buffer_key_size(mut self, keys: usize) -> Self {
        self.config.native_buffer_key_size = keys;
        self
    }

    pub fn matching_path(mut self, path: MatchingPathKind) -> Self {
        self.config.matching_path = path;
        self
    }

    pub fn use_matching_filter(mut self, enabled: bool) -> Self {
        self.config.use_matching_filter = enabled;
        self
    }

    pub fn lookup_false_positive_rate(mut self, fpr: f64) -> Self {
        self.config.lookup_false_positive_rate = fpr;
        self
    }

    pub fn aggregate_sightings(mut self, enabled: bool) -> Self {
        self.config.aggregate_sightings = enabled;
        self
    }

    pub fn store_results_in_transaction(mut self, enabled: bool) -> Self {
        self.config.store_results_in_transaction = enabled;
        self
    }

    pub fn enable_recursive_report_type(mut self, enabled: bool) -> Self {
        self.config.enable_recursive_report_type = enabled;
        self
    }

    pub fn support_report_type_transitions(mut self, enabled: bool) -> Self {
        self.config.support_report_type_transitions = enabled;
        self
    }

    pub fn store_matches_for_revoked_keys(mut self, enabled: bool) -> Self {
        self.config.store_matches_for_revoked_keys = enabled;
        self
    }

    pub fn privileged_token(mut self, token: impl Into<String>) -> Self {
        self.config.privileged_token = Some(token.into());
        self
    }

    pub fn report_type_when_missing(mut self, report_type: ReportType) -> Self {
        self.config.report_type_when_missing = report_type;
        self
    }

    pub fn verbose_matching_logs(mut self, enabled: bool) -> Self {
        self.config.verbose_matching_logs = enabled;
        self
    }

    pub fn tracing_params(mut self, params: TracingParams) -> Self {
        self.config.tracing = params;
        self
    }

    /// Build the configuration, validating all parameters
    pub fn build(self) -> Result<MatchingConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build without validation (for internal use)
    pub fn build_unchecked(self) -> MatchingConfig {
        self.config
    }
}
