//! Exposure evaluator.
//!
//! Turns a key's valid sightings into exposure windows and asks the risk
//! engine whether they amount to an exposure. Deterministic for a given
//! input.

use shared_types::{
    DiagnosisKey, ExposureResult, ExposureWindow, IntervalClock, ReportType, ScanInstance,
    SightingWithMetadata,
};
use std::sync::Arc;

use crate::domain::{MatchingConfig, TracingParams};
use crate::error::ConfigError;
use crate::ports::outbound::RiskScorer;

pub struct ExposureEvaluator {
    scorer: Arc<dyn RiskScorer>,
    params: TracingParams,
    clock: IntervalClock,
    scan_gap_seconds: f64,
    report_type_when_missing: ReportType,
}

impl ExposureEvaluator {
    pub fn new(config: &MatchingConfig, scorer: Arc<dyn RiskScorer>) -> Result<Self, ConfigError> {
        Ok(Self {
            scorer,
            params: config.tracing.clone(),
            clock: config.interval_clock()?,
            scan_gap_seconds: config.aggregation_gap_seconds(),
            report_type_when_missing: config.report_type_when_missing,
        })
    }

    /// Per-scan exposure windows, regardless of whether they qualify.
    ///
    /// `sightings` must be sorted by time. A gap longer than
    /// `window_gap_seconds` starts a new window; sightings closer than the
    /// scan gap form one scan.
    pub fn find_exposure_windows(
        &self,
        key: &DiagnosisKey,
        sightings: &[SightingWithMetadata],
    ) -> Vec<ExposureWindow> {
        let report_type = key.report_type().or_when_missing(self.report_type_when_missing);
        let window_gap = u64::from(self.params.window_gap_seconds);

        split_by_gap(sightings, |gap| u64::from(gap) > window_gap)
            .into_iter()
            .filter_map(|group| self.build_window(group, report_type))
            .collect()
    }

    /// `None` when there are no windows or the risk engine finds no exposure.
    pub fn find_exposures(
        &self,
        key: &DiagnosisKey,
        sightings: &[SightingWithMetadata],
    ) -> Option<ExposureResult> {
        let windows = self.find_exposure_windows(key, sightings);
        if windows.is_empty() {
            return None;
        }
        let assessment = self.scorer.score(key, &windows)?;
        Some(ExposureResult {
            key_data: key.key_data().to_vec(),
            rolling_start_interval_number: key.rolling_start_interval_number(),
            transmission_risk_level: key.transmission_risk_level(),
            report_type: key.report_type().or_when_missing(self.report_type_when_missing),
            exposure_windows: windows,
            raw_exposure_windows: Vec::new(),
            report_type_transition_count: 0,
            exposure_minutes: assessment.exposure_minutes,
            risk_score: assessment.risk_score,
        })
    }

    fn build_window(
        &self,
        sightings: &[SightingWithMetadata],
        report_type: ReportType,
    ) -> Option<ExposureWindow> {
        let first = sightings.first()?;
        let last = sightings.last()?;

        let scan_gap = self.scan_gap_seconds;
        let scan_instances: Vec<ScanInstance> = split_by_gap(sightings, |gap| f64::from(gap) > scan_gap)
            .into_iter()
            .filter_map(|scan| self.build_scan(scan))
            .collect();
        if scan_instances.is_empty() {
            return None;
        }

        let intervals = sightings.iter().map(|s| s.interval_number);
        Some(ExposureWindow {
            day_number: self.clock.day_for_epoch_seconds(first.epoch_seconds()),
            report_type,
            calibration_confidence: first.metadata.calibration_confidence,
            start_epoch_seconds: first.epoch_seconds(),
            end_epoch_seconds: last.epoch_seconds(),
            first_interval_number: intervals.clone().min().unwrap_or(0),
            last_interval_number: intervals.max().unwrap_or(0),
            scan_instances,
        })
    }

    fn build_scan(&self, sightings: &[SightingWithMetadata]) -> Option<ScanInstance> {
        let attenuations: Vec<i32> = sightings
            .iter()
            .filter_map(|s| s.sighting.rssi.map(|rssi| i32::from(s.metadata.tx_power) - rssi))
            .collect();
        let min_attenuation_db = *attenuations.iter().min()?;
        let sum: i64 = attenuations.iter().map(|&a| i64::from(a)).sum();
        let typical_attenuation_db = (sum as f64 / attenuations.len() as f64).round() as i32;

        let first = &sightings[0].sighting;
        let seconds_since_last_scan = if first.previous_scan_epoch_seconds > 0
            && first.previous_scan_epoch_seconds < first.epoch_seconds
        {
            (first.epoch_seconds - first.previous_scan_epoch_seconds)
                .min(self.params.max_seconds_since_last_scan)
        } else {
            self.params.default_seconds_since_last_scan
        };

        Some(ScanInstance {
            min_attenuation_db,
            typical_attenuation_db,
            seconds_since_last_scan,
        })
    }
}

/// Split time-sorted sightings wherever the gap to the previous one satisfies `breaks`.
fn split_by_gap(
    sightings: &[SightingWithMetadata],
    breaks: impl Fn(u32) -> bool,
) -> Vec<&[SightingWithMetadata]> {
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..sightings.len() {
        let gap = sightings[i]
            .epoch_seconds()
            .saturating_sub(sightings[i - 1].epoch_seconds());
        if breaks(gap) {
            groups.push(&sightings[start..i]);
            start = i;
        }
    }
    if start < sightings.len() {
        groups.push(&sightings[start..]);
    }
    groups
}
