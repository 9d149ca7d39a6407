//! Per-run report and tracer state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProtocolViolation;

/// Lifecycle of a tracer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TracerState {
    #[default]
    Idle,
    Running,
    Completed,
    Stopped,
    Failed,
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Completed,
    Stopped,
}

impl From<RunOutcome> for TracerState {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed => TracerState::Completed,
            RunOutcome::Stopped => TracerState::Stopped,
        }
    }
}

/// Why a diagnosis key did not go through full matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyMatched,
    InvalidTransition,
    TransitionLimitReached,
    InvalidRollingPeriod,
    RollingPeriodChanged,
    RecursiveDisabled,
    ReportTypeNotAllowed,
    GeoFiltered,
    PrefilteredOut,
    CryptoFailure,
}

impl From<&ProtocolViolation> for SkipReason {
    fn from(violation: &ProtocolViolation) -> Self {
        match violation {
            ProtocolViolation::RollingPeriodChanged { .. } => SkipReason::RollingPeriodChanged,
            ProtocolViolation::InvalidRollingPeriod { .. } => SkipReason::InvalidRollingPeriod,
            ProtocolViolation::RecursiveReportDisabled => SkipReason::RecursiveDisabled,
            ProtocolViolation::ReportTypeNotAllowed { .. } => SkipReason::ReportTypeNotAllowed,
            ProtocolViolation::InvalidTransition { .. } => SkipReason::InvalidTransition,
            ProtocolViolation::TransitionLimitReached { .. } => SkipReason::TransitionLimitReached,
        }
    }
}

/// Count of skipped keys per reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipTally {
    pub already_matched: u32,
    pub invalid_transition: u32,
    pub transition_limit_reached: u32,
    pub invalid_rolling_period: u32,
    pub rolling_period_changed: u32,
    pub recursive_disabled: u32,
    pub report_type_not_allowed: u32,
    pub geo_filtered: u32,
    pub prefiltered_out: u32,
    pub crypto_failure: u32,
}

impl SkipTally {
    pub fn record(&mut self, reason: SkipReason) {
        let counter = match reason {
            SkipReason::AlreadyMatched => &mut self.already_matched,
            SkipReason::InvalidTransition => &mut self.invalid_transition,
            SkipReason::TransitionLimitReached => &mut self.transition_limit_reached,
            SkipReason::InvalidRollingPeriod => &mut self.invalid_rolling_period,
            SkipReason::RollingPeriodChanged => &mut self.rolling_period_changed,
            SkipReason::RecursiveDisabled => &mut self.recursive_disabled,
            SkipReason::ReportTypeNotAllowed => &mut self.report_type_not_allowed,
            SkipReason::GeoFiltered => &mut self.geo_filtered,
            SkipReason::PrefilteredOut => &mut self.prefiltered_out,
            SkipReason::CryptoFailure => &mut self.crypto_failure,
        };
        *counter += 1;
    }

    pub fn get(&self, reason: SkipReason) -> u32 {
        match reason {
            SkipReason::AlreadyMatched => self.already_matched,
            SkipReason::InvalidTransition => self.invalid_transition,
            SkipReason::TransitionLimitReached => self.transition_limit_reached,
            SkipReason::InvalidRollingPeriod => self.invalid_rolling_period,
            SkipReason::RollingPeriodChanged => self.rolling_period_changed,
            SkipReason::RecursiveDisabled => self.recursive_disabled,
            SkipReason::ReportTypeNotAllowed => self.report_type_not_allowed,
            SkipReason::GeoFiltered => self.geo_filtered,
            SkipReason::PrefilteredOut => self.prefiltered_out,
            SkipReason::CryptoFailure => self.crypto_failure,
        }
    }

    pub fn total(&self) -> u32 {
        self.already_matched
            + self.invalid_transition
            + self.transition_limit_reached
            + self.invalid_rolling_period
            + self.rolling_period_changed
            + self.recursive_disabled
            + self.report_type_not_allowed
            + self.geo_filtered
            + self.prefiltered_out
            + self.crypto_failure
    }
}

/// Summary returned by every run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceReport {
    pub run_id: Uuid,
    pub outcome: RunOutcome,
    pub diagnosis_key_count: u32,
    pub processed_keys: u32,
    /// New results stored, excluding transitions.
    pub matches_found: u32,
    pub transitions_applied: u32,
    pub skipped: SkipTally,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_records_each_reason() {
        let mut tally = SkipTally::default();
        tally.record(SkipReason::AlreadyMatched);
        tally.record(SkipReason::AlreadyMatched);
        tally.record(SkipReason::CryptoFailure);

        assert_eq!(tally.get(SkipReason::AlreadyMatched), 2);
        assert_eq!(tally.get(SkipReason::CryptoFailure), 1);
        assert_eq!(tally.get(SkipReason::GeoFiltered), 0);
        assert_eq!(tally.total(), 3);
    }

    #[test]
    fn test_violation_maps_to_reason() {
        let reason = SkipReason::from(&ProtocolViolation::RollingPeriodChanged { rolling_period: 100 });
        assert_eq!(reason, SkipReason::RollingPeriodChanged);
    }

    #[test]
    fn test_report_serializes() {
        let report = TraceReport {
            run_id: Uuid::nil(),
            outcome: RunOutcome::Stopped,
            diagnosis_key_count: 3,
            processed_keys: 1,
            matches_found: 0,
            transitions_applied: 0,
            skipped: SkipTally::default(),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"outcome\":\"Stopped\""));
        assert!(json.contains("\"prefiltered_out\":0"));
    }
}
