//! Report-type transitions of stored results.
//!
//! | Stored | May become |
//! |--------|------------|
//! | SELF_REPORT | CONFIRMED_TEST, CONFIRMED_CLINICAL_DIAGNOSIS, REVOKED |
//! | CONFIRMED_CLINICAL_DIAGNOSIS | CONFIRMED_TEST, REVOKED |
//! | anything else | nothing |

use shared_types::{ExposureResult, ReportType};

use crate::error::ProtocolViolation;

/// Outcome of re-submitting a key that already has a stored result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionDecision {
    /// Same report type: nothing to do.
    AlreadyMatched,
    /// Store this re-tagged result in place of the old one.
    Apply(ExposureResult),
    /// The transition is not allowed.
    Rejected(ProtocolViolation),
}

#[derive(Debug, Clone)]
pub struct TransitionTable {
    cap: u32,
}

impl TransitionTable {
    const FROM_SELF_REPORT: &'static [ReportType] = &[
        ReportType::ConfirmedTest,
        ReportType::ConfirmedClinicalDiagnosis,
        ReportType::Revoked,
    ];
    const FROM_CLINICAL: &'static [ReportType] = &[ReportType::ConfirmedTest, ReportType::Revoked];

    /// `cap` bounds a result's transition count.
    pub fn new(cap: u32) -> Self {
        Self { cap }
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    /// Report types a stored `from` may move to.
    pub fn allowed_from(from: ReportType) -> &'static [ReportType] {
        match from {
            ReportType::SelfReport => Self::FROM_SELF_REPORT,
            ReportType::ConfirmedClinicalDiagnosis => Self::FROM_CLINICAL,
            _ => &[],
        }
    }

    pub fn is_allowed(from: ReportType, to: ReportType) -> bool {
        Self::allowed_from(from).contains(&to)
    }

    pub fn evaluate(&self, stored: &ExposureResult, incoming: ReportType) -> TransitionDecision {
        let from = stored.report_type;
        if from == incoming {
            return TransitionDecision::AlreadyMatched;
        }
        if !Self::is_allowed(from, incoming) {
            return TransitionDecision::Rejected(ProtocolViolation::InvalidTransition {
                from,
                to: incoming,
            });
        }
        if stored.report_type_transition_count >= self.cap {
            return TransitionDecision::Rejected(ProtocolViolation::TransitionLimitReached {
                count: stored.report_type_transition_count,
                cap: self.cap,
            });
        }
        TransitionDecision::Apply(stored.transitioned_to(incoming))
    }
}
