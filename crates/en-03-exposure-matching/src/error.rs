//! Error types for exposure matching.
//!
//! | Type | Scope | Effect on the run |
//! |------|-------|-------------------|
//! | `ProtocolViolation` | one key | key skipped, counted in the report |
//! | `CryptoError` (per key) | one key | key skipped, counted in the report |
//! | `CryptoError` (context) | run | run fails |
//! | `StorageError` | run | run fails; committed results stay valid |

use shared_crypto::CryptoError;
use shared_types::ReportType;
use thiserror::Error;

use en_02_contact_filter::FilterError;

/// Failures of the contact, result or attempted-key stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store I/O error: {0}")]
    Io(String),

    #[error("Store data corrupt: {0}")]
    Corrupt(String),

    #[error("Transaction commit failed: {0}")]
    CommitFailed(String),
}

/// A diagnosis key that must not be matched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("Rolling period changed to {rolling_period} for an already attempted key")]
    RollingPeriodChanged { rolling_period: u32 },

    #[error("Invalid rolling period {rolling_period} (must be in 1..={max})")]
    InvalidRollingPeriod { rolling_period: u32, max: u32 },

    #[error("RECURSIVE report type is disabled")]
    RecursiveReportDisabled,

    #[error("Report type {report_type:?} is not matched")]
    ReportTypeNotAllowed { report_type: ReportType },

    #[error("Invalid report type transition {from:?} -> {to:?}")]
    InvalidTransition { from: ReportType, to: ReportType },

    #[error("Report type transition limit reached ({count}/{cap})")]
    TransitionLimitReached { count: u32, cap: u32 },
}

/// Configuration validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid configuration field {field}: {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}

impl ConfigError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Run-level matching failure.
#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("A matching run is already in progress on this tracer")]
    AlreadyRunning,
}

impl MatchingError {
    /// Whether the error only concerns the key being processed.
    pub fn is_per_key(&self) -> bool {
        matches!(self, MatchingError::Crypto(e) if !e.is_context_failure())
    }
}
