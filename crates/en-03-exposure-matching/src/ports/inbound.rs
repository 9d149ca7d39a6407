//! Inbound port.

use crate::domain::{MatchingRequest, TraceReport, TracerState};
use crate::error::MatchingError;

/// Primary API for running exposure matching.
pub trait ExposureMatchingApi: Send + Sync {
    /// Match every key of `request`, strictly in order.
    ///
    /// Returns normally for both `Completed` and `Stopped` runs.
    ///
    /// # Errors
    ///
    /// - `Storage` if a store fails; results committed before the failure stay
    /// - `Crypto` for derivation-context failures
    /// - `AlreadyRunning` if this instance is already running
    fn trace(&self, request: &MatchingRequest) -> Result<TraceReport, MatchingError>;

    /// Request cooperative cancellation of the current run.
    fn stop(&self);

    fn state(&self) -> TracerState;
}
