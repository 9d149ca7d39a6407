//! Outbound ports.
//!
//! Store handles are scoped: a [`StoreProvider`] opens them at run start and
//! dropping a handle releases it. A result store handle dropped with held
//! writes discards them.

use serde::{Deserialize, Serialize};
use shared_types::{
    CompletedMatchingRequestRecord, ContactRecord, DayNumber, DiagnosisKey, ExposureResult,
    ExposureWindow, KeyIdentity, PackageRoot, RollingProximityId, TokenRoot,
};

use crate::error::StorageError;

// =============================================================================
// STORES
// =============================================================================

/// Read access to recorded sightings.
pub trait ContactStore: Send {
    /// Sightings of `proximity_id` recorded on `day`.
    fn get_record(
        &self,
        day: DayNumber,
        proximity_id: &RollingProximityId,
    ) -> Result<Option<ContactRecord>, StorageError>;

    /// Every stored identifier, as raw bytes.
    fn get_all_raw_ids(&self) -> Result<Vec<Vec<u8>>, StorageError>;
}

/// Exposure results, keyed by (token root, key bytes).
pub trait ExposureResultStore: Send {
    fn has_result(&self, token_root: &TokenRoot, key_data: &[u8]) -> Result<bool, StorageError>;

    /// Reads see writes held for the pending transaction.
    fn get_result(
        &self,
        token_root: &TokenRoot,
        key_data: &[u8],
    ) -> Result<Option<ExposureResult>, StorageError>;

    /// Store or replace a result. With `hold_for_transaction` the write only
    /// becomes durable on [`Self::commit_transaction`].
    fn store_result(
        &mut self,
        token_root: &TokenRoot,
        key_data: &[u8],
        result: &ExposureResult,
        hold_for_transaction: bool,
    ) -> Result<bool, StorageError>;

    fn commit_transaction(&mut self) -> Result<(), StorageError>;

    fn record_completed_request(
        &mut self,
        token_root: &TokenRoot,
        record: CompletedMatchingRequestRecord,
    ) -> Result<(), StorageError>;
}

/// Rolling periods of keys attempted before, per calling app.
pub trait AttemptedKeyStore: Send {
    /// Whether `identity` was attempted with a rolling period other than
    /// `rolling_period`. Unknown identities never changed.
    fn rolling_period_changed(
        &self,
        package_root: &PackageRoot,
        identity: &KeyIdentity,
        rolling_period: u32,
    ) -> Result<bool, StorageError>;

    fn store_attempted_key_rolling_period(
        &mut self,
        package_root: &PackageRoot,
        identity: &KeyIdentity,
        rolling_period: u32,
    ) -> Result<(), StorageError>;
}

/// Opens scoped store handles for one run.
pub trait StoreProvider: Send + Sync {
    type Contacts: ContactStore;
    type Results: ExposureResultStore;
    type Attempted: AttemptedKeyStore;

    fn open_contact_store(&self) -> Result<Self::Contacts, StorageError>;
    fn open_result_store(&self) -> Result<Self::Results, StorageError>;
    fn open_attempted_key_store(&self) -> Result<Self::Attempted, StorageError>;
}

// =============================================================================
// RISK ENGINE / GEO / TIME
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub exposure_minutes: u32,
    pub risk_score: u32,
}

/// External risk engine. `None` means no qualifying exposure.
pub trait RiskScorer: Send + Sync {
    fn score(&self, key: &DiagnosisKey, windows: &[ExposureWindow]) -> Option<RiskAssessment>;
}

/// Location-aware candidate restriction.
pub trait GeoCellFilter: Send + Sync {
    fn admits(&self, key: &DiagnosisKey) -> bool;
}

/// Time source abstraction for testability.
pub trait TimeSource: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}
