//! # Core Domain Entities
//!
//! Defines the matching data model.
//!
//! ## Clusters
//!
//! - **Keys**: `DiagnosisKey`, `ReportType`, `KeyIdentity`
//! - **Identifiers**: `RollingProximityId`, `AssociatedEncryptedMetadata`,
//!   `GeneratedProximityId`
//! - **Sightings**: `SightingRecord`, `ContactRecord`, `BluetoothMetadata`,
//!   `SightingWithMetadata`
//! - **Results**: `ExposureResult`, `ExposureWindow`, `ScanInstance`,
//!   `CompletedMatchingRequestRecord`

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::errors::TypeError;
use crate::intervals::DayNumber;

/// Length of a diagnosis (temporary exposure) key in bytes.
pub const DIAGNOSIS_KEY_LENGTH: usize = 16;

/// Length of a rolling proximity identifier in bytes.
pub const ROLLING_PROXIMITY_ID_LENGTH: usize = 16;

/// Length of associated encrypted metadata in bytes.
pub const ASSOCIATED_METADATA_LENGTH: usize = 4;

// =============================================================================
// CLUSTER A: KEYS
// =============================================================================

/// Report type attached to a diagnosis key.
///
/// Numeric values follow the key export format, so ordering comparisons such
/// as "report type >= REVOKED" are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    /// Unset / missing report type.
    #[default]
    Unknown,
    /// Confirmed by a laboratory test.
    ConfirmedTest,
    /// Confirmed by a clinical diagnosis.
    ConfirmedClinicalDiagnosis,
    /// Self-reported, unconfirmed.
    SelfReport,
    /// Derived from a recursive (contact-of-contact) report.
    Recursive,
    /// Previously reported, now revoked.
    Revoked,
}

impl ReportType {
    /// Wire value of the report type.
    pub const fn value(self) -> i32 {
        match self {
            ReportType::Unknown => 0,
            ReportType::ConfirmedTest => 1,
            ReportType::ConfirmedClinicalDiagnosis => 2,
            ReportType::SelfReport => 3,
            ReportType::Recursive => 4,
            ReportType::Revoked => 5,
        }
    }

    /// Parse a wire value. Unrecognized values return `None`.
    pub const fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(ReportType::Unknown),
            1 => Some(ReportType::ConfirmedTest),
            2 => Some(ReportType::ConfirmedClinicalDiagnosis),
            3 => Some(ReportType::SelfReport),
            4 => Some(ReportType::Recursive),
            5 => Some(ReportType::Revoked),
            _ => None,
        }
    }

    /// Resolve an unset report type to the client's configured default.
    pub fn or_when_missing(self, when_missing: ReportType) -> ReportType {
        if self == ReportType::Unknown {
            when_missing
        } else {
            self
        }
    }
}

/// Identity of a diagnosis key: key bytes plus rolling start interval.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyIdentity {
    /// Raw key bytes.
    #[serde_as(as = "Hex")]
    pub key_data: Vec<u8>,
    /// First interval the key is valid for.
    pub rolling_start_interval_number: u32,
}

impl fmt::Debug for KeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KeyIdentity({}@{})",
            hex::encode(&self.key_data),
            self.rolling_start_interval_number
        )
    }
}

/// A diagnosis key released by a diagnosed user.
///
/// Immutable once constructed. Key bytes are not length-checked here; the
/// derivation layer rejects malformed key material.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiagnosisKey {
    #[serde_as(as = "Hex")]
    key_data: Vec<u8>,
    rolling_start_interval_number: u32,
    rolling_period: u32,
    #[serde(default)]
    transmission_risk_level: i32,
    #[serde(default)]
    report_type: ReportType,
}

impl DiagnosisKey {
    /// Create a key with the default risk level and an unset report type.
    pub fn new(key_data: impl Into<Vec<u8>>, rolling_start_interval_number: u32, rolling_period: u32) -> Self {
        Self {
            key_data: key_data.into(),
            rolling_start_interval_number,
            rolling_period,
            transmission_risk_level: 0,
            report_type: ReportType::Unknown,
        }
    }

    /// Builder-style method to set the report type.
    pub fn with_report_type(mut self, report_type: ReportType) -> Self {
        self.report_type = report_type;
        self
    }

    /// Builder-style method to set the transmission risk level.
    pub fn with_transmission_risk_level(mut self, level: i32) -> Self {
        self.transmission_risk_level = level;
        self
    }

    /// Builder-style method to replace the rolling period.
    pub fn with_rolling_period(mut self, rolling_period: u32) -> Self {
        self.rolling_period = rolling_period;
        self
    }

    pub fn key_data(&self) -> &[u8] {
        &self.key_data
    }

    pub fn rolling_start_interval_number(&self) -> u32 {
        self.rolling_start_interval_number
    }

    pub fn rolling_period(&self) -> u32 {
        self.rolling_period
    }

    pub fn transmission_risk_level(&self) -> i32 {
        self.transmission_risk_level
    }

    pub fn report_type(&self) -> ReportType {
        self.report_type
    }

    /// Identity used for dedupe and prefilter candidate sets.
    pub fn identity(&self) -> KeyIdentity {
        KeyIdentity {
            key_data: self.key_data.clone(),
            rolling_start_interval_number: self.rolling_start_interval_number,
        }
    }

    /// Last interval covered by the declared rolling period (inclusive).
    pub fn rolling_end_interval_number(&self) -> u32 {
        self.rolling_start_interval_number
            .saturating_add(self.rolling_period.max(1) - 1)
    }
}

impl fmt::Debug for DiagnosisKey {
    // Key bytes are elided; they are secret until published.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosisKey")
            .field("rolling_start_interval_number", &self.rolling_start_interval_number)
            .field("rolling_period", &self.rolling_period)
            .field("transmission_risk_level", &self.transmission_risk_level)
            .field("report_type", &self.report_type)
            .finish_non_exhaustive()
    }
}

/// SHA-256 over the identities of a batch of keys, in submission order.
pub fn key_batch_hash(keys: &[DiagnosisKey]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for key in keys {
        hasher.update((key.key_data.len() as u32).to_le_bytes());
        hasher.update(&key.key_data);
        hasher.update(key.rolling_start_interval_number.to_le_bytes());
    }
    hasher.finalize().into()
}

// =============================================================================
// CLUSTER B: IDENTIFIERS
// =============================================================================

/// A rolling proximity identifier as broadcast over the air.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RollingProximityId(#[serde_as(as = "Hex")] [u8; ROLLING_PROXIMITY_ID_LENGTH]);

impl RollingProximityId {
    pub const fn new(bytes: [u8; ROLLING_PROXIMITY_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Copy an identifier out of a slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let array: [u8; ROLLING_PROXIMITY_ID_LENGTH] =
            bytes.try_into().map_err(|_| TypeError::InvalidLength {
                what: "rolling proximity id",
                expected: ROLLING_PROXIMITY_ID_LENGTH,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; ROLLING_PROXIMITY_ID_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for RollingProximityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rpi({})", hex::encode(self.0))
    }
}

/// Encrypted Bluetooth metadata broadcast alongside an identifier.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssociatedEncryptedMetadata(#[serde_as(as = "Hex")] [u8; ASSOCIATED_METADATA_LENGTH]);

impl AssociatedEncryptedMetadata {
    pub const fn new(bytes: [u8; ASSOCIATED_METADATA_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let array: [u8; ASSOCIATED_METADATA_LENGTH] =
            bytes.try_into().map_err(|_| TypeError::InvalidLength {
                what: "associated encrypted metadata",
                expected: ASSOCIATED_METADATA_LENGTH,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; ASSOCIATED_METADATA_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for AssociatedEncryptedMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aem({})", hex::encode(self.0))
    }
}

/// An identifier derived from a diagnosis key for one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeneratedProximityId {
    /// The derived identifier.
    pub proximity_id: RollingProximityId,
    /// Encrypted metadata, present when the generator was given broadcast metadata.
    pub encrypted_metadata: Option<AssociatedEncryptedMetadata>,
    /// Interval number the identifier is broadcast in.
    pub interval_number: u32,
}

// =============================================================================
// CLUSTER C: SIGHTINGS
// =============================================================================

/// Calibration confidence of the advertiser's transmit power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalibrationConfidence {
    #[default]
    Lowest,
    Low,
    Medium,
    High,
}

impl CalibrationConfidence {
    pub const fn bits(self) -> u8 {
        match self {
            CalibrationConfidence::Lowest => 0,
            CalibrationConfidence::Low => 1,
            CalibrationConfidence::Medium => 2,
            CalibrationConfidence::High => 3,
        }
    }

    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => CalibrationConfidence::Lowest,
            1 => CalibrationConfidence::Low,
            2 => CalibrationConfidence::Medium,
            _ => CalibrationConfidence::High,
        }
    }
}

/// Plaintext Bluetooth metadata.
///
/// Layout (4 bytes):
/// - byte 0: version (major `01` in bits 7..6), calibration confidence in bits 3..2
/// - byte 1: transmit power, signed dBm
/// - bytes 2..3: reserved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct BluetoothMetadata {
    pub tx_power: i8,
    pub calibration_confidence: CalibrationConfidence,
}

impl BluetoothMetadata {
    const VERSION_BITS: u8 = 0b0100_0000;

    pub fn new(tx_power: i8, calibration_confidence: CalibrationConfidence) -> Self {
        Self {
            tx_power,
            calibration_confidence,
        }
    }

    pub fn to_bytes(&self) -> [u8; ASSOCIATED_METADATA_LENGTH] {
        [
            Self::VERSION_BITS | (self.calibration_confidence.bits() << 2),
            self.tx_power as u8,
            0,
            0,
        ]
    }

    pub fn from_bytes(bytes: &[u8; ASSOCIATED_METADATA_LENGTH]) -> Self {
        Self {
            tx_power: bytes[1] as i8,
            calibration_confidence: CalibrationConfidence::from_bits(bytes[0] >> 2),
        }
    }
}

/// A local record that an identifier was observed.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SightingRecord {
    /// Observation time, seconds since the Unix epoch.
    pub epoch_seconds: u32,
    /// Received signal strength, if the scanner reported one.
    pub rssi: Option<i32>,
    /// Metadata bytes as received over the air.
    #[serde_as(as = "Hex")]
    pub associated_encrypted_metadata: Vec<u8>,
    /// Start of the previous scan, seconds since the Unix epoch (0 if unknown).
    #[serde(default)]
    pub previous_scan_epoch_seconds: u32,
}

impl SightingRecord {
    pub fn new(epoch_seconds: u32, rssi: i32, associated_encrypted_metadata: impl Into<Vec<u8>>) -> Self {
        Self {
            epoch_seconds,
            rssi: Some(rssi),
            associated_encrypted_metadata: associated_encrypted_metadata.into(),
            previous_scan_epoch_seconds: 0,
        }
    }

    pub fn with_previous_scan(mut self, previous_scan_epoch_seconds: u32) -> Self {
        self.previous_scan_epoch_seconds = previous_scan_epoch_seconds;
        self
    }
}

/// All sightings of one identifier on one day, as kept by the contact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub day_number: DayNumber,
    pub proximity_id: RollingProximityId,
    pub sightings: Vec<SightingRecord>,
}

/// A validated sighting with its decrypted metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SightingWithMetadata {
    pub sighting: SightingRecord,
    pub metadata: BluetoothMetadata,
    /// Interval of the generated identifier that matched this sighting.
    pub interval_number: u32,
}

impl SightingWithMetadata {
    pub fn epoch_seconds(&self) -> u32 {
        self.sighting.epoch_seconds
    }
}

// =============================================================================
// CLUSTER D: RESULTS
// =============================================================================

/// One scan within an exposure window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanInstance {
    /// Attenuation (tx power - rssi) of the strongest sighting in the scan.
    pub min_attenuation_db: i32,
    /// Mean attenuation of the sightings in the scan.
    pub typical_attenuation_db: i32,
    /// Seconds the scan stands for.
    pub seconds_since_last_scan: u32,
}

/// A contiguous span of qualifying sightings attributed to one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureWindow {
    pub day_number: DayNumber,
    pub report_type: ReportType,
    pub calibration_confidence: CalibrationConfidence,
    pub start_epoch_seconds: u32,
    pub end_epoch_seconds: u32,
    pub first_interval_number: u32,
    pub last_interval_number: u32,
    pub scan_instances: Vec<ScanInstance>,
}

impl ExposureWindow {
    /// Whether the window includes sightings from the given interval.
    pub fn covers_interval(&self, interval_number: u32) -> bool {
        (self.first_interval_number..=self.last_interval_number).contains(&interval_number)
    }
}

/// Outcome of matching one diagnosis key.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureResult {
    #[serde_as(as = "Hex")]
    pub key_data: Vec<u8>,
    pub rolling_start_interval_number: u32,
    pub transmission_risk_level: i32,
    pub report_type: ReportType,
    pub exposure_windows: Vec<ExposureWindow>,
    /// Per-scan windows over non-aggregated sightings, only filled for the
    /// privileged token.
    #[serde(default)]
    pub raw_exposure_windows: Vec<ExposureWindow>,
    pub report_type_transition_count: u32,
    /// Bucketized exposure duration in minutes.
    pub exposure_minutes: u32,
    /// Score assigned by the risk engine.
    pub risk_score: u32,
}

impl ExposureResult {
    /// Copy of this result re-tagged with a new report type.
    ///
    /// Every stored window is re-tagged and the transition count increments.
    pub fn transitioned_to(&self, report_type: ReportType) -> Self {
        let mut updated = self.clone();
        updated.report_type = report_type;
        for window in updated
            .exposure_windows
            .iter_mut()
            .chain(updated.raw_exposure_windows.iter_mut())
        {
            window.report_type = report_type;
        }
        updated.report_type_transition_count += 1;
        updated
    }
}

/// Summary persisted after each matching request.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedMatchingRequestRecord {
    #[serde_as(as = "Hex")]
    pub key_batch_hash: [u8; 32],
    pub timestamp_millis: u64,
    pub key_count: u32,
    pub matches_count: u32,
}
