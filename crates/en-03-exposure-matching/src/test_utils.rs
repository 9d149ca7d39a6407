//! Deterministic keys and sightings for tests.
//!
//! Sightings are built from the real derivation, so they match exactly the
//! identifier and metadata a key broadcast in a given interval.

use en_01_proximity_ids::{AssociatedEncryptedMetadataGenerator, ProximityIdFactory, AEMK_HKDF_INFO};
use shared_types::{
    BluetoothMetadata, CalibrationConfidence, DayNumber, DiagnosisKey, GeneratedProximityId,
    IntervalClock, RollingProximityId, SightingRecord,
};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::adapters::InMemoryStores;
use crate::ports::outbound::TimeSource;

/// 2021-05-03.
pub const TEST_DAY: DayNumber = DayNumber(18_750);

pub fn day_start_interval(day: DayNumber) -> u32 {
    IntervalClock::default().first_interval_of_day(day)
}

/// 16 key bytes derived from `seed`.
pub fn test_key_bytes(seed: u8) -> Vec<u8> {
    (0..16u8)
        .map(|i| seed.wrapping_mul(37).wrapping_add(i.wrapping_mul(11)) ^ 0x5C)
        .collect()
}

/// Full-day key starting on `day`.
pub fn test_key_on_day(seed: u8, day: DayNumber) -> DiagnosisKey {
    DiagnosisKey::new(test_key_bytes(seed), day_start_interval(day), 144)
}

/// The 144 identifiers of `key`'s maximum rolling period.
pub fn generated_ids(key: &DiagnosisKey) -> Vec<GeneratedProximityId> {
    ProximityIdFactory::default()
        .generator()
        .generate(key.key_data(), key.rolling_start_interval_number(), 144, None)
        .expect("test key derives")
}

/// Identifier of `key` in `interval` and a sighting of it at `epoch_seconds`.
pub fn sighting_for(
    key: &DiagnosisKey,
    interval: u32,
    epoch_seconds: u32,
    rssi: i32,
    metadata: BluetoothMetadata,
) -> (RollingProximityId, SightingRecord) {
    let mut generator = ProximityIdFactory::default().generator();
    let generated = generator
        .generate(key.key_data(), interval, 1, None)
        .expect("test key derives");
    let proximity_id = generated[0].proximity_id;
    let aem = AssociatedEncryptedMetadataGenerator::new(key.key_data(), AEMK_HKDF_INFO.as_bytes())
        .and_then(|g| g.encrypt(&proximity_id, &metadata))
        .expect("metadata encrypts");
    (
        proximity_id,
        SightingRecord::new(epoch_seconds, rssi, aem.as_bytes().to_vec()),
    )
}

/// Record a sighting of `key`'s `interval` identifier, filed under the day
/// of `epoch_seconds`.
pub fn record_sighting(
    stores: &InMemoryStores,
    key: &DiagnosisKey,
    interval: u32,
    epoch_seconds: u32,
    rssi: i32,
    tx_power: i8,
) {
    let metadata = BluetoothMetadata::new(tx_power, CalibrationConfidence::Medium);
    let (id, sighting) = sighting_for(key, interval, epoch_seconds, rssi, metadata);
    let day = IntervalClock::default().day_for_epoch_seconds(epoch_seconds);
    stores.add_sighting(day, id, sighting);
}

/// Record a sighting at the start of `key`'s interval `offset`.
pub fn record_sighting_at_offset(stores: &InMemoryStores, key: &DiagnosisKey, offset: u32) {
    let interval = key.rolling_start_interval_number() + offset;
    record_sighting(stores, key, interval, interval * 600, -60, -10);
}

/// Settable clock.
#[derive(Debug, Default)]
pub struct FixedTimeSource {
    millis: AtomicU64,
}

impl FixedTimeSource {
    pub fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl TimeSource for FixedTimeSource {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}
