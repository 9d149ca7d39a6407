//! Sighting window resolver.
//!
//! For each generated identifier:
//!
//! 1. skip it when the lookup table rules it out
//! 2. fetch its records for every day the valid window touches
//! 3. sort by time and drop sightings outside the valid window
//! 4. drop replays: sightings more than two intervals after the first one
//! 5. optionally keep only the strongest sighting per scan group
//! 6. decrypt metadata with this identifier and drop out-of-range tx power
//!
//! Results of all identifiers are merged in ascending time order.

use en_01_proximity_ids::AssociatedEncryptedMetadataGenerator;
use en_02_contact_filter::ContactLookupTable;
use shared_types::{
    DayNumber, DiagnosisKey, GeneratedProximityId, IntervalClock, SightingRecord,
    SightingWithMetadata, ASSOCIATED_METADATA_LENGTH,
};
use std::ops::RangeInclusive;
use tracing::{debug, info};

use crate::domain::{MatchingConfig, ValidWindow};
use crate::error::{ConfigError, MatchingError};
use crate::ports::outbound::ContactStore;

/// Identifier reuse longer than this many intervals after the first
/// sighting is treated as a replay.
const REPLAY_WINDOW_INTERVALS: u64 = 2;

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub clock: IntervalClock,
    pub drift_intervals: u32,
    /// A sighting further than this from the previous one starts a new scan group.
    pub aggregation_gap_seconds: f64,
    pub tx_power_range: RangeInclusive<i32>,
    pub use_lookup_table: bool,
    pub aemk_info: String,
    pub verbose: bool,
}

impl ResolverSettings {
    pub fn from_config(config: &MatchingConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            clock: config.interval_clock()?,
            drift_intervals: config.clock_drift_rolling_periods,
            aggregation_gap_seconds: config.aggregation_gap_seconds(),
            tx_power_range: config.tx_power_range(),
            use_lookup_table: config.use_matching_filter,
            aemk_info: config.aemk_hkdf_info.clone(),
            verbose: config.verbose_matching_logs,
        })
    }
}

pub struct SightingWindowResolver<'a, C: ContactStore + ?Sized> {
    contacts: &'a C,
    lookup: &'a ContactLookupTable,
    settings: ResolverSettings,
}

impl<'a, C: ContactStore + ?Sized> SightingWindowResolver<'a, C> {
    pub fn new(contacts: &'a C, lookup: &'a ContactLookupTable, settings: ResolverSettings) -> Self {
        Self {
            contacts,
            lookup,
            settings,
        }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Valid sightings of `generated_ids`, ascending by time.
    ///
    /// # Errors
    ///
    /// - `Storage` if the contact store fails
    /// - `Crypto` if the metadata key cannot be derived from `key`
    pub fn fetch_valid_sightings(
        &self,
        key: &DiagnosisKey,
        generated_ids: &[GeneratedProximityId],
        aggregate: bool,
    ) -> Result<Vec<SightingWithMetadata>, MatchingError> {
        let clock = &self.settings.clock;
        let key_day = clock.day_for_interval(key.rolling_start_interval_number());
        let mut metadata_cipher: Option<AssociatedEncryptedMetadataGenerator> = None;
        let mut valid = Vec::new();

        for generated in generated_ids {
            let id_bytes = generated.proximity_id.as_bytes();
            if self.settings.use_lookup_table && !self.lookup.contains_candidate(id_bytes) {
                continue;
            }

            let window = ValidWindow::for_interval(
                generated.interval_number,
                self.settings.drift_intervals,
                clock,
            );
            let mut sightings = Vec::new();
            for day in window.days_to_fetch(key_day, clock) {
                if let Some(record) = self
                    .contacts
                    .get_record(DayNumber(day), &generated.proximity_id)?
                {
                    sightings.extend(record.sightings);
                }
            }
            if sightings.is_empty() {
                continue;
            }
            sightings.sort_by_key(|s| s.epoch_seconds);

            if self.settings.verbose {
                info!(
                    id = %hex::encode(id_bytes),
                    interval = generated.interval_number,
                    sightings = sightings.len(),
                    "Sightings found for identifier"
                );
            }

            sightings.retain(|s| {
                let inside = window.contains_epoch_seconds(s.epoch_seconds);
                if !inside {
                    debug!(
                        epoch_seconds = s.epoch_seconds,
                        window_start = window.start_epoch_seconds(),
                        window_end = window.end_epoch_seconds_exclusive(),
                        "Discarding sighting outside valid window"
                    );
                }
                inside
            });
            self.drop_replays(&mut sightings);
            if aggregate {
                sightings = aggregate_scan_groups(sightings, self.settings.aggregation_gap_seconds);
            }
            if sightings.is_empty() {
                continue;
            }

            if metadata_cipher.is_none() {
                metadata_cipher = Some(AssociatedEncryptedMetadataGenerator::new(
                    key.key_data(),
                    self.settings.aemk_info.as_bytes(),
                )?);
            }
            let Some(cipher) = metadata_cipher.as_ref() else {
                continue;
            };

            for sighting in sightings {
                if sighting.rssi.is_none()
                    || sighting.associated_encrypted_metadata.len() != ASSOCIATED_METADATA_LENGTH
                {
                    debug!(
                        epoch_seconds = sighting.epoch_seconds,
                        metadata_len = sighting.associated_encrypted_metadata.len(),
                        "Discarding sighting without signal strength or well-formed metadata"
                    );
                    continue;
                }
                let metadata = match cipher
                    .decrypt(&generated.proximity_id, &sighting.associated_encrypted_metadata)
                {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        debug!(error = %e, "Discarding sighting with undecryptable metadata");
                        continue;
                    }
                };
                if !self
                    .settings
                    .tx_power_range
                    .contains(&i32::from(metadata.tx_power))
                {
                    debug!(tx_power = metadata.tx_power, "Discarding sighting with out-of-range tx power");
                    continue;
                }
                valid.push(SightingWithMetadata {
                    sighting,
                    metadata,
                    interval_number: generated.interval_number,
                });
            }
        }

        valid.sort_by_key(|s| s.epoch_seconds());
        Ok(valid)
    }

    fn drop_replays(&self, sightings: &mut Vec<SightingRecord>) {
        let Some(anchor) = sightings.first().map(|s| u64::from(s.epoch_seconds)) else {
            return;
        };
        let limit = anchor + REPLAY_WINDOW_INTERVALS * u64::from(self.settings.clock.interval_seconds());
        let before = sightings.len();
        sightings.retain(|s| u64::from(s.epoch_seconds) <= limit);
        if sightings.len() < before {
            debug!(dropped = before - sightings.len(), "Discarding replayed sightings");
        }
    }
}

/// Keep the strongest sighting of each scan group. Input must be sorted by
/// time; a sighting without RSSI ranks lowest.
fn aggregate_scan_groups(sightings: Vec<SightingRecord>, gap_seconds: f64) -> Vec<SightingRecord> {
    let mut kept: Vec<SightingRecord> = Vec::with_capacity(sightings.len());
    let mut previous: Option<u32> = None;
    for sighting in sightings {
        let new_group = previous
            .map(|p| f64::from(sighting.epoch_seconds - p) > gap_seconds)
            .unwrap_or(true);
        previous = Some(sighting.epoch_seconds);

        match kept.last_mut() {
            Some(best) if !new_group => {
                if sighting.rssi.unwrap_or(i32::MIN) > best.rssi.unwrap_or(i32::MIN) {
                    *best = sighting;
                }
            }
            _ => kept.push(sighting),
        }
    }
    kept
}
