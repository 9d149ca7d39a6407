//! Valid time window of a generated identifier.
//!
//! An identifier broadcast in interval `i` is accepted for sightings in
//! `[(i - drift) * interval_seconds, (i + 1 + drift) * interval_seconds)`.
//! Epoch arithmetic is done in `u64` so windows near `u32::MAX` do not wrap.

use shared_types::{DayNumber, IntervalClock};
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidWindow {
    start_interval: u32,
    /// Exclusive
    end_interval: u32,
    interval_seconds: u32,
}

impl ValidWindow {
    pub fn for_interval(interval_number: u32, drift_intervals: u32, clock: &IntervalClock) -> Self {
        Self {
            start_interval: interval_number.saturating_sub(drift_intervals),
            end_interval: interval_number
                .saturating_add(1)
                .saturating_add(drift_intervals),
            interval_seconds: clock.interval_seconds(),
        }
    }

    pub fn start_interval(&self) -> u32 {
        self.start_interval
    }

    pub fn end_interval_exclusive(&self) -> u32 {
        self.end_interval
    }

    pub fn start_epoch_seconds(&self) -> u64 {
        u64::from(self.start_interval) * u64::from(self.interval_seconds)
    }

    pub fn end_epoch_seconds_exclusive(&self) -> u64 {
        u64::from(self.end_interval) * u64::from(self.interval_seconds)
    }

    pub fn contains_epoch_seconds(&self, epoch_seconds: u32) -> bool {
        let t = u64::from(epoch_seconds);
        t >= self.start_epoch_seconds() && t < self.end_epoch_seconds_exclusive()
    }

    /// Days whose contact records may hold sightings for this window.
    ///
    /// Always includes `key_day`; extends to the previous day when the window
    /// starts before it and to the next day when it ends after it.
    pub fn days_to_fetch(&self, key_day: DayNumber, clock: &IntervalClock) -> RangeInclusive<u32> {
        let first = clock.day_for_interval(self.start_interval);
        let last = clock.day_for_interval(self.end_interval.saturating_sub(1));
        first.0.min(key_day.0)..=last.0.max(key_day.0)
    }
}
