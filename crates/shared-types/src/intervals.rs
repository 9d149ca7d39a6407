//! # Interval Arithmetic
//!
//! Conversions between epoch seconds, interval numbers and day numbers.
//!
//! An interval is one identifier rotation period (10 minutes by default). A day
//! holds `intervals_per_day` intervals (144 by default).
//!
//! ## Invariants
//!
//! - `interval = epoch_seconds / interval_seconds`
//! - `day = interval / intervals_per_day`
//! - `first_interval_of_day(day_for_interval(i)) <= i`

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::TypeError;

/// Day number: days since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DayNumber(pub u32);

impl DayNumber {
    pub fn previous(self) -> Self {
        DayNumber(self.0.saturating_sub(1))
    }

    pub fn next(self) -> Self {
        DayNumber(self.0.saturating_add(1))
    }
}

impl fmt::Display for DayNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day {}", self.0)
    }
}

/// Rotation schedule of proximity identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalClock {
    id_rolling_period_minutes: u32,
    intervals_per_day: u32,
}

impl Default for IntervalClock {
    fn default() -> Self {
        Self {
            id_rolling_period_minutes: 10,
            intervals_per_day: 144,
        }
    }
}

impl IntervalClock {
    /// Longest rotation period whose length in seconds fits a `u32`.
    pub const MAX_ID_ROLLING_PERIOD_MINUTES: u32 = u32::MAX / 60;

    /// Build a clock; both parameters must be non-zero and the interval
    /// length in seconds must fit a `u32`.
    pub fn new(id_rolling_period_minutes: u32, intervals_per_day: u32) -> Result<Self, TypeError> {
        if id_rolling_period_minutes == 0 {
            return Err(TypeError::InvalidClock(
                "id_rolling_period_minutes must be positive".into(),
            ));
        }
        if id_rolling_period_minutes > Self::MAX_ID_ROLLING_PERIOD_MINUTES {
            return Err(TypeError::InvalidClock(format!(
                "id_rolling_period_minutes must be at most {}",
                Self::MAX_ID_ROLLING_PERIOD_MINUTES
            )));
        }
        if intervals_per_day == 0 {
            return Err(TypeError::InvalidClock(
                "intervals_per_day must be positive".into(),
            ));
        }
        Ok(Self {
            id_rolling_period_minutes,
            intervals_per_day,
        })
    }

    pub fn id_rolling_period_minutes(&self) -> u32 {
        self.id_rolling_period_minutes
    }

    pub fn intervals_per_day(&self) -> u32 {
        self.intervals_per_day
    }

    /// Saturates for clocks deserialized around `new`.
    pub fn interval_seconds(&self) -> u32 {
        self.id_rolling_period_minutes.saturating_mul(60)
    }

    pub fn interval_for_epoch_seconds(&self, epoch_seconds: u32) -> u32 {
        epoch_seconds / self.interval_seconds()
    }

    /// Start of an interval in epoch seconds, saturating on overflow.
    pub fn epoch_seconds_for_interval(&self, interval: u32) -> u32 {
        interval.saturating_mul(self.interval_seconds())
    }

    pub fn day_for_interval(&self, interval: u32) -> DayNumber {
        DayNumber(interval / self.intervals_per_day)
    }

    pub fn day_for_epoch_seconds(&self, epoch_seconds: u32) -> DayNumber {
        self.day_for_interval(self.interval_for_epoch_seconds(epoch_seconds))
    }

    pub fn first_interval_of_day(&self, day: DayNumber) -> u32 {
        day.0.saturating_mul(self.intervals_per_day)
    }
}
