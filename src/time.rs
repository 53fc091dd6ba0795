//! Elapsed-time helpers used by the retention age check.
//!
//! Durations are decomposed with fixed conversions (1 day = 24 hours =
//! 86 400 000 ms), never calendar-aware ones, so "days old" always means full
//! 24-hour periods.

use chrono::{DateTime, Duration, Utc};

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// A duration broken into whole units.
///
/// `days` is unbounded; every smaller unit holds the remainder within the next
/// larger one (`hours` in `0..24`, `minutes` in `0..60`, and so on).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeUnits {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub milliseconds: u64,
}

/// Time elapsed from `reference` to `current`.
///
/// Negative when `current` is earlier than `reference` (clock skew or a
/// future-dated record). [`decompose`] treats such durations as zero.
pub fn elapsed(reference: DateTime<Utc>, current: DateTime<Utc>) -> Duration {
    current.signed_duration_since(reference)
}

/// Break a duration into whole units, truncating toward zero.
///
/// Negative durations decompose to all-zero units.
pub fn decompose(duration: Duration) -> TimeUnits {
    let Ok(total_ms) = u64::try_from(duration.num_milliseconds()) else {
        return TimeUnits::default();
    };

    TimeUnits {
        days: total_ms / MS_PER_DAY,
        hours: (total_ms % MS_PER_DAY) / MS_PER_HOUR,
        minutes: (total_ms % MS_PER_HOUR) / MS_PER_MINUTE,
        seconds: (total_ms % MS_PER_MINUTE) / MS_PER_SECOND,
        milliseconds: total_ms % MS_PER_SECOND,
    }
}

/// Whole days between `reference` and `now`, clamped at zero.
pub fn elapsed_days(reference: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    decompose(elapsed(reference, now)).days
}
