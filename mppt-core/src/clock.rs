//! Wall-clock timestamps for telemetry records.
//!
//! The board has no battery-backed clock, so [`SoftClock`] starts from a
//! build-time date and counts forward from the monotonic millisecond counter.
//! Years are not tracked; the calendar wraps after 31 December using a
//! non-leap month table.

use core::fmt;

use crate::Millis;

const DAYS_IN_MONTH: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
const SECONDS_PER_DAY: u64 = 86_400;
const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

/// Month, day, and time of day.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DateTime {
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    #[must_use]
    pub const fn new(month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Seconds since 1 January 00:00:00. Out-of-range fields are clamped.
    #[must_use]
    pub fn seconds_into_year(&self) -> u64 {
        let month = usize::from(self.month.clamp(1, 12));
        let days_before: u64 = DAYS_IN_MONTH[..month - 1]
            .iter()
            .map(|days| u64::from(*days))
            .sum();
        let day = u64::from(self.day.clamp(1, DAYS_IN_MONTH[month - 1])) - 1;

        (days_before + day) * SECONDS_PER_DAY
            + u64::from(self.hour.min(23)) * 3_600
            + u64::from(self.minute.min(59)) * 60
            + u64::from(self.second.min(59))
    }

    /// Inverse of [`Self::seconds_into_year`], wrapping past the end of the year.
    #[must_use]
    pub fn from_seconds_into_year(seconds: u64) -> Self {
        let seconds = seconds % SECONDS_PER_YEAR;
        let mut day_of_year = seconds / SECONDS_PER_DAY;
        let time_of_day = seconds % SECONDS_PER_DAY;

        let mut month = 1;
        for days in DAYS_IN_MONTH {
            let days = u64::from(days);
            if day_of_year < days {
                break;
            }
            day_of_year -= days;
            month += 1;
        }

        Self {
            month,
            day: narrow(day_of_year + 1),
            hour: narrow(time_of_day / 3_600),
            minute: narrow(time_of_day % 3_600 / 60),
            second: narrow(time_of_day % 60),
        }
    }
}

fn narrow(value: u64) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX)
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}/{:02} {:02}:{:02}:{:02}",
            self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Source of wall-clock timestamps.
pub trait WallClock {
    /// Date and time corresponding to the monotonic instant `now`.
    fn now(&mut self, now: Millis) -> DateTime;
}

/// Clock that counts forward from a fixed starting date.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SoftClock {
    origin: DateTime,
    started_at: Millis,
}

impl SoftClock {
    /// Clock reading `origin` at monotonic instant `started_at`.
    #[must_use]
    pub const fn new(origin: DateTime, started_at: Millis) -> Self {
        Self { origin, started_at }
    }

    /// Date and time at monotonic instant `now`.
    #[must_use]
    pub fn at(&self, now: Millis) -> DateTime {
        let elapsed = now.saturating_sub(self.started_at) / 1_000;
        DateTime::from_seconds_into_year(self.origin.seconds_into_year() + elapsed)
    }
}

impl WallClock for SoftClock {
    fn now(&mut self, now: Millis) -> DateTime {
        self.at(now)
    }
}
