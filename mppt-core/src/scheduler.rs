//! Cooperative deadline scheduler for the two periodic ticks.
//!
//! The scheduler is polled from a single loop with a monotonic millisecond
//! timestamp. A deadline is due once `now` is strictly past it; when it fires,
//! the next deadline is `now + interval`. Late ticks therefore push the next
//! one back instead of bunching up to catch a fixed grid.

use core::time::Duration;

use crate::Millis;

/// Intervals for the two periodic ticks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScheduleConfig {
    pub resistor_interval: Duration,
    pub telemetry_interval: Duration,
}

impl ScheduleConfig {
    #[must_use]
    pub const fn new(resistor_interval: Duration, telemetry_interval: Duration) -> Self {
        Self {
            resistor_interval,
            telemetry_interval,
        }
    }
}

fn interval_millis(interval: Duration) -> Millis {
    u64::try_from(interval.as_millis()).unwrap_or(Millis::MAX)
}

/// A single rescheduling deadline.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Deadline {
    next: Millis,
    interval: Millis,
}

impl Deadline {
    /// First deadline one interval after `now`.
    #[must_use]
    pub fn starting_at(now: Millis, interval: Duration) -> Self {
        let interval = interval_millis(interval);
        Self {
            next: now.saturating_add(interval),
            interval,
        }
    }

    /// Timestamp the deadline next fires after.
    #[must_use]
    pub const fn next(&self) -> Millis {
        self.next
    }

    #[must_use]
    pub const fn is_due(&self, now: Millis) -> bool {
        now > self.next
    }

    /// Returns `true` and reschedules relative to `now` when the deadline has passed.
    pub fn fire(&mut self, now: Millis) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.next = now.saturating_add(self.interval);
        true
    }
}

/// Ticks that fired during one scheduler poll.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DueTicks {
    pub resistor: bool,
    pub telemetry: bool,
}

/// Resistor and telemetry deadlines.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TickScheduler {
    resistor: Deadline,
    telemetry: Deadline,
}

impl TickScheduler {
    /// Scheduler whose first ticks land one interval after `now`.
    #[must_use]
    pub fn new(config: ScheduleConfig, now: Millis) -> Self {
        Self {
            resistor: Deadline::starting_at(now, config.resistor_interval),
            telemetry: Deadline::starting_at(now, config.telemetry_interval),
        }
    }

    /// Fires the resistor tick if it is due.
    pub fn fire_resistor(&mut self, now: Millis) -> bool {
        self.resistor.fire(now)
    }

    /// Fires the telemetry tick if it is due.
    pub fn fire_telemetry(&mut self, now: Millis) -> bool {
        self.telemetry.fire(now)
    }

    /// Checks the resistor tick, then the telemetry tick.
    pub fn poll(&mut self, now: Millis) -> DueTicks {
        let resistor = self.fire_resistor(now);
        let telemetry = self.fire_telemetry(now);
        DueTicks {
            resistor,
            telemetry,
        }
    }

    #[must_use]
    pub const fn resistor_deadline(&self) -> Deadline {
        self.resistor
    }

    #[must_use]
    pub const fn telemetry_deadline(&self) -> Deadline {
        self.telemetry
    }
}
