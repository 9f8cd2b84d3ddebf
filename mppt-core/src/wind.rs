//! Wind speed, gust, and direction acquisition.
//!
//! The anemometer closes a reed switch once per revolution. An interrupt
//! handler counts those closures in a [`PulseCounter`], touching nothing but
//! one atomic. On each telemetry tick the main loop drains the counter through
//! an [`AnemometerSensor`], which turns the pulse count into a speed, keeps a
//! short history for the gust figure, and decodes the vane's resistor divider
//! into a compass direction. The control loop only ever sees the aggregated
//! [`WindSample`].

use heapless::HistoryBuf;
use portable_atomic::{AtomicU32, Ordering};

use crate::Millis;
use crate::config::{ANEMOMETER_KMH_PER_HZ, GUST_WINDOW, VANE_PULL_UP_OHMS};
use crate::sampler::AnalogSource;

/// Aggregated wind readings for one telemetry tick.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct WindSample {
    pub speed_kmh: f32,
    pub gust_kmh: f32,
    pub direction_deg: f32,
}

/// Source of aggregated wind readings.
pub trait WindSensor {
    /// Readings accumulated since the previous call.
    fn sample(&mut self, now: Millis) -> WindSample;
}

/// Wind sensor that always reports calm air.
#[derive(Copy, Clone, Debug, Default)]
pub struct CalmWind;

impl WindSensor for CalmWind {
    fn sample(&mut self, _: Millis) -> WindSample {
        WindSample::default()
    }
}

/// Anemometer pulse counter shared with an interrupt handler.
#[derive(Debug, Default)]
pub struct PulseCounter {
    pulses: AtomicU32,
}

impl PulseCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pulses: AtomicU32::new(0),
        }
    }

    /// Counts one pulse. Safe to call from interrupt context.
    pub fn record_pulse(&self) {
        self.pulses.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the pulses counted so far and resets the counter.
    pub fn take(&self) -> u32 {
        self.pulses.swap(0, Ordering::Relaxed)
    }

    /// Pulses counted since the last [`Self::take`].
    pub fn pending(&self) -> u32 {
        self.pulses.load(Ordering::Relaxed)
    }
}

/// Vane positions as (direction in tenths of a degree, vane resistance in ohms).
const VANE_POSITIONS: [(u16, u32); 16] = [
    (0, 33_000),
    (225, 6_570),
    (450, 8_200),
    (675, 891),
    (900, 1_000),
    (1_125, 688),
    (1_350, 2_200),
    (1_575, 1_410),
    (1_800, 3_900),
    (2_025, 3_140),
    (2_250, 16_000),
    (2_475, 14_120),
    (2_700, 120_000),
    (2_925, 42_120),
    (3_150, 64_900),
    (3_375, 21_880),
];

/// Decodes vane divider codes into compass directions.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VaneDecoder {
    max_code: u16,
    pull_up_ohms: u32,
}

impl VaneDecoder {
    #[must_use]
    pub const fn new(max_code: u16, pull_up_ohms: u32) -> Self {
        Self {
            max_code,
            pull_up_ohms,
        }
    }

    /// Code the converter reads for a vane resistance of `ohms`.
    #[must_use]
    pub fn expected_code(&self, ohms: u32) -> u16 {
        let numerator = u64::from(self.max_code) * u64::from(ohms);
        let denominator = u64::from(ohms) + u64::from(self.pull_up_ohms);
        u16::try_from(numerator / denominator).unwrap_or(self.max_code)
    }

    /// Direction in degrees of the vane position whose code is nearest `code`.
    #[must_use]
    pub fn direction_deg(&self, code: u16) -> f32 {
        let tenths = VANE_POSITIONS
            .iter()
            .min_by_key(|(_, ohms)| self.expected_code(*ohms).abs_diff(code))
            .map_or(0, |(tenths, _)| *tenths);
        f32::from(tenths) / 10.0
    }

    /// Code the vane produces when pointing closest to `direction_deg`.
    #[must_use]
    pub fn code_for_direction(&self, direction_deg: f32) -> u16 {
        let mut heading = direction_deg % 360.0;
        if heading < 0.0 {
            heading += 360.0;
        }
        let angular_gap = |tenths: u16| {
            let delta = f32::from(tenths) / 10.0 - heading;
            let gap = if delta < 0.0 { -delta } else { delta };
            gap.min(360.0 - gap)
        };
        VANE_POSITIONS
            .iter()
            .min_by(|(a, _), (b, _)| angular_gap(*a).total_cmp(&angular_gap(*b)))
            .map_or(0, |(_, ohms)| self.expected_code(*ohms))
    }
}

impl Default for VaneDecoder {
    fn default() -> Self {
        Self::new(crate::config::ADC_MAX_CODE, VANE_PULL_UP_OHMS)
    }
}

/// Anemometer and vane aggregated per telemetry tick.
pub struct AnemometerSensor<'a, V> {
    counter: &'a PulseCounter,
    vane: V,
    decoder: VaneDecoder,
    kmh_per_hz: f32,
    last_sample_at: Millis,
    speeds: HistoryBuf<f32, GUST_WINDOW>,
}

impl<'a, V: AnalogSource> AnemometerSensor<'a, V> {
    /// Sensor whose first sample covers the time since `now`.
    pub fn new(counter: &'a PulseCounter, vane: V, now: Millis) -> Self {
        Self {
            counter,
            vane,
            decoder: VaneDecoder::default(),
            kmh_per_hz: ANEMOMETER_KMH_PER_HZ,
            last_sample_at: now,
            speeds: HistoryBuf::new(),
        }
    }

    /// Highest speed within the gust window, or zero before the first sample.
    #[must_use]
    pub fn gust_kmh(&self) -> f32 {
        self.speeds
            .as_slice()
            .iter()
            .copied()
            .fold(0.0, f32::max)
    }

    #[allow(clippy::cast_precision_loss)]
    fn speed_kmh(&self, pulses: u32, elapsed: Millis) -> f32 {
        if elapsed == 0 {
            return 0.0;
        }
        let hertz = pulses as f32 * 1_000.0 / elapsed as f32;
        hertz * self.kmh_per_hz
    }
}

impl<V: AnalogSource> WindSensor for AnemometerSensor<'_, V> {
    fn sample(&mut self, now: Millis) -> WindSample {
        let pulses = self.counter.take();
        let elapsed = now.saturating_sub(self.last_sample_at);
        self.last_sample_at = now;

        let speed_kmh = self.speed_kmh(pulses, elapsed);
        self.speeds.write(speed_kmh);

        WindSample {
            speed_kmh,
            gust_kmh: self.gust_kmh(),
            direction_deg: self.decoder.direction_deg(self.vane.convert()),
        }
    }
}
