//! Build-time configuration for the controller.
//!
//! Nothing here is adjustable at runtime. Firmware and emulator builds pick
//! these values up directly; tests override the bundled [`ControlConfig`] and
//! [`ScheduleConfig`](crate::scheduler::ScheduleConfig) where a scenario needs
//! different intervals.

use core::time::Duration;

use crate::clock::DateTime;
use crate::ladder::LadderState;
use crate::power::ResistanceNetwork;
use crate::sampler::AdcScale;
use crate::scheduler::ScheduleConfig;

/// Resolution of the load-voltage converter.
pub const ADC_RESOLUTION_BITS: u8 = 12;
/// Highest code the converter reports at full scale.
pub const ADC_MAX_CODE: u16 = (1 << ADC_RESOLUTION_BITS) - 1;
/// Full-scale reference voltage of the converter.
pub const ADC_REFERENCE_VOLTS: f32 = 3.3;
/// Ratio of the external divider in front of the measurement pin.
pub const DIVIDER_RATIO: f32 = 1.0;

/// Resistance contributed by a ladder rung whose switch is closed.
pub const CLOSED_SWITCH_OHMS: f32 = 0.02;
/// Ladder state applied at power-up (every switch closed).
pub const INITIAL_LADDER_STATE: LadderState = LadderState::MAX;

/// Interval between hill-climb steps.
pub const RESISTOR_TICK_INTERVAL: Duration = Duration::from_millis(10);
/// Interval between telemetry records.
pub const TELEMETRY_TICK_INTERVAL: Duration = Duration::from_millis(1_000);

/// Name of the persistent telemetry log.
pub const LOG_FILE_NAME: &str = "datalog.txt";
/// Line appended to an existing log at startup to mark a power cycle.
pub const INIT_MARKER: &str = "New Initialization";

/// Date and time the soft clock reports at startup.
pub const INITIAL_DATE_TIME: DateTime = DateTime::new(1, 1, 0, 0, 0);

/// Anemometer calibration: one pulse per second equals this many km/h.
pub const ANEMOMETER_KMH_PER_HZ: f32 = 2.4;
/// Number of telemetry-tick speed readings the gust is taken over.
pub const GUST_WINDOW: usize = 5;
/// Pull-up resistor feeding the wind vane divider.
pub const VANE_PULL_UP_OHMS: u32 = 10_000;

/// Converter scaling for the load-voltage channel.
pub const LOAD_ADC_SCALE: AdcScale =
    AdcScale::new(ADC_REFERENCE_VOLTS, ADC_MAX_CODE, DIVIDER_RATIO);

/// Ladder network built from [`CLOSED_SWITCH_OHMS`].
pub const LADDER_NETWORK: ResistanceNetwork = ResistanceNetwork::new(CLOSED_SWITCH_OHMS);

/// Scheduler intervals used by the firmware.
pub const SCHEDULE: ScheduleConfig =
    ScheduleConfig::new(RESISTOR_TICK_INTERVAL, TELEMETRY_TICK_INTERVAL);

/// Everything the control loop needs at construction time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ControlConfig {
    pub schedule: ScheduleConfig,
    pub network: ResistanceNetwork,
    pub initial_state: LadderState,
}

impl ControlConfig {
    /// Configuration matching the shipped hardware.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            schedule: SCHEDULE,
            network: LADDER_NETWORK,
            initial_state: INITIAL_LADDER_STATE,
        }
    }

    /// Replaces the scheduler intervals.
    #[must_use]
    pub const fn with_schedule(mut self, schedule: ScheduleConfig) -> Self {
        self.schedule = schedule;
        self
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self::standard()
    }
}
