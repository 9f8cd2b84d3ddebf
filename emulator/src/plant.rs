//! Simulated turbine, wind, and ladder hardware.
//!
//! The turbine is modelled as an open-circuit source proportional to wind
//! speed behind a fixed internal resistance, so the load voltage is
//! `V_oc * R / (R + R_int)` and power peaks where the ladder matches `R_int`.
//! Switch writes, load readings, and vane readings all go through one shared
//! [`PlantState`] so the controller sees the ladder it last applied.

use std::cell::RefCell;
use std::f32::consts::TAU;
use std::rc::Rc;

use mppt_core::Millis;
use mppt_core::config::{LADDER_NETWORK, LOAD_ADC_SCALE};
use mppt_core::ladder::{LadderState, SWITCH_COUNT, SwitchLevel, SwitchSink};
use mppt_core::power::{Ohms, Volts};
use mppt_core::sampler::AnalogSource;
use mppt_core::wind::{PulseCounter, VaneDecoder};

/// Open-circuit turbine voltage per km/h of wind.
const VOLTS_PER_KMH: f32 = 0.12;
/// Internal resistance of the simulated turbine.
const INTERNAL_OHMS: Ohms = 8.0;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WindProfile {
    /// Constant 18 km/h from the south-west.
    Steady,
    /// Gusting around 15 km/h with a slowly veering direction.
    Gusty,
}

impl WindProfile {
    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("steady") {
            Ok(Self::Steady)
        } else if tag.eq_ignore_ascii_case("gusty") {
            Ok(Self::Gusty)
        } else {
            Err(format!("Unknown wind profile `{tag}`"))
        }
    }

    /// Wind speed in km/h and heading in degrees at `now`.
    #[allow(clippy::cast_precision_loss)]
    pub fn conditions(self, now: Millis) -> (f32, f32) {
        match self {
            WindProfile::Steady => (18.0, 225.0),
            WindProfile::Gusty => {
                let seconds = now as f32 / 1_000.0;
                let speed = 15.0
                    + 6.0 * (TAU * seconds / 7.0).sin()
                    + 3.0 * (TAU * seconds / 2.3).sin();
                let heading = 180.0 + 45.0 * (TAU * seconds / 20.0).sin();
                (speed.max(0.0), heading)
            }
        }
    }
}

#[derive(Debug)]
struct PlantState {
    levels: [SwitchLevel; SWITCH_COUNT],
    wind_kmh: f32,
    heading_deg: f32,
    pulse_phase: f32,
}

/// Turbine and wind simulation advanced one millisecond at a time.
#[derive(Clone, Debug)]
pub struct TurbinePlant {
    profile: WindProfile,
    shared: Rc<RefCell<PlantState>>,
}

impl TurbinePlant {
    pub fn new(profile: WindProfile) -> Self {
        let (wind_kmh, heading_deg) = profile.conditions(0);
        Self {
            profile,
            shared: Rc::new(RefCell::new(PlantState {
                levels: LadderState::MAX.switch_levels(),
                wind_kmh,
                heading_deg,
                pulse_phase: 0.0,
            })),
        }
    }

    /// Moves the wind to `now` and emits any anemometer pulses due in the
    /// millisecond that just passed.
    pub fn advance(&self, now: Millis, pulses: &PulseCounter) {
        let (wind_kmh, heading_deg) = self.profile.conditions(now);
        let mut state = self.shared.borrow_mut();
        state.wind_kmh = wind_kmh;
        state.heading_deg = heading_deg;

        let hertz = wind_kmh / mppt_core::config::ANEMOMETER_KMH_PER_HZ;
        state.pulse_phase += hertz / 1_000.0;
        while state.pulse_phase >= 1.0 {
            state.pulse_phase -= 1.0;
            pulses.record_pulse();
        }
    }

    /// Ladder state reconstructed from the switch levels last written.
    pub fn applied_state(&self) -> LadderState {
        let levels = self.shared.borrow().levels;
        let raw = levels
            .iter()
            .enumerate()
            .filter(|(_, level)| level.is_closed())
            .fold(0u8, |raw, (index, _)| raw | (1 << index));
        LadderState::new(raw)
    }

    /// Voltage across the ladder at its current resistance.
    pub fn load_voltage(&self) -> Volts {
        let state = self.shared.borrow();
        let resistance = LADDER_NETWORK.resistance_of_levels(&state.levels);
        let open_circuit = VOLTS_PER_KMH * state.wind_kmh;
        open_circuit * resistance / (resistance + INTERNAL_OHMS)
    }

    pub fn switches(&self) -> SimSwitches {
        SimSwitches {
            plant: self.clone(),
        }
    }

    pub fn load_channel(&self) -> LoadChannel {
        LoadChannel {
            plant: self.clone(),
        }
    }

    pub fn vane_channel(&self) -> VaneChannel {
        VaneChannel {
            plant: self.clone(),
            decoder: VaneDecoder::default(),
        }
    }
}

/// Ladder switches of the simulated plant.
#[derive(Debug)]
pub struct SimSwitches {
    plant: TurbinePlant,
}

impl SwitchSink for SimSwitches {
    fn write(&mut self, index: usize, level: SwitchLevel) {
        if let Some(slot) = self.plant.shared.borrow_mut().levels.get_mut(index) {
            *slot = level;
        }
    }
}

/// Load-voltage channel of the simulated plant.
#[derive(Debug)]
pub struct LoadChannel {
    plant: TurbinePlant,
}

impl AnalogSource for LoadChannel {
    fn convert(&mut self) -> u16 {
        LOAD_ADC_SCALE.to_code(self.plant.load_voltage())
    }
}

/// Wind-vane channel of the simulated plant.
#[derive(Debug)]
pub struct VaneChannel {
    plant: TurbinePlant,
    decoder: VaneDecoder,
}

impl AnalogSource for VaneChannel {
    fn convert(&mut self) -> u16 {
        let heading = self.plant.shared.borrow().heading_deg;
        self.decoder.code_for_direction(heading)
    }
}
