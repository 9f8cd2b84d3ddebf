//! Ladder resistance and instantaneous power estimates.
//!
//! Each rung contributes either the small resistance of its closed switch or
//! its binary-weighted resistor (`2^i` for rung `i`). The total is the sum over
//! all eight rungs, taken in the same switch order the
//! [`LadderDriver`](crate::ladder::LadderDriver) uses. Because the closed
//! contribution is strictly positive, no state produces a zero-resistance
//! network and [`ResistanceNetwork::power_of`] is finite for every state.

use crate::ladder::{LadderState, SWITCH_COUNT, SwitchLevel};

/// Resistance in the ladder's native units.
pub type Ohms = f32;
/// Voltage measured across the ladder.
pub type Volts = f32;
/// Power estimate in `volts² / ohms`.
pub type Power = f32;

/// Binary-weighted resistor value of every rung, least significant first.
pub const RUNG_WEIGHTS: [Ohms; SWITCH_COUNT] = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0];

/// Static description of the switched resistor ladder.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResistanceNetwork {
    closed_ohms: Ohms,
}

impl ResistanceNetwork {
    /// Creates a network whose closed switches contribute `closed_ohms` each.
    ///
    /// # Panics
    ///
    /// Panics when `closed_ohms` is not strictly positive; the check runs at
    /// compile time for `const` networks.
    #[must_use]
    pub const fn new(closed_ohms: Ohms) -> Self {
        assert!(
            closed_ohms > 0.0,
            "closed switch resistance must be positive"
        );
        Self { closed_ohms }
    }

    /// Resistance contributed by a closed switch.
    #[must_use]
    pub const fn closed_ohms(&self) -> Ohms {
        self.closed_ohms
    }

    const fn contribution(&self, index: usize, level: SwitchLevel) -> Ohms {
        match level {
            SwitchLevel::Closed => self.closed_ohms,
            SwitchLevel::Open => RUNG_WEIGHTS[index],
        }
    }

    /// Total resistance for an explicit set of switch levels.
    #[must_use]
    pub fn resistance_of_levels(&self, levels: &[SwitchLevel; SWITCH_COUNT]) -> Ohms {
        levels
            .iter()
            .enumerate()
            .map(|(index, level)| self.contribution(index, *level))
            .sum()
    }

    /// Total resistance for a ladder state.
    #[must_use]
    pub fn resistance_of(&self, state: LadderState) -> Ohms {
        self.resistance_of_levels(&state.switch_levels())
    }

    /// Instantaneous power dissipated in the ladder: `V² / R`.
    #[must_use]
    pub fn power_of(&self, voltage: Volts, state: LadderState) -> Power {
        voltage * voltage / self.resistance_of(state)
    }

    /// Lowest resistance the ladder can reach (every switch closed).
    #[must_use]
    pub fn min_resistance(&self) -> Ohms {
        self.resistance_of(LadderState::MAX)
    }

    /// Highest resistance the ladder can reach (every switch open).
    #[must_use]
    pub fn max_resistance(&self) -> Ohms {
        self.resistance_of(LadderState::MIN)
    }
}

/// Resistance of `state` on the standard ladder.
#[must_use]
pub fn resistance_of(state: LadderState) -> Ohms {
    crate::config::LADDER_NETWORK.resistance_of(state)
}

/// Power estimate for `voltage` across the standard ladder at `state`.
#[must_use]
pub fn power_of(voltage: Volts, state: LadderState) -> Power {
    crate::config::LADDER_NETWORK.power_of(voltage, state)
}
