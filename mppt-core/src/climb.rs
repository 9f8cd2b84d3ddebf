//! Perturb-and-observe controller for the resistor ladder.
//!
//! [`HillClimbController`] keeps the previous power estimate, the ladder state,
//! and the climb phase. On every step it compares the new estimate with the
//! previous one:
//!
//! - power rose: keep perturbing the same way (`Rising` decrements the state,
//!   `Falling` increments it);
//! - power fell: step the other way (`Rising` increments, `Falling`
//!   decrements) and flip the phase;
//! - power unchanged: hold the state and the phase.
//!
//! The state saturates at `0` and `255`. Saturation never flips the phase on
//! its own; only an observed drop in power does. A controller parked on a
//! boundary therefore stays there until the readings move it off.

use crate::ladder::LadderState;
use crate::power::Power;

/// Climb phase of the perturb-and-observe loop.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClimbDirection {
    /// Improvements are followed by decrementing the ladder state.
    Rising,
    /// Improvements are followed by incrementing the ladder state.
    Falling,
}

impl ClimbDirection {
    /// Opposite phase.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            ClimbDirection::Rising => ClimbDirection::Falling,
            ClimbDirection::Falling => ClimbDirection::Rising,
        }
    }
}

/// What a controller step decided.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClimbDecision {
    /// Power improved; the perturbation continued in the current phase.
    Continued,
    /// Power dropped; the perturbation reversed and the phase flipped.
    Reversed,
    /// Power unchanged; nothing moved.
    Held,
}

/// Hill-climbing state machine driving the ladder toward maximum power.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HillClimbController {
    state: LadderState,
    direction: ClimbDirection,
    previous_power: Power,
}

impl HillClimbController {
    /// Power the first step is compared against.
    pub const INITIAL_POWER: Power = 0.0;

    /// Controller at the maximum-conduction state in the `Rising` phase.
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_at(LadderState::MAX, ClimbDirection::Rising)
    }

    /// Controller starting from an explicit state and phase.
    #[must_use]
    pub const fn starting_at(state: LadderState, direction: ClimbDirection) -> Self {
        Self {
            state,
            direction,
            previous_power: Self::INITIAL_POWER,
        }
    }

    #[must_use]
    pub const fn state(&self) -> LadderState {
        self.state
    }

    #[must_use]
    pub const fn direction(&self) -> ClimbDirection {
        self.direction
    }

    /// Power estimate retained from the previous step.
    #[must_use]
    pub const fn previous_power(&self) -> Power {
        self.previous_power
    }

    /// Feeds a fresh power estimate and updates the ladder state.
    pub fn step(&mut self, power: Power) -> ClimbDecision {
        let decision = if power > self.previous_power {
            self.state = match self.direction {
                ClimbDirection::Rising => self.state.decrement(),
                ClimbDirection::Falling => self.state.increment(),
            };
            ClimbDecision::Continued
        } else if power < self.previous_power {
            self.state = match self.direction {
                ClimbDirection::Rising => self.state.increment(),
                ClimbDirection::Falling => self.state.decrement(),
            };
            self.direction = self.direction.flipped();
            ClimbDecision::Reversed
        } else {
            ClimbDecision::Held
        };

        self.previous_power = power;
        decision
    }
}

impl Default for HillClimbController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_maximum_conduction_rising() {
        let controller = HillClimbController::new();
        assert_eq!(controller.state(), LadderState::MAX);
        assert_eq!(controller.direction(), ClimbDirection::Rising);
        assert_eq!(controller.previous_power(), 0.0);
    }

    #[test]
    fn first_positive_reading_counts_as_improvement() {
        let mut controller = HillClimbController::new();
        assert_eq!(controller.step(0.5), ClimbDecision::Continued);
        assert_eq!(controller.state(), LadderState::new(254));
        assert_eq!(controller.direction(), ClimbDirection::Rising);
    }

    #[test]
    fn falling_phase_increments_on_improvement() {
        let mut controller =
            HillClimbController::starting_at(LadderState::new(10), ClimbDirection::Falling);
        controller.step(1.0);
        assert_eq!(controller.state(), LadderState::new(11));
        assert_eq!(controller.direction(), ClimbDirection::Falling);
    }

    #[test]
    fn drop_in_falling_phase_decrements_and_flips() {
        let mut controller =
            HillClimbController::starting_at(LadderState::new(10), ClimbDirection::Falling);
        controller.step(2.0);
        assert_eq!(controller.step(1.0), ClimbDecision::Reversed);
        assert_eq!(controller.state(), LadderState::new(10));
        assert_eq!(controller.direction(), ClimbDirection::Rising);
    }

    #[test]
    fn equal_power_holds_everything() {
        let mut controller =
            HillClimbController::starting_at(LadderState::new(100), ClimbDirection::Rising);
        controller.step(3.0);
        let before = controller;
        assert_eq!(controller.step(3.0), ClimbDecision::Held);
        assert_eq!(controller, before);
    }

    #[test]
    fn saturation_at_zero_keeps_phase() {
        let mut controller =
            HillClimbController::starting_at(LadderState::MIN, ClimbDirection::Rising);
        controller.step(1.0);
        controller.step(2.0);
        assert_eq!(controller.state(), LadderState::MIN);
        assert_eq!(controller.direction(), ClimbDirection::Rising);
    }

    #[test]
    fn drop_at_upper_boundary_still_flips() {
        let mut controller = HillClimbController {
            state: LadderState::MAX,
            direction: ClimbDirection::Rising,
            previous_power: 5.0,
        };
        assert_eq!(controller.step(4.0), ClimbDecision::Reversed);
        assert_eq!(controller.state(), LadderState::MAX);
        assert_eq!(controller.direction(), ClimbDirection::Falling);
    }
}
