//! Ladder state and the switch levels it encodes.
//!
//! The resistor ladder has eight rungs. Each rung is bypassed by a switch, and
//! the eight switches are described by a single [`LadderState`]. Switch `i` is
//! driven by the `i`-th binary digit of the state, least significant first:
//! the value is decomposed by repeated halving, so index 0 is the remainder of
//! the first division, index 1 the remainder of the second, and so on. The
//! power model and the driver both go through [`LadderState::switch_levels`],
//! which keeps the two views of the ladder in lockstep.

use core::fmt;

pub mod driver;

pub use driver::{LadderDriver, SwitchSink};

/// Number of switched rungs in the ladder.
pub const SWITCH_COUNT: usize = 8;

/// Level a ladder switch is driven to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SwitchLevel {
    /// Switch conducting (output driven high); the rung is bypassed.
    Closed,
    /// Switch open (output driven low); the rung's resistor is in circuit.
    Open,
}

impl SwitchLevel {
    /// Returns `true` when the switch conducts.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, SwitchLevel::Closed)
    }

    /// Helper converting a closed flag into a [`SwitchLevel`].
    #[must_use]
    pub const fn from_closed(closed: bool) -> Self {
        if closed {
            SwitchLevel::Closed
        } else {
            SwitchLevel::Open
        }
    }
}

/// Eight-switch ladder setting, saturating at both ends of `0..=255`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct LadderState(u8);

impl LadderState {
    /// Every switch open, all resistors in circuit.
    pub const MIN: Self = Self(0);
    /// Every switch closed, minimum resistance.
    pub const MAX: Self = Self(u8::MAX);

    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Raw state value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Next state up, or the same state when already at [`Self::MAX`].
    #[must_use]
    pub const fn increment(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Next state down, or the same state when already at [`Self::MIN`].
    #[must_use]
    pub const fn decrement(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    /// Levels for every switch, indexed by switch number.
    #[must_use]
    pub const fn switch_levels(self) -> [SwitchLevel; SWITCH_COUNT] {
        let mut levels = [SwitchLevel::Open; SWITCH_COUNT];
        let mut remaining = self.0;
        let mut index = 0;
        while index < SWITCH_COUNT {
            levels[index] = SwitchLevel::from_closed(remaining % 2 == 1);
            remaining /= 2;
            index += 1;
        }
        levels
    }

    /// Level for a single switch. Indices past the ladder report [`SwitchLevel::Open`].
    #[must_use]
    pub const fn switch_level(self, index: usize) -> SwitchLevel {
        if index < SWITCH_COUNT {
            self.switch_levels()[index]
        } else {
            SwitchLevel::Open
        }
    }
}

impl From<u8> for LadderState {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl From<LadderState> for u8 {
    fn from(state: LadderState) -> Self {
        state.0
    }
}

impl fmt::Display for LadderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
