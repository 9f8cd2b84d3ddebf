//! Applies ladder states to the physical switch outputs.

use super::{LadderState, SwitchLevel};

/// Abstraction over the eight switch outputs.
pub trait SwitchSink {
    /// Drives switch `index` (0 = least significant rung) to `level`.
    fn write(&mut self, index: usize, level: SwitchLevel);
}

impl<T: SwitchSink + ?Sized> SwitchSink for &mut T {
    fn write(&mut self, index: usize, level: SwitchLevel) {
        (**self).write(index, level);
    }
}

/// Drives a [`SwitchSink`] from ladder states.
///
/// Every call to [`LadderDriver::apply`] writes all eight switches, so a
/// skipped or dropped update never leaves a switch at a stale level.
#[derive(Debug)]
pub struct LadderDriver<S> {
    sink: S,
    applied: Option<LadderState>,
}

impl<S: SwitchSink> LadderDriver<S> {
    #[must_use]
    pub const fn new(sink: S) -> Self {
        Self {
            sink,
            applied: None,
        }
    }

    /// Writes every switch level for `state`.
    pub fn apply(&mut self, state: LadderState) {
        let levels = state.switch_levels();
        for (index, level) in levels.into_iter().enumerate() {
            self.sink.write(index, level);
        }
        self.applied = Some(state);
    }

    /// Last state written to the sink, if any.
    #[must_use]
    pub const fn applied(&self) -> Option<LadderState> {
        self.applied
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
