#![cfg_attr(not(test), no_std)]

// Shared logic for the wind-turbine maximum-power-point controller.
//
// Everything here is hardware agnostic: the firmware and the host emulator
// inject analog sources, switch sinks, storage, and clocks through the traits
// exposed by each module and drive the same control loop.

pub mod climb;
pub mod clock;
pub mod config;
pub mod control;
pub mod ladder;
pub mod power;
pub mod sampler;
pub mod scheduler;
pub mod telemetry;
pub mod wind;

/// Monotonic millisecond timestamps used throughout the controller.
pub type Millis = u64;
