//! Board peripherals behind the `mppt-core` seams.
//!
//! The eight ladder switches, both analog inputs, and the fault LED live
//! here. The load and vane channels share one ADC instance through a
//! `RefCell`; the control loop is the only caller so the borrow never
//! overlaps.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

pub mod flash_log;

#[cfg(target_os = "none")]
pub use self::target::{AdcChannel, FaultLed, SwitchBank};

#[cfg(target_os = "none")]
mod target {
    use core::cell::RefCell;

    use embassy_stm32::adc::{Adc, AnyAdcChannel};
    use embassy_stm32::gpio::Output;
    use embassy_stm32::peripherals::ADC1;
    use mppt_core::ladder::{SWITCH_COUNT, SwitchLevel, SwitchSink};
    use mppt_core::sampler::AnalogSource;
    use mppt_core::telemetry::FaultIndicator;

    /// Ladder switch outputs, indexed by rung.
    ///
    /// A high output turns the rung's MOSFET on, which closes the switch.
    pub struct SwitchBank<'d> {
        outputs: [Output<'d>; SWITCH_COUNT],
    }

    impl<'d> SwitchBank<'d> {
        /// Rung `i` is driven by `outputs[i]`.
        pub fn new(outputs: [Output<'d>; SWITCH_COUNT]) -> Self {
            Self { outputs }
        }
    }

    impl SwitchSink for SwitchBank<'_> {
        fn write(&mut self, index: usize, level: SwitchLevel) {
            let Some(output) = self.outputs.get_mut(index) else {
                return;
            };
            match level {
                SwitchLevel::Closed => output.set_high(),
                SwitchLevel::Open => output.set_low(),
            }
        }
    }

    /// One input of the shared ADC.
    pub struct AdcChannel<'a> {
        adc: &'a RefCell<Adc<'static, ADC1>>,
        channel: AnyAdcChannel<ADC1>,
    }

    impl<'a> AdcChannel<'a> {
        pub fn new(adc: &'a RefCell<Adc<'static, ADC1>>, channel: AnyAdcChannel<ADC1>) -> Self {
            Self { adc, channel }
        }
    }

    impl AnalogSource for AdcChannel<'_> {
        fn convert(&mut self) -> u16 {
            self.adc.borrow_mut().blocking_read(&mut self.channel)
        }
    }

    /// Status LED lit when storage fails at startup.
    pub struct FaultLed<'d> {
        output: Output<'d>,
    }

    impl<'d> FaultLed<'d> {
        pub fn new(output: Output<'d>) -> Self {
            Self { output }
        }
    }

    impl FaultIndicator for FaultLed<'_> {
        fn raise(&mut self) {
            self.output.set_high();
        }
    }
}
