use embassy_stm32::exti::ExtiInput;
use mppt_core::wind::PulseCounter;

/// Counts one pulse per reed-switch closure.
#[embassy_executor::task]
pub async fn run(mut input: ExtiInput<'static>, pulses: &'static PulseCounter) -> ! {
    loop {
        input.wait_for_falling_edge().await;
        pulses.record_pulse();
    }
}
