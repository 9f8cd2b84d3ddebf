use embassy_futures::yield_now;
use embassy_time::Instant;

use super::{FirmwareControl, FirmwarePipeline};
use crate::telemetry;

#[embassy_executor::task]
pub async fn run(mut control: FirmwareControl, mut pipeline: FirmwarePipeline) -> ! {
    loop {
        let now = Instant::now().as_millis();
        let report = control.poll(now, &mut pipeline);

        if let Some(tick) = report.resistor {
            defmt::trace!(
                "climb: state={} power={} decision={}",
                tick.state.raw(),
                tick.power,
                defmt::Debug2Format(&tick.decision)
            );
        }
        telemetry::log_pass(&report);

        // Let the anemometer task run between passes.
        yield_now().await;
    }
}
