use core::cell::RefCell;

use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::adc::{Adc, AdcChannel as _, Resolution, SampleTime};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::peripherals::ADC1;
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::time::Hertz;
use embassy_time::Instant;
use mppt_core::clock::SoftClock;
use mppt_core::config::{self, ControlConfig};
use mppt_core::control::{ControlLoop, TelemetryPipeline};
use mppt_core::sampler::Sampler;
use mppt_core::telemetry::TelemetryLogger;
use mppt_core::wind::{AnemometerSensor, PulseCounter};
use static_cell::StaticCell;

use crate::hw::flash_log::SpiFlashLog;
use crate::hw::{AdcChannel, FaultLed, SwitchBank};
use crate::telemetry::{self, ConsoleMirror};

mod anemometer_task;
mod control_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// Anemometer pulses since the last telemetry tick.
pub(super) static PULSES: PulseCounter = PulseCounter::new();

static ADC: StaticCell<RefCell<Adc<'static, ADC1>>> = StaticCell::new();

const FLASH_SPI_FREQUENCY: Hertz = Hertz(8_000_000);

type FirmwareControl = ControlLoop<AdcChannel<'static>, SwitchBank<'static>>;
type FirmwarePipeline = TelemetryPipeline<
    AnemometerSensor<'static, AdcChannel<'static>>,
    SoftClock,
    SpiFlashLog<'static>,
    ConsoleMirror,
>;

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let hal::Peripherals {
        PA0,
        PA1,
        PA2,
        PA4,
        PA5,
        PA6,
        PA8,
        PA9,
        PA10,
        PA15,
        PB0,
        PB3,
        PB4,
        PB5,
        PB6,
        PC6,
        ADC1,
        SPI1,
        EXTI0,
        ..
    } = hal::init(hal::Config::default());

    // Every rung closed until the control loop applies its first state.
    let switches = SwitchBank::new([
        Output::new(PA8, Level::High, Speed::Low),
        Output::new(PA9, Level::High, Speed::Low),
        Output::new(PA10, Level::High, Speed::Low),
        Output::new(PA15, Level::High, Speed::Low),
        Output::new(PB3, Level::High, Speed::Low),
        Output::new(PB4, Level::High, Speed::Low),
        Output::new(PB5, Level::High, Speed::Low),
        Output::new(PB6, Level::High, Speed::Low),
    ]);
    let mut fault = FaultLed::new(Output::new(PC6, Level::Low, Speed::Low));

    let mut adc = Adc::new(ADC1);
    adc.set_resolution(Resolution::BITS12);
    adc.set_sample_time(SampleTime::CYCLES160_5);
    let adc = &*ADC.init(RefCell::new(adc));
    let load = AdcChannel::new(adc, PA0.degrade_adc());
    let vane = AdcChannel::new(adc, PA1.degrade_adc());

    let mut spi_config = spi::Config::default();
    spi_config.frequency = FLASH_SPI_FREQUENCY;
    let flash = SpiFlashLog::new(
        Spi::new_blocking(SPI1, PA5, PA2, PA6, spi_config),
        Output::new(PA4, Level::High, Speed::VeryHigh),
    );

    let anemometer = ExtiInput::new(PB0, EXTI0, Pull::Up);
    spawner
        .spawn(anemometer_task::run(anemometer, &PULSES))
        .expect("failed to spawn anemometer task");

    let logger = TelemetryLogger::start(flash, &mut fault);
    telemetry::log_startup(logger.startup());

    let now = Instant::now().as_millis();
    let control: FirmwareControl = ControlLoop::new(
        Sampler::new(load, config::LOAD_ADC_SCALE),
        switches,
        ControlConfig::standard(),
        now,
    );
    let pipeline: FirmwarePipeline = TelemetryPipeline::new(
        AnemometerSensor::new(&PULSES, vane, now),
        SoftClock::new(config::INITIAL_DATE_TIME, now),
        logger,
        ConsoleMirror,
    );

    spawner
        .spawn(control_task::run(control, pipeline))
        .expect("failed to spawn control task");

    core::future::pending::<()>().await;
}
