//! The cooperative control loop.
//!
//! [`ControlLoop`] owns every piece of controller state: the hill-climb state
//! machine, the ladder driver, the sampler, both tick deadlines, and the most
//! recent voltage and power. It is constructed once and polled from a single
//! loop. Each [`ControlLoop::poll`] checks the resistor tick first and the
//! telemetry tick second against the same `now`.
//!
//! The telemetry side is bundled in a [`TelemetryPipeline`] so the firmware
//! and the emulator can plug in their own wind sensor, clock, storage, and
//! diagnostic mirror.

use crate::Millis;
use crate::climb::{ClimbDecision, ClimbDirection, HillClimbController};
use crate::clock::WallClock;
use crate::config::ControlConfig;
use crate::ladder::{LadderDriver, LadderState, SwitchSink};
use crate::power::{Power, ResistanceNetwork, Volts};
use crate::sampler::{AnalogSource, Sampler};
use crate::scheduler::TickScheduler;
use crate::telemetry::{DiagnosticMirror, LogOutcome, RecordLog, TelemetryLogger, TelemetryRecord};
use crate::wind::WindSensor;

/// Outcome of one resistor tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResistorTick {
    pub voltage: Volts,
    pub power: Power,
    pub decision: ClimbDecision,
    pub state: LadderState,
}

/// What ran during a single [`ControlLoop::poll`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PassReport {
    pub resistor: Option<ResistorTick>,
    pub telemetry: Option<LogOutcome>,
}

/// Wind sensor, clock, storage, and mirror used by the telemetry tick.
pub struct TelemetryPipeline<W, C, L, M> {
    pub wind: W,
    pub clock: C,
    pub logger: TelemetryLogger<L>,
    pub mirror: M,
}

impl<W, C, L, M> TelemetryPipeline<W, C, L, M>
where
    W: WindSensor,
    C: WallClock,
    L: RecordLog,
    M: DiagnosticMirror,
{
    pub const fn new(wind: W, clock: C, logger: TelemetryLogger<L>, mirror: M) -> Self {
        Self {
            wind,
            clock,
            logger,
            mirror,
        }
    }

    /// Builds a record from the latest controller values and hands it to the logger.
    pub fn tick(&mut self, now: Millis, snapshot: ControlSnapshot) -> LogOutcome {
        let record = TelemetryRecord {
            wind: self.wind.sample(now),
            power: snapshot.power,
            state: snapshot.state,
            voltage: snapshot.voltage,
            timestamp: self.clock.now(now),
        };
        self.logger.record(&record, &mut self.mirror)
    }
}

/// Controller values copied into each telemetry record.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ControlSnapshot {
    pub power: Power,
    pub state: LadderState,
    pub voltage: Volts,
}

/// Sampler, power model, hill-climb controller, ladder driver, and scheduler
/// combined into one pollable loop.
pub struct ControlLoop<A, S> {
    sampler: Sampler<A>,
    driver: LadderDriver<S>,
    controller: HillClimbController,
    scheduler: TickScheduler,
    network: ResistanceNetwork,
    last_voltage: Volts,
    last_power: Power,
}

impl<A: AnalogSource, S: SwitchSink> ControlLoop<A, S> {
    /// Builds the loop at `now` and drives the ladder to the initial state.
    pub fn new(sampler: Sampler<A>, switches: S, config: ControlConfig, now: Millis) -> Self {
        let controller =
            HillClimbController::starting_at(config.initial_state, ClimbDirection::Rising);
        let mut driver = LadderDriver::new(switches);
        driver.apply(controller.state());

        Self {
            sampler,
            driver,
            controller,
            scheduler: TickScheduler::new(config.schedule, now),
            network: config.network,
            last_voltage: 0.0,
            last_power: HillClimbController::INITIAL_POWER,
        }
    }

    /// One cooperative pass: resistor tick, then telemetry tick, each only when due.
    pub fn poll<W, C, L, M>(
        &mut self,
        now: Millis,
        pipeline: &mut TelemetryPipeline<W, C, L, M>,
    ) -> PassReport
    where
        W: WindSensor,
        C: WallClock,
        L: RecordLog,
        M: DiagnosticMirror,
    {
        let resistor = self
            .scheduler
            .fire_resistor(now)
            .then(|| self.resistor_tick());

        let telemetry = self
            .scheduler
            .fire_telemetry(now)
            .then(|| pipeline.tick(now, self.snapshot()));

        PassReport {
            resistor,
            telemetry,
        }
    }

    /// Samples, estimates power, steps the controller, and applies the new state.
    pub fn resistor_tick(&mut self) -> ResistorTick {
        let voltage = self.sampler.acquire();
        let power = self.network.power_of(voltage, self.controller.state());
        let decision = self.controller.step(power);
        let state = self.controller.state();
        self.driver.apply(state);

        self.last_voltage = voltage;
        self.last_power = power;

        ResistorTick {
            voltage,
            power,
            decision,
            state,
        }
    }

    /// Latest controller values.
    #[must_use]
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            power: self.last_power,
            state: self.controller.state(),
            voltage: self.last_voltage,
        }
    }

    #[must_use]
    pub const fn controller(&self) -> &HillClimbController {
        &self.controller
    }

    #[must_use]
    pub const fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn switches(&self) -> &S {
        self.driver.sink()
    }
}
