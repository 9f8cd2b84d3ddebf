use core::time::Duration;

use heapless::{String as HeaplessString, Vec as HeaplessVec};
use mppt_core::climb::{ClimbDecision, ClimbDirection};
use mppt_core::clock::{DateTime, SoftClock};
use mppt_core::config::{ControlConfig, INIT_MARKER, LOAD_ADC_SCALE};
use mppt_core::control::{ControlLoop, TelemetryPipeline};
use mppt_core::ladder::{LadderState, SWITCH_COUNT, SwitchLevel, SwitchSink};
use mppt_core::sampler::{AnalogSource, Sampler};
use mppt_core::scheduler::ScheduleConfig;
use mppt_core::telemetry::{
    DiagnosticMirror, FaultIndicator, LogError, LogOutcome, LogPresence, RecordLog,
    StartupOutcome, TelemetryLogger,
};
use mppt_core::wind::{CalmWind, WindSample, WindSensor};

type Line = HeaplessString<128>;

struct FixedSource(u16);

impl AnalogSource for FixedSource {
    fn convert(&mut self) -> u16 {
        self.0
    }
}

struct ScriptedSource {
    codes: HeaplessVec<u16, 16>,
    next: usize,
}

impl ScriptedSource {
    fn new(codes: &[u16]) -> Self {
        Self {
            codes: HeaplessVec::from_slice(codes).expect("script fits"),
            next: 0,
        }
    }
}

impl AnalogSource for ScriptedSource {
    fn convert(&mut self) -> u16 {
        let code = self.codes[self.next.min(self.codes.len() - 1)];
        self.next += 1;
        code
    }
}

#[derive(Default)]
struct MockSwitches {
    levels: [Option<SwitchLevel>; SWITCH_COUNT],
    writes: usize,
}

impl SwitchSink for MockSwitches {
    fn write(&mut self, index: usize, level: SwitchLevel) {
        self.levels[index] = Some(level);
        self.writes += 1;
    }
}

struct MockLog {
    presence: Result<LogPresence, LogError>,
    lines: HeaplessVec<Line, 16>,
}

impl MockLog {
    fn new(presence: Result<LogPresence, LogError>) -> Self {
        Self {
            presence,
            lines: HeaplessVec::new(),
        }
    }
}

impl RecordLog for MockLog {
    fn open_log(&mut self) -> Result<LogPresence, LogError> {
        self.presence
    }

    fn append_line(&mut self, line: &str) -> Result<(), LogError> {
        let mut stored = Line::new();
        stored.push_str(line).map_err(|_| LogError::RecordTooLong)?;
        self.lines.push(stored).map_err(|_| LogError::WriteFailed)
    }
}

#[derive(Default)]
struct MockMirror {
    lines: HeaplessVec<Line, 16>,
}

impl DiagnosticMirror for MockMirror {
    fn mirror(&mut self, line: &str) {
        let mut stored = Line::new();
        stored.push_str(line).expect("mirror line fits");
        self.lines.push(stored).expect("mirror capacity");
    }
}

#[derive(Default)]
struct MockFault {
    raised: bool,
}

impl FaultIndicator for MockFault {
    fn raise(&mut self) {
        self.raised = true;
    }
}

struct SteadyWind;

impl WindSensor for SteadyWind {
    fn sample(&mut self, _: u64) -> WindSample {
        WindSample {
            speed_kmh: 14.4,
            gust_kmh: 21.6,
            direction_deg: 90.0,
        }
    }
}

fn test_config() -> ControlConfig {
    ControlConfig::standard().with_schedule(ScheduleConfig::new(
        Duration::from_millis(100),
        Duration::from_millis(1_000),
    ))
}

#[test]
fn mid_scale_reading_at_full_conduction_estimates_expected_power() {
    let sampler = Sampler::new(FixedSource(2048), LOAD_ADC_SCALE);
    let mut control = ControlLoop::new(sampler, MockSwitches::default(), test_config(), 0);

    let tick = control.resistor_tick();
    assert!((tick.voltage - 1.6504).abs() < 1e-3, "voltage {}", tick.voltage);
    assert!((tick.power - 17.02).abs() < 0.02, "power {}", tick.power);
    assert_eq!(tick.decision, ClimbDecision::Continued);
    assert_eq!(tick.state, LadderState::new(254));
}

#[test]
fn construction_applies_initial_state_to_every_switch() {
    let config = ControlConfig {
        initial_state: LadderState::new(0b1011_0001),
        ..test_config()
    };
    let sampler = Sampler::new(FixedSource(0), LOAD_ADC_SCALE);
    let control = ControlLoop::new(sampler, MockSwitches::default(), config, 0);

    let switches = control.switches();
    assert_eq!(switches.writes, SWITCH_COUNT);
    let closed: HeaplessVec<usize, 8> = switches
        .levels
        .iter()
        .enumerate()
        .filter(|(_, level)| **level == Some(SwitchLevel::Closed))
        .map(|(index, _)| index)
        .collect();
    assert_eq!(closed.as_slice(), &[0, 4, 5, 7]);
    assert!(switches.levels.iter().all(Option::is_some));
}

#[test]
fn scheduler_gates_resistor_and_telemetry_ticks() {
    let sampler = Sampler::new(ScriptedSource::new(&[2048, 2100]), LOAD_ADC_SCALE);
    let mut control = ControlLoop::new(sampler, MockSwitches::default(), test_config(), 0);

    let mut fault = MockFault::default();
    let logger = TelemetryLogger::start(MockLog::new(Ok(LogPresence::Existing)), &mut fault);
    let mut pipeline = TelemetryPipeline::new(
        SteadyWind,
        SoftClock::new(DateTime::new(5, 4, 12, 0, 0), 0),
        logger,
        MockMirror::default(),
    );

    let mut resistor_ticks = 0;
    let mut telemetry_ticks = 0;
    for now in [0, 50, 150, 1_050] {
        let report = control.poll(now, &mut pipeline);
        resistor_ticks += usize::from(report.resistor.is_some());
        if let Some(outcome) = report.telemetry {
            assert_eq!(outcome, LogOutcome::Written);
            telemetry_ticks += 1;
        }
    }

    assert_eq!(resistor_ticks, 2);
    assert_eq!(telemetry_ticks, 1);
    assert_eq!(control.scheduler().resistor_deadline().next(), 1_150);
    assert_eq!(control.scheduler().telemetry_deadline().next(), 2_050);

    // Opening rung 0 raises resistance from 0.16 to 1.14 ohms, so the second
    // tick sees less power and steps back up in the falling phase.
    assert_eq!(control.controller().state(), LadderState::MAX);
    assert_eq!(control.controller().direction(), ClimbDirection::Falling);

    assert_eq!(pipeline.logger.startup(), StartupOutcome::MarkerWritten);
    let lines = &pipeline.logger.log().lines;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].as_str(), INIT_MARKER);

    let snapshot = control.snapshot();
    let fields: HeaplessVec<&str, 8> = lines[1].split(',').collect();
    assert_eq!(fields.len(), 7);
    assert_eq!(fields[0], "14.4");
    assert_eq!(fields[1], "21.6");
    assert_eq!(fields[2], "90.0");
    assert_eq!(fields[4], "255");
    assert_eq!(fields[6], "05/04 12:00:01");
    assert!((fields[3].parse::<f32>().expect("power field") - snapshot.power).abs() < 0.01);
    assert!((fields[5].parse::<f32>().expect("voltage field") - snapshot.voltage).abs() < 1e-3);

    assert_eq!(pipeline.mirror.lines.len(), 1);
    assert_eq!(pipeline.mirror.lines[0], lines[1]);
}

#[test]
fn control_keeps_running_without_storage() {
    let sampler = Sampler::new(FixedSource(1000), LOAD_ADC_SCALE);
    let mut control = ControlLoop::new(sampler, MockSwitches::default(), test_config(), 0);

    let mut fault = MockFault::default();
    let logger = TelemetryLogger::start(MockLog::new(Err(LogError::Unavailable)), &mut fault);
    let mut pipeline = TelemetryPipeline::new(
        CalmWind,
        SoftClock::new(DateTime::new(1, 1, 0, 0, 0), 0),
        logger,
        MockMirror::default(),
    );
    assert!(fault.raised);

    let mut now = 0;
    let mut resistor_ticks = 0;
    let mut disabled = 0;
    while now <= 3_500 {
        let report = control.poll(now, &mut pipeline);
        resistor_ticks += usize::from(report.resistor.is_some());
        if report.telemetry == Some(LogOutcome::Disabled) {
            disabled += 1;
        }
        now += 10;
    }

    // Polling every 10 ms against a strict deadline fires at 110, 220, ... 3410.
    assert_eq!(resistor_ticks, 31);
    assert_eq!(disabled, 3);
    assert!(pipeline.logger.log().lines.is_empty());
    assert_eq!(pipeline.mirror.lines.len(), 3);
}
