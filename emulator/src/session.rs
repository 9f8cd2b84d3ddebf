use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use mppt_core::Millis;
use mppt_core::clock::SoftClock;
use mppt_core::config::{self, ControlConfig};
use mppt_core::control::{ControlLoop, TelemetryPipeline};
use mppt_core::ladder::LadderState;
use mppt_core::sampler::Sampler;
use mppt_core::telemetry::{
    DiagnosticMirror, FaultIndicator, LogError, LogOutcome, LogPresence, RecordLog,
    StartupOutcome, TelemetryLogger,
};
use mppt_core::wind::{AnemometerSensor, PulseCounter};

use crate::plant::{TurbinePlant, WindProfile};

/// Options for one emulator run.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    pub profile: WindProfile,
    pub seconds: u64,
    pub log_path: PathBuf,
    pub echo: bool,
}

/// What a finished run did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSummary {
    pub startup: StartupOutcome,
    pub resistor_ticks: u64,
    pub records_written: u64,
    pub records_skipped: u64,
    pub final_state: LadderState,
    pub final_power: f32,
}

/// Runs the control loop against the simulated plant for the configured
/// number of virtual seconds, one pass per millisecond.
pub fn run(config: &SessionConfig) -> RunSummary {
    let plant = TurbinePlant::new(config.profile);
    let pulses = PulseCounter::new();

    let mut fault = StderrFault;
    let logger = TelemetryLogger::start(FileLog::new(&config.log_path), &mut fault);
    let startup = logger.startup();

    let mut control = ControlLoop::new(
        Sampler::new(plant.load_channel(), config::LOAD_ADC_SCALE),
        plant.switches(),
        ControlConfig::standard(),
        0,
    );
    let mut pipeline = TelemetryPipeline::new(
        AnemometerSensor::new(&pulses, plant.vane_channel(), 0),
        SoftClock::new(config::INITIAL_DATE_TIME, 0),
        logger,
        StdoutMirror {
            enabled: config.echo,
        },
    );

    let mut summary = RunSummary {
        startup,
        resistor_ticks: 0,
        records_written: 0,
        records_skipped: 0,
        final_state: control.controller().state(),
        final_power: 0.0,
    };

    let end: Millis = config.seconds * 1_000;
    for now in 1..=end {
        plant.advance(now, &pulses);
        let report = control.poll(now, &mut pipeline);
        if report.resistor.is_some() {
            summary.resistor_ticks += 1;
        }
        match report.telemetry {
            Some(LogOutcome::Written) => summary.records_written += 1,
            Some(LogOutcome::Skipped(err)) => {
                summary.records_skipped += 1;
                eprintln!("log: record skipped ({err})");
            }
            Some(LogOutcome::Disabled) | None => {}
        }
    }

    let snapshot = control.snapshot();
    summary.final_state = snapshot.state;
    summary.final_power = snapshot.power;
    summary
}

/// Telemetry log kept in a host file.
///
/// Lines end in `\r\n` to match logs pulled off the device.
pub struct FileLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            writer: None,
        }
    }

    fn open(&self) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
    }
}

impl RecordLog for FileLog {
    fn open_log(&mut self) -> Result<LogPresence, LogError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.is_dir()
        {
            return Err(LogError::Unavailable);
        }

        let presence = match fs::metadata(&self.path) {
            Ok(metadata) if metadata.is_file() => LogPresence::Existing,
            Ok(_) => return Err(LogError::OpenFailed),
            Err(_) => LogPresence::Absent,
        };
        let file = self.open().map_err(|_| LogError::OpenFailed)?;
        self.writer = Some(BufWriter::new(file));
        Ok(presence)
    }

    fn append_line(&mut self, line: &str) -> Result<(), LogError> {
        let writer = self.writer.as_mut().ok_or(LogError::OpenFailed)?;
        write!(writer, "{line}\r\n")
            .and_then(|()| writer.flush())
            .map_err(|_| LogError::WriteFailed)
    }
}

/// Echoes telemetry lines to stdout.
pub struct StdoutMirror {
    enabled: bool,
}

impl DiagnosticMirror for StdoutMirror {
    fn mirror(&mut self, line: &str) {
        if self.enabled {
            println!("{line}");
        }
    }
}

/// Reports a storage fault on stderr in place of the fault LED.
pub struct StderrFault;

impl FaultIndicator for StderrFault {
    fn raise(&mut self) {
        eprintln!("fault: storage unavailable, logging disabled");
    }
}
