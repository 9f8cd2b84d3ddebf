//! Telemetry records and the persistent log policy.
//!
//! One [`TelemetryRecord`] is produced per telemetry tick and rendered as a
//! single comma-separated line:
//!
//! ```text
//! speed,gust,direction,power,state,voltage,MM/DD HH:MM:SS
//! ```
//!
//! Historical logs are parsed by position, so the field order and separator
//! are fixed. [`TelemetryLogger`] owns the storage backend and applies the
//! degradation rules: storage that is unreachable at startup raises the fault
//! indicator and disables logging for the rest of the run, while a failed
//! append only drops that one record.

use core::fmt::{self, Write as _};

use heapless::String;

use crate::clock::DateTime;
use crate::config::INIT_MARKER;
use crate::ladder::LadderState;
use crate::power::{Power, Volts};
use crate::wind::WindSample;

/// Longest rendered record accepted by [`TelemetryRecord::render`].
pub const RECORD_CAPACITY: usize = 96;

/// Rendered telemetry line.
pub type RecordLine = String<RECORD_CAPACITY>;

/// Snapshot written once per telemetry tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TelemetryRecord {
    pub wind: WindSample,
    pub power: Power,
    pub state: LadderState,
    pub voltage: Volts,
    pub timestamp: DateTime,
}

impl TelemetryRecord {
    /// Renders the record into a fixed-capacity line.
    pub fn render(&self) -> Result<RecordLine, LogError> {
        let mut line = RecordLine::new();
        write!(line, "{self}").map_err(|_| LogError::RecordTooLong)?;
        Ok(line)
    }
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1},{:.1},{:.1},{:.2},{},{:.3},{}",
            self.wind.speed_kmh,
            self.wind.gust_kmh,
            self.wind.direction_deg,
            self.power,
            self.state,
            self.voltage,
            self.timestamp
        )
    }
}

/// Storage failures. None of these ever reach the control path.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogError {
    /// Storage did not respond.
    Unavailable,
    /// The log could not be opened for appending.
    OpenFailed,
    /// The append did not complete.
    WriteFailed,
    /// The rendered record exceeded [`RECORD_CAPACITY`].
    RecordTooLong,
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::Unavailable => f.write_str("storage unavailable"),
            LogError::OpenFailed => f.write_str("log open failed"),
            LogError::WriteFailed => f.write_str("log write failed"),
            LogError::RecordTooLong => f.write_str("record too long"),
        }
    }
}

/// Whether a reachable log already holds data.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogPresence {
    Existing,
    Absent,
}

/// Append-only persistent log.
pub trait RecordLog {
    /// Checks that storage is reachable and whether the log already exists.
    fn open_log(&mut self) -> Result<LogPresence, LogError>;

    /// Appends `line` followed by a line terminator.
    fn append_line(&mut self, line: &str) -> Result<(), LogError>;
}

/// Secondary output each record is mirrored to, such as a debug console.
pub trait DiagnosticMirror {
    fn mirror(&mut self, line: &str);
}

/// Mirror that discards every line.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopMirror;

impl DiagnosticMirror for NoopMirror {
    fn mirror(&mut self, _: &str) {}
}

/// Output raised when storage is unreachable at startup.
pub trait FaultIndicator {
    /// Drives the indicator to its fault level. The level is held.
    fn raise(&mut self);
}

/// Fault indicator with no hardware behind it.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopFaultIndicator;

impl FaultIndicator for NoopFaultIndicator {
    fn raise(&mut self) {}
}

/// Result of handing one record to the logger.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogOutcome {
    Written,
    /// The record was dropped; the next one is attempted normally.
    Skipped(LogError),
    /// Storage was unreachable at startup; nothing is written this run.
    Disabled,
}

/// What [`TelemetryLogger::start`] found.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StartupOutcome {
    /// Prior log found; the power-cycle marker was appended.
    MarkerWritten,
    /// Prior log found but the marker append failed.
    MarkerSkipped(LogError),
    /// Storage reachable with no prior log.
    FreshLog,
    /// Storage unreachable; the fault indicator was raised.
    StorageFault(LogError),
}

/// Applies the logging policy on top of a [`RecordLog`].
#[derive(Debug)]
pub struct TelemetryLogger<L> {
    log: L,
    enabled: bool,
    startup: StartupOutcome,
}

impl<L: RecordLog> TelemetryLogger<L> {
    /// Opens storage once and prepares the log.
    ///
    /// Storage that fails to open raises `fault` and is never retried.
    pub fn start<F: FaultIndicator>(mut log: L, fault: &mut F) -> Self {
        let (enabled, startup) = match log.open_log() {
            Ok(LogPresence::Existing) => match log.append_line(INIT_MARKER) {
                Ok(()) => (true, StartupOutcome::MarkerWritten),
                Err(err) => (true, StartupOutcome::MarkerSkipped(err)),
            },
            Ok(LogPresence::Absent) => (true, StartupOutcome::FreshLog),
            Err(err) => {
                fault.raise();
                (false, StartupOutcome::StorageFault(err))
            }
        };

        Self {
            log,
            enabled,
            startup,
        }
    }

    /// Renders, stores, and mirrors one record.
    ///
    /// The mirror sees every record, including those storage drops.
    pub fn record<M: DiagnosticMirror>(
        &mut self,
        record: &TelemetryRecord,
        mirror: &mut M,
    ) -> LogOutcome {
        let line = match record.render() {
            Ok(line) => line,
            Err(err) => return LogOutcome::Skipped(err),
        };
        mirror.mirror(&line);

        if !self.enabled {
            return LogOutcome::Disabled;
        }

        match self.log.append_line(&line) {
            Ok(()) => LogOutcome::Written,
            Err(err) => LogOutcome::Skipped(err),
        }
    }

    /// Returns `true` while records are being stored.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn startup(&self) -> StartupOutcome {
        self.startup
    }

    pub fn log(&self) -> &L {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec as HeaplessVec;

    struct MockLog {
        presence: Result<LogPresence, LogError>,
        fail_appends: bool,
        lines: HeaplessVec<RecordLine, 8>,
    }

    impl MockLog {
        fn new(presence: Result<LogPresence, LogError>) -> Self {
            Self {
                presence,
                fail_appends: false,
                lines: HeaplessVec::new(),
            }
        }
    }

    impl RecordLog for MockLog {
        fn open_log(&mut self) -> Result<LogPresence, LogError> {
            self.presence
        }

        fn append_line(&mut self, line: &str) -> Result<(), LogError> {
            if self.fail_appends {
                return Err(LogError::WriteFailed);
            }
            let mut stored = RecordLine::new();
            stored.push_str(line).map_err(|_| LogError::RecordTooLong)?;
            self.lines.push(stored).map_err(|_| LogError::WriteFailed)
        }
    }

    #[derive(Default)]
    struct CountingMirror {
        lines: usize,
    }

    impl DiagnosticMirror for CountingMirror {
        fn mirror(&mut self, _: &str) {
            self.lines += 1;
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

    fn sample_record() -> TelemetryRecord {
        TelemetryRecord {
            wind: WindSample {
                speed_kmh: 12.0,
                gust_kmh: 19.2,
                direction_deg: 22.5,
            },
            power: 17.024,
            state: LadderState::new(177),
            voltage: 1.6504,
            timestamp: DateTime::new(6, 21, 14, 3, 9),
        }
    }

    #[test]
    fn record_renders_fields_in_log_order() {
        let line = sample_record().render().expect("record fits");
        assert_eq!(line.as_str(), "12.0,19.2,22.5,17.02,177,1.650,06/21 14:03:09");
    }

    #[test]
    fn existing_log_gets_marker() {
        let mut fault = MockFault::default();
        let logger = TelemetryLogger::start(MockLog::new(Ok(LogPresence::Existing)), &mut fault);

        assert_eq!(logger.startup(), StartupOutcome::MarkerWritten);
        assert_eq!(logger.log().lines[0].as_str(), INIT_MARKER);
        assert!(!fault.raised);
    }

    #[test]
    fn fresh_log_has_no_marker() {
        let mut fault = MockFault::default();
        let logger = TelemetryLogger::start(MockLog::new(Ok(LogPresence::Absent)), &mut fault);

        assert_eq!(logger.startup(), StartupOutcome::FreshLog);
        assert!(logger.log().lines.is_empty());
        assert!(logger.is_enabled());
    }

    #[test]
    fn unreachable_storage_raises_fault_and_disables_logging() {
        let mut fault = MockFault::default();
        let mut mirror = CountingMirror::default();
        let mut logger =
            TelemetryLogger::start(MockLog::new(Err(LogError::Unavailable)), &mut fault);

        assert!(fault.raised);
        assert!(!logger.is_enabled());
        assert_eq!(
            logger.record(&sample_record(), &mut mirror),
            LogOutcome::Disabled
        );
        assert!(logger.log().lines.is_empty());
        assert_eq!(mirror.lines, 1, "mirror still sees records");
    }

    #[test]
    fn failed_append_skips_only_that_record() {
        let mut fault = MockFault::default();
        let mut mirror = NoopMirror;
        let mut logger = TelemetryLogger::start(MockLog::new(Ok(LogPresence::Absent)), &mut fault);

        logger.log.fail_appends = true;
        assert_eq!(
            logger.record(&sample_record(), &mut mirror),
            LogOutcome::Skipped(LogError::WriteFailed)
        );

        logger.log.fail_appends = false;
        assert_eq!(
            logger.record(&sample_record(), &mut mirror),
            LogOutcome::Written
        );
        assert_eq!(logger.log().lines.len(), 1);
    }
}
