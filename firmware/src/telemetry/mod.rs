//! Console output for the controller.
//!
//! Telemetry lines and startup notices go to defmt on the target and to
//! stdout on host builds, so the same call sites work in both.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use mppt_core::control::PassReport;
use mppt_core::telemetry::{DiagnosticMirror, LogOutcome, StartupOutcome};

/// Mirrors every telemetry line to the debug console.
#[derive(Copy, Clone, Debug, Default)]
pub struct ConsoleMirror;

impl DiagnosticMirror for ConsoleMirror {
    fn mirror(&mut self, line: &str) {
        emit_record(line);
    }
}

/// Reports how storage came up.
pub fn log_startup(outcome: StartupOutcome) {
    match outcome {
        StartupOutcome::MarkerWritten => emit_notice("log: existing log, marker appended"),
        StartupOutcome::FreshLog => emit_notice("log: fresh log"),
        StartupOutcome::MarkerSkipped(_) => emit_notice("log: marker append failed"),
        StartupOutcome::StorageFault(_) => {
            emit_notice("log: storage unavailable, logging disabled");
        }
    }
}

/// Reports a pass that dropped its telemetry record.
pub fn log_pass(report: &PassReport) {
    if let Some(LogOutcome::Skipped(_)) = report.telemetry {
        emit_notice("log: record skipped");
    }
}

#[cfg(target_os = "none")]
fn emit_record(line: &str) {
    defmt::info!("{=str}", line);
}

#[cfg(not(target_os = "none"))]
fn emit_record(line: &str) {
    println!("{line}");
}

#[cfg(target_os = "none")]
fn emit_notice(message: &'static str) {
    defmt::warn!("{=str}", message);
}

#[cfg(not(target_os = "none"))]
fn emit_notice(message: &'static str) {
    println!("{message}");
}
