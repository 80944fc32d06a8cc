use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::sequencer::TargetReport;
use crate::types::{FailureKind, SequenceOutcome};

// ---------------------------------------------------------------------------
// RunLog
// ---------------------------------------------------------------------------

/// Statistics for one run, built up by appending.
///
/// There is no interior locking: the driver is the only writer, and pooled
/// workers hand their reports to it over a channel.
#[derive(Debug, Clone)]
pub struct RunLog {
    run_id: Uuid,
    bad_slews: u32,
    bad_dithers: u32,
    bad_guides: u32,
    advisory_failures: u32,
    completed: usize,
    skipped: usize,
    slew_times: Vec<Duration>,
    dither_times: Vec<Duration>,
    error_times: Vec<DateTime<Local>>,
    failed_targets: Vec<String>,
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            bad_slews: 0,
            bad_dithers: 0,
            bad_guides: 0,
            advisory_failures: 0,
            completed: 0,
            skipped: 0,
            slew_times: Vec::new(),
            dither_times: Vec::new(),
            error_times: Vec::new(),
            failed_targets: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn add_slew_time(&mut self, elapsed: Duration) {
        self.slew_times.push(elapsed);
    }

    pub fn add_dither_time(&mut self, elapsed: Duration) {
        self.dither_times.push(elapsed);
    }

    pub fn add_failure(&mut self, kind: FailureKind) {
        match kind {
            FailureKind::Slew => self.bad_slews += 1,
            FailureKind::Dither => self.bad_dithers += 1,
            FailureKind::Guide => self.bad_guides += 1,
        }
    }

    pub fn add_failed_target(&mut self, name: impl Into<String>) {
        self.failed_targets.push(name.into());
    }

    pub fn add_error_time(&mut self, at: DateTime<Local>) {
        self.error_times.push(at);
    }

    pub fn add_advisory_failure(&mut self) {
        self.advisory_failures += 1;
    }

    /// Fold one target's report into the log.
    ///
    /// Slew and dither failures put the target on the failed list with a
    /// timestamp. Guide failures only bump their counter.
    pub fn record(&mut self, report: &TargetReport) {
        if let Some(elapsed) = report.slew_time {
            self.add_slew_time(elapsed);
        }
        for &elapsed in &report.dither_times {
            self.add_dither_time(elapsed);
        }
        for _ in &report.advisories {
            self.add_advisory_failure();
        }

        match &report.outcome {
            SequenceOutcome::Completed { .. } => self.completed += 1,
            SequenceOutcome::Skipped { .. } => self.skipped += 1,
            SequenceOutcome::SlewFailed { target, .. }
            | SequenceOutcome::DitherFailed { target, .. } => {
                if let Some(kind) = report.outcome.failure_kind() {
                    self.add_failure(kind);
                }
                self.add_error_time(report.failed_at.unwrap_or_else(Local::now));
                self.add_failed_target(target.clone());
            }
            SequenceOutcome::GuideFailed { .. } => self.add_failure(FailureKind::Guide),
        }
    }

    pub fn summarize(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            completed: self.completed,
            skipped: self.skipped,
            bad_slews: self.bad_slews,
            bad_dithers: self.bad_dithers,
            bad_guides: self.bad_guides,
            advisory_failures: self.advisory_failures,
            slew_times: seconds(&self.slew_times),
            dither_times: seconds(&self.dither_times),
            max_slew_time: longest(&self.slew_times),
            max_dither_time: longest(&self.dither_times),
            failed_targets: self.failed_targets.clone(),
            error_times: self.error_times.clone(),
        }
    }
}

fn seconds(samples: &[Duration]) -> Vec<f64> {
    samples.iter().map(Duration::as_secs_f64).collect()
}

fn longest(samples: &[Duration]) -> Option<f64> {
    samples.iter().max().map(Duration::as_secs_f64)
}

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

/// End-of-run statistics. Times are in seconds.
///
/// `max_slew_time` and `max_dither_time` are `None` when there are no
/// samples to take a maximum over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub completed: usize,
    pub skipped: usize,
    pub bad_slews: u32,
    pub bad_dithers: u32,
    pub bad_guides: u32,
    pub advisory_failures: u32,
    pub slew_times: Vec<f64>,
    pub dither_times: Vec<f64>,
    pub max_slew_time: Option<f64>,
    pub max_dither_time: Option<f64>,
    pub failed_targets: Vec<String>,
    pub error_times: Vec<DateTime<Local>>,
}

impl RunSummary {
    pub fn total_failures(&self) -> u32 {
        self.bad_slews + self.bad_dithers + self.bad_guides
    }
}
