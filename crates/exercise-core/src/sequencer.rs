//! Per-target slew, dither and guide sequence.
//!
//! ```text
//! Idle ──cancelled──▶ Skipped
//!  │
//!  ▼
//! Slewing ──fail──▶ Failed(Slew)
//!  │
//!  ▼  (if dithering)
//! Dithering N → S → E → W ──first fail──▶ Failed(Dither)
//!  │
//!  ▼  (if guiding)
//! Guiding: magic, hold, stop ──fail──▶ Failed(Guide)
//!  │        └─ plots (advisory)
//!  ▼
//! Done
//! ```
//!
//! Cancellation is only looked at in `Idle`. Once the mount starts moving
//! for a target the sequence runs to completion or to its first failure.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::cancel::CancellationSignal;
use crate::commands::CommandSet;
use crate::config::ExerciseConfig;
use crate::error::Result;
use crate::gateway::{Actuator, ActuatorCommand};
use crate::types::{Direction, FailureKind, GuideStep, SequenceOutcome, Target};

// ---------------------------------------------------------------------------
// SequencePlan
// ---------------------------------------------------------------------------

/// Which steps run for each target and how long the pauses between them are.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencePlan {
    pub dither: bool,
    pub guide: bool,
    pub notify: bool,
    /// Pause before the first dither and after each successful one.
    pub settle: Duration,
    /// How long to let the guider run before stopping it.
    pub guide_duration: Duration,
}

impl SequencePlan {
    pub fn from_config(config: &ExerciseConfig) -> Self {
        Self {
            dither: config.dither,
            guide: config.guide,
            notify: config.notify,
            settle: config.settle(),
            guide_duration: config.guide_duration(),
        }
    }
}

// ---------------------------------------------------------------------------
// SequenceState / TargetReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    Idle,
    Slewing,
    Dithering(Direction),
    Guiding,
    Done,
    Failed(FailureKind),
    Skipped,
}

/// Everything one target contributes to the run log.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetReport {
    pub outcome: SequenceOutcome,
    /// Present only for a successful slew.
    pub slew_time: Option<Duration>,
    pub dither_times: Vec<Duration>,
    pub failed_at: Option<DateTime<Local>>,
    /// Advisory failures that did not change the outcome.
    pub advisories: Vec<String>,
}

impl TargetReport {
    pub fn new(outcome: SequenceOutcome) -> Self {
        Self {
            outcome,
            slew_time: None,
            dither_times: Vec::new(),
            failed_at: None,
            advisories: Vec::new(),
        }
    }

    pub fn final_state(&self) -> SequenceState {
        match &self.outcome {
            SequenceOutcome::Completed { .. } => SequenceState::Done,
            SequenceOutcome::Skipped { .. } => SequenceState::Skipped,
            other => other
                .failure_kind()
                .map_or(SequenceState::Done, SequenceState::Failed),
        }
    }

    fn fail(mut self, outcome: SequenceOutcome) -> Self {
        self.failed_at = Some(Local::now());
        self.outcome = outcome;
        self
    }
}

enum Step {
    Succeeded(Duration),
    Failed(String),
}

// ---------------------------------------------------------------------------
// Sequencer
// ---------------------------------------------------------------------------

pub struct Sequencer<'a, A: ?Sized> {
    actuator: &'a A,
    commands: &'a CommandSet,
    plan: &'a SequencePlan,
    cancel: &'a CancellationSignal,
}

impl<'a, A: Actuator + ?Sized> Sequencer<'a, A> {
    pub fn new(
        actuator: &'a A,
        commands: &'a CommandSet,
        plan: &'a SequencePlan,
        cancel: &'a CancellationSignal,
    ) -> Self {
        Self {
            actuator,
            commands,
            plan,
            cancel,
        }
    }

    /// Drive one target through its sequence.
    ///
    /// Step failures, launch failures and timeouts come back as the
    /// report's outcome. `Err` means the gateway itself broke and the run
    /// cannot go on.
    pub fn run_target(&self, target: &Target) -> Result<TargetReport> {
        let name = target.name.as_str();

        if self.cancel.is_cancel_requested() {
            transition(name, SequenceState::Skipped);
            info!(target_name = %name, "skipped: cancellation requested");
            return Ok(TargetReport::new(SequenceOutcome::Skipped {
                target: name.to_string(),
            }));
        }

        let mut report = TargetReport::new(SequenceOutcome::Completed {
            target: name.to_string(),
        });

        transition(name, SequenceState::Slewing);
        info!(
            target_name = %name,
            ra_hours = target.right_ascension / 15.0,
            lst_hours = target.local_sidereal_time,
            ha_hours = target.hour_angle,
            altitude = target.altitude,
            azimuth = target.azimuth,
            "slewing"
        );
        match self.attempt(&self.commands.goto(name), "mount goto")? {
            Step::Failed(message) => {
                transition(name, SequenceState::Failed(FailureKind::Slew));
                warn!(target_name = %name, %message, "error slewing to target");
                return Ok(report.fail(SequenceOutcome::SlewFailed {
                    target: name.to_string(),
                    message,
                }));
            }
            Step::Succeeded(elapsed) => {
                info!(target_name = %name, elapsed_s = elapsed.as_secs_f64(), "slew done");
                report.slew_time = Some(elapsed);
            }
        }

        if self.plan.dither {
            pause(self.plan.settle);
            for direction in Direction::SEQUENCE {
                transition(name, SequenceState::Dithering(direction));
                match self.attempt(&self.commands.dither(direction), "mount dither")? {
                    Step::Failed(message) => {
                        transition(name, SequenceState::Failed(FailureKind::Dither));
                        warn!(target_name = %name, %direction, %message, "error dithering around target");
                        return Ok(report.fail(SequenceOutcome::DitherFailed {
                            target: name.to_string(),
                            direction,
                            message,
                        }));
                    }
                    Step::Succeeded(elapsed) => {
                        info!(
                            target_name = %name,
                            %direction,
                            elapsed_s = elapsed.as_secs_f64(),
                            "dither done"
                        );
                        report.dither_times.push(elapsed);
                        pause(self.plan.settle);
                    }
                }
            }
        }

        if self.plan.guide {
            transition(name, SequenceState::Guiding);
            if let Some(failed) = self.guide(name) {
                return Ok(report.fail(failed?));
            }
            if self.plan.notify {
                if let Step::Failed(message) =
                    self.attempt(&self.commands.send_guide_plots(), "guide plot notifier")?
                {
                    warn!(target_name = %name, %message, "guide plots not sent");
                    report.advisories.push(message);
                }
            }
        }

        transition(name, SequenceState::Done);
        Ok(report)
    }

    /// Find a guide star, hold, stop. `None` when both commands succeed.
    fn guide(&self, name: &str) -> Option<Result<SequenceOutcome>> {
        let failed = |step, message: String| {
            transition(name, SequenceState::Failed(FailureKind::Guide));
            warn!(target_name = %name, ?step, %message, "error guiding on target");
            SequenceOutcome::GuideFailed {
                target: name.to_string(),
                step,
                message,
            }
        };

        info!(target_name = %name, "searching for guide star");
        match self.attempt(&self.commands.find_guide_star(), "guider magic") {
            Err(e) => return Some(Err(e)),
            Ok(Step::Failed(message)) => return Some(Ok(failed(GuideStep::FindStar, message))),
            Ok(Step::Succeeded(_)) => {}
        }

        info!(
            target_name = %name,
            seconds = self.plan.guide_duration.as_secs_f64(),
            "guiding"
        );
        pause(self.plan.guide_duration);

        info!(target_name = %name, "stopping autoguider");
        match self.attempt(&self.commands.stop_guiding(), "guider stop") {
            Err(e) => Some(Err(e)),
            Ok(Step::Failed(message)) => Some(Ok(failed(GuideStep::Stop, message))),
            Ok(Step::Succeeded(_)) => None,
        }
    }

    /// Invoke one command, timing the gateway call alone.
    fn attempt(&self, command: &ActuatorCommand, what: &str) -> Result<Step> {
        let started = Instant::now();
        let invoked = self.actuator.invoke(command);
        let elapsed = started.elapsed();

        match invoked {
            Ok(result) => {
                debug!(
                    command = %command.display(),
                    stdout = %result.stdout.trim_end(),
                    stderr = %result.stderr.trim_end(),
                    "actuator output"
                );
                if result.success() {
                    Ok(Step::Succeeded(elapsed))
                } else {
                    Ok(Step::Failed(result.failure_message(what)))
                }
            }
            Err(e) if e.is_launch_failure() => Ok(Step::Failed(e.to_string())),
            Err(e) => Err(e),
        }
    }
}

fn transition(target: &str, state: SequenceState) {
    debug!(target_name = %target, ?state, "sequence state");
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Reply, ScriptedActuator};

    fn target(name: &str) -> Target {
        Target {
            name: name.to_string(),
            altitude: 60.0,
            azimuth: 120.0,
            right_ascension: 279.2,
            declination: 38.8,
            hour_angle: -1.5,
            local_sidereal_time: 17.1,
            magnitude: 0.0,
        }
    }

    fn plan(dither: bool, guide: bool) -> SequencePlan {
        SequencePlan {
            dither,
            guide,
            notify: true,
            settle: Duration::ZERO,
            guide_duration: Duration::ZERO,
        }
    }

    fn run(actuator: &ScriptedActuator, plan: &SequencePlan, cancel: &CancellationSignal) -> TargetReport {
        let commands = CommandSet::from_config(&ExerciseConfig::default());
        Sequencer::new(actuator, &commands, plan, cancel)
            .run_target(&target("A"))
            .unwrap()
    }

    fn failing_on(tail: &'static [&'static str], reply: Reply) -> ScriptedActuator {
        ScriptedActuator::new(move |c| if c.ends_with(tail) { reply } else { Reply::Exit(0) })
    }

    #[test]
    fn full_sequence_in_order() {
        let actuator = ScriptedActuator::succeeding();
        let report = run(&actuator, &plan(true, true), &CancellationSignal::new());

        assert!(report.outcome.is_completed());
        assert_eq!(report.final_state(), SequenceState::Done);
        assert!(report.slew_time.is_some());
        assert_eq!(report.dither_times.len(), 4);
        assert_eq!(report.failed_at, None);
        assert_eq!(
            actuator.call_lines(),
            vec![
                "mount goto A",
                "mount dither 45 N",
                "mount dither 45 S",
                "mount dither 45 E",
                "mount dither 45 W",
                "guider magic",
                "guider stop",
                "email_guider_plots",
            ]
        );
    }

    #[test]
    fn slew_only_when_dither_and_guide_disabled() {
        let actuator = ScriptedActuator::succeeding();
        let report = run(&actuator, &plan(false, false), &CancellationSignal::new());
        assert!(report.outcome.is_completed());
        assert_eq!(actuator.call_lines(), vec!["mount goto A"]);
    }

    #[test]
    fn failed_slew_stops_the_target_without_timing() {
        let actuator = failing_on(&["goto", "A"], Reply::Exit(1));
        let report = run(&actuator, &plan(true, true), &CancellationSignal::new());

        assert!(matches!(report.outcome, SequenceOutcome::SlewFailed { .. }));
        assert_eq!(report.final_state(), SequenceState::Failed(FailureKind::Slew));
        assert_eq!(report.slew_time, None);
        assert!(report.dither_times.is_empty());
        assert!(report.failed_at.is_some());
        assert_eq!(actuator.calls().len(), 1);
    }

    #[test]
    fn first_dither_failure_keeps_only_the_slew_sample() {
        let actuator = failing_on(&["dither", "45", "N"], Reply::Exit(2));
        let report = run(&actuator, &plan(true, true), &CancellationSignal::new());

        match &report.outcome {
            SequenceOutcome::DitherFailed { direction, .. } => {
                assert_eq!(*direction, Direction::North)
            }
            other => panic!("expected DitherFailed, got {other:?}"),
        }
        assert!(report.slew_time.is_some());
        assert!(report.dither_times.is_empty());
        assert_eq!(actuator.call_lines(), vec!["mount goto A", "mount dither 45 N"]);
    }

    #[test]
    fn south_dither_failure_skips_east_west_and_guiding() {
        let actuator = failing_on(&["dither", "45", "S"], Reply::Exit(1));
        let report = run(&actuator, &plan(true, true), &CancellationSignal::new());

        assert_eq!(report.outcome.failure_kind(), Some(FailureKind::Dither));
        assert_eq!(report.dither_times.len(), 1);
        assert_eq!(
            actuator.call_lines(),
            vec!["mount goto A", "mount dither 45 N", "mount dither 45 S"]
        );
    }

    #[test]
    fn guide_without_dither_follows_the_slew() {
        let actuator = ScriptedActuator::succeeding();
        run(&actuator, &plan(false, true), &CancellationSignal::new());
        assert_eq!(
            actuator.call_lines(),
            vec!["mount goto A", "guider magic", "guider stop", "email_guider_plots"]
        );
    }

    #[test]
    fn no_guide_star_does_not_stop_the_guider() {
        let actuator = failing_on(&["magic"], Reply::Exit(1));
        let report = run(&actuator, &plan(false, true), &CancellationSignal::new());

        match &report.outcome {
            SequenceOutcome::GuideFailed { step, .. } => assert_eq!(*step, GuideStep::FindStar),
            other => panic!("expected GuideFailed, got {other:?}"),
        }
        assert_eq!(actuator.call_lines(), vec!["mount goto A", "guider magic"]);
    }

    #[test]
    fn guider_stop_failure_is_a_guide_failure() {
        let actuator = ScriptedActuator::new(|c| {
            if c.program == "guider" && c.ends_with(&["stop"]) {
                Reply::Exit(4)
            } else {
                Reply::Exit(0)
            }
        });
        let report = run(&actuator, &plan(false, true), &CancellationSignal::new());
        assert!(matches!(
            report.outcome,
            SequenceOutcome::GuideFailed {
                step: GuideStep::Stop,
                ..
            }
        ));
        assert!(!actuator.call_lines().contains(&"email_guider_plots".to_string()));
    }

    #[test]
    fn notifier_failure_is_advisory() {
        let actuator = ScriptedActuator::new(|c| {
            if c.program == "email_guider_plots" {
                Reply::NotFound
            } else {
                Reply::Exit(0)
            }
        });
        let report = run(&actuator, &plan(false, true), &CancellationSignal::new());
        assert!(report.outcome.is_completed());
        assert_eq!(report.advisories.len(), 1);
        assert!(report.advisories[0].contains("email_guider_plots"));
    }

    #[test]
    fn notifier_can_be_disabled() {
        let actuator = ScriptedActuator::succeeding();
        let mut p = plan(false, true);
        p.notify = false;
        run(&actuator, &p, &CancellationSignal::new());
        assert_eq!(
            actuator.call_lines(),
            vec!["mount goto A", "guider magic", "guider stop"]
        );
    }

    #[test]
    fn cancelled_before_start_is_skipped_without_commands() {
        let actuator = ScriptedActuator::succeeding();
        let cancel = CancellationSignal::new();
        cancel.request_cancel();
        let report = run(&actuator, &plan(true, true), &cancel);

        assert!(report.outcome.is_skipped());
        assert_eq!(report.final_state(), SequenceState::Skipped);
        assert!(actuator.calls().is_empty());
    }

    #[test]
    fn cancel_during_slew_does_not_abort_the_target() {
        let cancel = CancellationSignal::new();
        let from_handler = cancel.clone();
        let actuator = ScriptedActuator::succeeding().with_hook(move |c| {
            if c.ends_with(&["goto", "A"]) {
                from_handler.request_cancel();
            }
        });
        let report = run(&actuator, &plan(true, true), &cancel);

        assert!(cancel.is_cancel_requested());
        assert!(report.outcome.is_completed());
        assert_eq!(actuator.calls().len(), 8);
    }

    #[test]
    fn launch_failure_and_timeout_are_step_failures() {
        let actuator = failing_on(&["goto", "A"], Reply::NotFound);
        let report = run(&actuator, &plan(true, false), &CancellationSignal::new());
        let message = report.outcome.message().unwrap();
        assert!(matches!(report.outcome, SequenceOutcome::SlewFailed { .. }));
        assert!(message.contains("failed to launch 'mount'"), "{message}");

        let actuator = failing_on(&["dither", "45", "E"], Reply::TimedOut);
        let report = run(&actuator, &plan(true, false), &CancellationSignal::new());
        assert!(matches!(
            report.outcome,
            SequenceOutcome::DitherFailed {
                direction: Direction::East,
                ..
            }
        ));
        assert!(report.outcome.message().unwrap().starts_with("actuator timed out"));
        assert_eq!(report.dither_times.len(), 2);
    }

    #[test]
    fn broken_gateway_is_fatal() {
        let actuator = failing_on(&["dither", "45", "W"], Reply::Broken);
        let commands = CommandSet::from_config(&ExerciseConfig::default());
        let plan = plan(true, true);
        let cancel = CancellationSignal::new();
        let result = Sequencer::new(&actuator, &commands, &plan, &cancel).run_target(&target("A"));
        assert!(result.is_err());
        assert!(!result.unwrap_err().is_launch_failure());
    }
}
