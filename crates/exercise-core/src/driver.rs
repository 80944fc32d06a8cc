use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;

use tracing::{info, info_span, warn};

use crate::cancel::CancellationSignal;
use crate::commands::CommandSet;
use crate::config::ExerciseConfig;
use crate::error::{ExerciseError, Result};
use crate::gateway::{Actuator, ActuatorResult};
use crate::run_log::RunLog;
use crate::selector::WorkQueue;
use crate::sequencer::{SequencePlan, Sequencer, TargetReport};
use crate::types::SequenceOutcome;

/// A run cut short by an unclassified error. `outcomes` holds, in queue
/// order, every target that finished before the run stopped.
#[derive(Debug, thiserror::Error)]
#[error("run aborted after {} finished target(s)", .outcomes.len())]
pub struct RunAborted {
    pub outcomes: Vec<SequenceOutcome>,
    #[source]
    pub error: ExerciseError,
}

/// Owns everything one exercise run needs: the actuator, the command
/// lines, the per-target plan, the cancellation signal and the run log.
pub struct Exercise<A> {
    actuator: A,
    commands: CommandSet,
    plan: SequencePlan,
    cancel: CancellationSignal,
    workers: usize,
    log: RunLog,
}

impl<A: Actuator> Exercise<A> {
    pub fn new(actuator: A, config: &ExerciseConfig, cancel: CancellationSignal) -> Self {
        Self {
            actuator,
            commands: CommandSet::from_config(config),
            plan: SequencePlan::from_config(config),
            cancel,
            workers: config.workers.max(1),
            log: RunLog::new(),
        }
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    pub fn plan(&self) -> &SequencePlan {
        &self.plan
    }

    pub fn cancel_signal(&self) -> &CancellationSignal {
        &self.cancel
    }

    /// Programs the plan will call, for a `PATH` check before starting.
    pub fn required_programs(&self) -> Vec<&str> {
        let [mount, guider, notifier] = self.commands.programs();
        let mut programs = vec![mount];
        if self.plan.guide {
            programs.push(guider);
            if self.plan.notify {
                programs.push(notifier);
            }
        }
        programs
    }

    /// Visit every target in the queue and return the outcomes in queue
    /// order.
    ///
    /// Target-scoped failures are recorded and the run moves on. An `Err`
    /// is an unclassified failure: nothing further is started, and the log
    /// keeps whatever was recorded before it.
    pub fn run(&mut self, queue: &WorkQueue) -> std::result::Result<Vec<SequenceOutcome>, RunAborted> {
        let span = info_span!("run", run_id = %self.log.run_id());
        let _enter = span.enter();
        info!(targets = queue.len(), workers = self.workers, "starting exercise run");

        if self.workers <= 1 || queue.len() <= 1 {
            self.run_sequential(queue)
        } else {
            self.run_pooled(queue)
        }
    }

    fn run_sequential(
        &mut self,
        queue: &WorkQueue,
    ) -> std::result::Result<Vec<SequenceOutcome>, RunAborted> {
        let sequencer = Sequencer::new(&self.actuator, &self.commands, &self.plan, &self.cancel);
        let mut outcomes = Vec::with_capacity(queue.len());
        for target in queue {
            match sequencer.run_target(target) {
                Ok(report) => {
                    self.log.record(&report);
                    outcomes.push(report.outcome);
                }
                Err(error) => return Err(RunAborted { outcomes, error }),
            }
        }
        Ok(outcomes)
    }

    /// Workers pull whole targets off a shared index. Reports are held by
    /// queue index and folded into the log in queue order once every worker
    /// is done, so the log reads the same as a sequential run.
    fn run_pooled(
        &mut self,
        queue: &WorkQueue,
    ) -> std::result::Result<Vec<SequenceOutcome>, RunAborted> {
        let targets = queue.targets();
        let workers = self.workers.min(targets.len());
        let sequencer = Sequencer::new(&self.actuator, &self.commands, &self.plan, &self.cancel);

        let next = AtomicUsize::new(0);
        let halt = AtomicBool::new(false);
        let mut reports: Vec<Option<TargetReport>> = vec![None; targets.len()];
        let mut fatal: Option<ExerciseError> = None;

        std::thread::scope(|scope| {
            let (tx, rx) = mpsc::channel::<(usize, Result<TargetReport>)>();
            let mut handles = Vec::with_capacity(workers);
            for _ in 0..workers {
                let tx = tx.clone();
                let (sequencer, next, halt) = (&sequencer, &next, &halt);
                handles.push(scope.spawn(move || loop {
                    if halt.load(Ordering::SeqCst) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(target) = targets.get(index) else {
                        break;
                    };
                    let result = sequencer.run_target(target);
                    let is_fatal = result.is_err();
                    if tx.send((index, result)).is_err() || is_fatal {
                        break;
                    }
                }));
            }
            drop(tx);

            for (index, result) in rx {
                match result {
                    Ok(report) => reports[index] = Some(report),
                    Err(e) => {
                        halt.store(true, Ordering::SeqCst);
                        fatal.get_or_insert(e);
                    }
                }
            }

            for handle in handles {
                if handle.join().is_err() {
                    halt.store(true, Ordering::SeqCst);
                    fatal.get_or_insert(ExerciseError::WorkerPanicked);
                }
            }
        });

        let mut outcomes = Vec::with_capacity(targets.len());
        for report in reports.into_iter().flatten() {
            self.log.record(&report);
            outcomes.push(report.outcome);
        }
        match fatal {
            Some(error) => Err(RunAborted { outcomes, error }),
            None => Ok(outcomes),
        }
    }

    /// Command the mount to stop tracking. Called once the run is over,
    /// however it ended.
    pub fn stop_mount(&self) -> Result<ActuatorResult> {
        let command = self.commands.stop();
        info!(command = %command.display(), "stopping tracking");
        let result = self.actuator.invoke(&command)?;
        if !result.success() {
            warn!(message = %result.failure_message("mount stop"), "mount did not stop");
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
