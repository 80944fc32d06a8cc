use super::{build_queue, load_config, RunArgs, SelectionArgs};
use crate::output::{print_json, print_summary, print_targets};
use anyhow::{anyhow, Context};
use exercise_core::cancel::CancellationSignal;
use exercise_core::driver::Exercise;
use exercise_core::gateway::{missing_programs, ProcessActuator};
use exercise_core::run_log::RunSummary;
use exercise_core::types::SequenceOutcome;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};

#[derive(Serialize)]
struct RunReport<'a> {
    summary: &'a RunSummary,
    outcomes: &'a [SequenceOutcome],
    mount_stopped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(
    config_path: Option<&Path>,
    selection: &SelectionArgs,
    args: &RunArgs,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    selection.apply(&mut config);
    args.apply(&mut config);
    config.validate()?;

    let queue = build_queue(&config, selection.at)?;
    if !json {
        print_targets(&queue);
    }

    let cancel = CancellationSignal::new();
    let mut exercise = Exercise::new(ProcessActuator::new(), &config, cancel.clone());
    for program in missing_programs(exercise.required_programs()) {
        warn!(%program, "actuator program not found on PATH");
    }

    // The sequence blocks on child processes, so it runs on the blocking
    // pool while the runtime listens for Ctrl-C.
    let rt = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    let (exercise, outcome) = rt.block_on(async move {
        let interrupts = tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                cancel.request_cancel();
            }
        });
        let worker = tokio::task::spawn_blocking(move || {
            let outcome = exercise.run(&queue);
            (exercise, outcome)
        })
        .await;
        interrupts.abort();
        worker
    })
    .map_err(|e| anyhow!("exercise worker stopped unexpectedly: {e}"))?;

    let (outcomes, fatal) = match outcome {
        Ok(outcomes) => (outcomes, None),
        Err(aborted) => {
            error!(
                error = %aborted.error,
                finished = aborted.outcomes.len(),
                "unrecoverable error, abandoning the run"
            );
            (aborted.outcomes, Some(aborted.error))
        }
    };

    // The summary goes out before the stop so an operator sees it even if
    // the mount hangs on the way down.
    let summary = exercise.log().summarize();
    if !json {
        print_summary(&summary, config.dither, config.guide);
    }

    info!("stopping tracking");
    let stop_error = match exercise.stop_mount() {
        Ok(result) if result.success() => None,
        Ok(result) => Some(result.failure_message("mount stop")),
        Err(e) => Some(e.to_string()),
    };

    if json {
        print_json(&RunReport {
            summary: &summary,
            outcomes: &outcomes,
            mount_stopped: stop_error.is_none(),
            error: fatal.as_ref().map(ToString::to_string),
        })?;
    }

    if let Some(e) = fatal {
        if let Some(stop) = &stop_error {
            eprintln!("error: Error stopping mount tracking: {stop}");
        }
        return Err(anyhow::Error::new(e).context("Unrecoverable error"));
    }
    match stop_error {
        Some(stop) => Err(anyhow!("Error stopping mount tracking: {stop}")),
        None => Ok(()),
    }
}
