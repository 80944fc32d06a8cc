//! Invocation of the external programs that stand in for physical devices.
//!
//! The mount, the autoguider and the notifier are all command-line programs.
//! [`Actuator`] is the single seam the sequencer talks through; the real
//! implementation, [`ProcessActuator`], spawns the program and waits for it
//! with a timeout. A non-zero exit is not an error at this layer: the
//! captured output still has to reach the operator, and only the caller
//! knows what a failed command means.

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{ExerciseError, Result};

// ---------------------------------------------------------------------------
// ActuatorCommand
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub program: String,
    pub args: Vec<String>,
    /// How long the program gets before it is killed.
    pub timeout: Duration,
}

impl ActuatorCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    /// True when the argument list ends with `tail`, e.g. `["goto", "Vega"]`.
    pub fn ends_with(&self, tail: &[&str]) -> bool {
        tail.len() <= self.args.len()
            && self.args[self.args.len() - tail.len()..]
                .iter()
                .zip(tail)
                .all(|(a, b)| a == b)
    }

    /// Shell-like rendering for progress lines.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---------------------------------------------------------------------------
// ActuatorResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExitState {
    Exited { code: i32 },
    /// Terminated by a signal, so no exit code exists.
    Signalled,
    TimedOut { after_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorResult {
    pub state: ExitState,
    pub stdout: String,
    pub stderr: String,
}

impl ActuatorResult {
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            state: ExitState::Exited { code },
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn timed_out(after: Duration) -> Self {
        Self {
            state: ExitState::TimedOut {
                after_ms: after.as_millis() as u64,
            },
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.state, ExitState::Exited { code: 0 })
    }

    /// Human-readable reason for an unsuccessful result.
    ///
    /// Includes the last line of stderr (or stdout) when the program left
    /// one, since that is usually where the mount says what went wrong.
    pub fn failure_message(&self, what: &str) -> String {
        let base = match self.state {
            ExitState::Exited { code } => format!("{what} exited with status {code}"),
            ExitState::Signalled => format!("{what} was killed by a signal"),
            ExitState::TimedOut { after_ms } => {
                format!("actuator timed out: {what} gave no answer within {after_ms} ms")
            }
        };
        let detail = last_line(&self.stderr).or_else(|| last_line(&self.stdout));
        match detail {
            Some(line) => format!("{base}: {line}"),
            None => base,
        }
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|l| !l.is_empty())
}

// ---------------------------------------------------------------------------
// Actuator
// ---------------------------------------------------------------------------

/// Something that can carry out an [`ActuatorCommand`].
///
/// `Err` is reserved for invocation problems: [`ExerciseError::Launch`] when
/// the program cannot be started, anything else when the gateway itself
/// broke. Command failures come back as an unsuccessful [`ActuatorResult`].
pub trait Actuator: Send + Sync {
    fn invoke(&self, command: &ActuatorCommand) -> Result<ActuatorResult>;
}

impl<A: Actuator + ?Sized> Actuator for &A {
    fn invoke(&self, command: &ActuatorCommand) -> Result<ActuatorResult> {
        (**self).invoke(command)
    }
}

// ---------------------------------------------------------------------------
// ProcessActuator
// ---------------------------------------------------------------------------

/// Runs actuator commands as child processes.
///
/// Output is read on dedicated threads so a chatty program cannot fill a
/// pipe and stall; the wait happens on a third thread so the timeout does
/// not need to poll. On unix each child gets its own process group, which
/// keeps a terminal Ctrl-C from reaching a mount halfway through a move.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessActuator;

impl ProcessActuator {
    pub fn new() -> Self {
        Self
    }
}

impl Actuator for ProcessActuator {
    fn invoke(&self, command: &ActuatorCommand) -> Result<ActuatorResult> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|source| ExerciseError::Launch {
            program: command.program.clone(),
            source,
        })?;
        let pid = child.id();
        tracing::debug!(pid, command = %command.display(), "actuator started");

        let (stdout_buf, stdout_thread) = spawn_reader(child.stdout.take());
        let (stderr_buf, stderr_thread) = spawn_reader(child.stderr.take());

        let limit = command.timeout;
        let started = Instant::now();
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(child.wait());
        });
        let wait_result = match rx.recv_timeout(limit) {
            Ok(result) => result,
            Err(_) => {
                kill_process_group(pid);
                tracing::warn!(
                    pid,
                    command = %command.display(),
                    waited_ms = started.elapsed().as_millis() as u64,
                    "actuator timed out and was killed"
                );
                // The readers finish on their own once the killed group
                // releases the pipes; report what they have so far.
                return Ok(ActuatorResult {
                    stdout: captured(&stdout_buf),
                    stderr: captured(&stderr_buf),
                    ..ActuatorResult::timed_out(limit)
                });
            }
        };

        let _ = stdout_thread.join();
        let _ = stderr_thread.join();

        let status = wait_result.map_err(|source| ExerciseError::Wait {
            program: command.program.clone(),
            source,
        })?;

        let state = match status.code() {
            Some(code) => ExitState::Exited { code },
            None => ExitState::Signalled,
        };
        Ok(ActuatorResult {
            state,
            stdout: captured(&stdout_buf),
            stderr: captured(&stderr_buf),
        })
    }
}

type Captured = Arc<Mutex<Vec<u8>>>;

/// Drain `handle` on its own thread into a buffer readable at any time.
fn spawn_reader<R: Read + Send + 'static>(
    handle: Option<R>,
) -> (Captured, std::thread::JoinHandle<()>) {
    let buf: Captured = Arc::default();
    let sink = Arc::clone(&buf);
    let thread = std::thread::spawn(move || {
        let Some(mut r) = handle else {
            return;
        };
        let mut chunk = [0u8; 4096];
        loop {
            match r.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => match sink.lock() {
                    Ok(mut out) => out.extend_from_slice(&chunk[..n]),
                    Err(_) => break,
                },
            }
        }
    });
    (buf, thread)
}

fn captured(buf: &Captured) -> String {
    buf.lock()
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default()
}

/// SIGKILL the child's process group, taking any helpers it started with
/// it. Best-effort.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let _ = Command::new("kill")
        .args(["-9", "--", &format!("-{pid}")])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

#[cfg(not(unix))]
fn kill_process_group(pid: u32) {
    let _ = Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

/// Programs from `programs` that cannot be found on `PATH`.
pub fn missing_programs<'a>(programs: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    programs
        .into_iter()
        .filter(|p| which::which(p).is_err())
        .map(str::to_string)
        .collect()
}
