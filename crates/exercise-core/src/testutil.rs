use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::catalog::{Catalog, CatalogEntry};
use crate::ephemeris::{Ephemeris, Location};
use crate::error::{ExerciseError, Result};
use crate::gateway::{Actuator, ActuatorCommand, ActuatorResult};
use crate::types::Target;

/// What the scripted actuator does for a given command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reply {
    Exit(i32),
    NotFound,
    TimedOut,
    Broken,
}

type Script = Box<dyn Fn(&ActuatorCommand) -> Reply + Send + Sync>;
type Hook = Box<dyn Fn(&ActuatorCommand) + Send + Sync>;

/// In-memory actuator that records every command and answers from a script.
pub(crate) struct ScriptedActuator {
    calls: Mutex<Vec<ActuatorCommand>>,
    script: Script,
    hook: Option<Hook>,
}

impl ScriptedActuator {
    pub(crate) fn new(script: impl Fn(&ActuatorCommand) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            script: Box::new(script),
            hook: None,
        }
    }

    pub(crate) fn succeeding() -> Self {
        Self::new(|_| Reply::Exit(0))
    }

    /// Run `hook` while each command is "in flight".
    pub(crate) fn with_hook(mut self, hook: impl Fn(&ActuatorCommand) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub(crate) fn calls(&self) -> Vec<ActuatorCommand> {
        self.calls.lock().unwrap().clone()
    }

    /// Commands as `program arg arg`, with the mount's connection flags
    /// stripped so assertions stay short.
    pub(crate) fn call_lines(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| {
                let args: Vec<&str> = c
                    .args
                    .iter()
                    .map(String::as_str)
                    .skip_while(|a| a.starts_with("--") || *a == "localhost")
                    .collect();
                std::iter::once(c.program.as_str())
                    .chain(args)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}

impl Actuator for ScriptedActuator {
    fn invoke(&self, command: &ActuatorCommand) -> Result<ActuatorResult> {
        self.calls.lock().unwrap().push(command.clone());
        if let Some(hook) = &self.hook {
            hook(command);
        }
        match (self.script)(command) {
            Reply::Exit(code) => Ok(ActuatorResult::exited(code, "", "")),
            Reply::NotFound => Err(ExerciseError::Launch {
                program: command.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            }),
            Reply::TimedOut => Ok(ActuatorResult::timed_out(command.timeout)),
            Reply::Broken => Err(ExerciseError::Wait {
                program: command.program.clone(),
                source: std::io::Error::other("wait failed"),
            }),
        }
    }
}

/// Ephemeris that reads altitude from the entry's declination and azimuth
/// from its right ascension, so tests can place objects directly.
pub(crate) struct FixedSky;

impl Ephemeris for FixedSky {
    fn observe(&self, entry: &CatalogEntry, _: &Location, _: DateTime<Utc>) -> Target {
        Target {
            name: entry.name.clone(),
            altitude: entry.declination,
            azimuth: entry.right_ascension,
            right_ascension: entry.right_ascension,
            declination: entry.declination,
            hour_angle: 0.0,
            local_sidereal_time: 0.0,
            magnitude: entry.magnitude,
        }
    }
}

/// Catalog of `(name, azimuth, altitude)` triples for use with [`FixedSky`].
pub(crate) fn sky(objects: &[(&str, f64, f64)]) -> Catalog {
    Catalog::new(
        objects
            .iter()
            .map(|&(name, az, alt)| CatalogEntry {
                name: name.to_string(),
                right_ascension: az,
                declination: alt,
                magnitude: 1.0,
            })
            .collect(),
    )
}
