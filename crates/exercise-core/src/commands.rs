use std::time::Duration;

use crate::config::{ExerciseConfig, Programs, Timeouts};
use crate::gateway::ActuatorCommand;
use crate::types::Direction;

/// Builds the concrete command lines for mount, guider and notifier.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSet {
    programs: Programs,
    timeouts: Timeouts,
    host: String,
    maestro: bool,
    safe: bool,
    dither_step: u32,
}

impl CommandSet {
    pub fn from_config(config: &ExerciseConfig) -> Self {
        Self {
            programs: config.programs.clone(),
            timeouts: config.timeouts.clone(),
            host: config.host.clone(),
            maestro: config.maestro,
            safe: config.safe,
            dither_step: config.dither_step,
        }
    }

    pub fn goto(&self, target: &str) -> ActuatorCommand {
        self.mount(["goto", target], self.timeouts.slew)
    }

    pub fn dither(&self, direction: Direction) -> ActuatorCommand {
        let step = self.dither_step.to_string();
        self.mount(
            ["dither", step.as_str(), direction.as_arg()],
            self.timeouts.dither,
        )
    }

    pub fn stop(&self) -> ActuatorCommand {
        self.mount(["stop"], self.timeouts.stop)
    }

    pub fn find_guide_star(&self) -> ActuatorCommand {
        ActuatorCommand::new(
            &self.programs.guider,
            ["magic"],
            Duration::from_secs(self.timeouts.guider),
        )
    }

    pub fn stop_guiding(&self) -> ActuatorCommand {
        ActuatorCommand::new(
            &self.programs.guider,
            ["stop"],
            Duration::from_secs(self.timeouts.guider),
        )
    }

    pub fn send_guide_plots(&self) -> ActuatorCommand {
        ActuatorCommand::new(
            &self.programs.notifier,
            Vec::<String>::new(),
            Duration::from_secs(self.timeouts.notify),
        )
    }

    /// Every program this command set can invoke, for `PATH` checks.
    pub fn programs(&self) -> [&str; 3] {
        [
            self.programs.mount.as_str(),
            self.programs.guider.as_str(),
            self.programs.notifier.as_str(),
        ]
    }

    fn mount<'a>(&self, verb: impl IntoIterator<Item = &'a str>, timeout: u64) -> ActuatorCommand {
        let protocol = if self.maestro {
            "--maestro"
        } else {
            "--nomaestro"
        };
        let safety = if self.safe { "--safe" } else { "--nosafe" };
        let mut args: Vec<String> = [protocol, safety, "--noverbose", "--host"]
            .into_iter()
            .map(str::to_string)
            .collect();
        args.push(self.host.clone());
        args.extend(verb.into_iter().map(str::to_string));
        ActuatorCommand::new(&self.programs.mount, args, Duration::from_secs(timeout))
    }
}
