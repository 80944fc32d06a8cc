use crate::ephemeris::{Location, LocationSpec};
use crate::error::{ExerciseError, Result};
use crate::selector::{AltitudeWindow, QueueOrder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "exercise.yaml";

// ---------------------------------------------------------------------------
// Programs
// ---------------------------------------------------------------------------

/// Executables standing in for the devices. Resolved through `PATH` unless
/// given as a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Programs {
    #[serde(default = "default_mount_program")]
    pub mount: String,
    #[serde(default = "default_guider_program")]
    pub guider: String,
    #[serde(default = "default_notifier_program")]
    pub notifier: String,
}

fn default_mount_program() -> String {
    "mount".to_string()
}

fn default_guider_program() -> String {
    "guider".to_string()
}

fn default_notifier_program() -> String {
    "email_guider_plots".to_string()
}

impl Default for Programs {
    fn default() -> Self {
        Self {
            mount: default_mount_program(),
            guider: default_guider_program(),
            notifier: default_notifier_program(),
        }
    }
}

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

/// Per-command timeouts in seconds. Every one must be positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timeouts {
    #[serde(default = "default_slew_timeout")]
    pub slew: u64,
    #[serde(default = "default_dither_timeout")]
    pub dither: u64,
    #[serde(default = "default_guider_timeout")]
    pub guider: u64,
    #[serde(default = "default_notify_timeout")]
    pub notify: u64,
    #[serde(default = "default_stop_timeout")]
    pub stop: u64,
}

fn default_slew_timeout() -> u64 {
    300
}

fn default_dither_timeout() -> u64 {
    60
}

fn default_guider_timeout() -> u64 {
    120
}

fn default_notify_timeout() -> u64 {
    60
}

fn default_stop_timeout() -> u64 {
    60
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            slew: default_slew_timeout(),
            dither: default_dither_timeout(),
            guider: default_guider_timeout(),
            notify: default_notify_timeout(),
            stop: default_stop_timeout(),
        }
    }
}

impl Timeouts {
    fn named(&self) -> [(&'static str, u64); 5] {
        [
            ("slew", self.slew),
            ("dither", self.dither),
            ("guider", self.guider),
            ("notify", self.notify),
            ("stop", self.stop),
        ]
    }
}

// ---------------------------------------------------------------------------
// ExerciseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExerciseConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Drive the mount through Keyboard Maestro actions.
    #[serde(default)]
    pub maestro: bool,
    /// Fall back to Maestro when the mount socket is blocked.
    #[serde(default)]
    pub safe: bool,
    #[serde(default)]
    pub dither: bool,
    #[serde(default)]
    pub guide: bool,
    /// Send guider plots after each successful guide.
    #[serde(default = "default_notify")]
    pub notify: bool,
    #[serde(default = "default_dither_step")]
    pub dither_step: u32,
    #[serde(default = "default_settle_seconds")]
    pub settle_seconds: f64,
    #[serde(default = "default_guide_seconds")]
    pub guide_seconds: f64,
    #[serde(default)]
    pub programs: Programs,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub location: LocationSpec,
    #[serde(default)]
    pub window: AltitudeWindow,
    /// Star list; the built-in bright-star catalog when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
    #[serde(default)]
    pub order: QueueOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_notify() -> bool {
    true
}

fn default_dither_step() -> u32 {
    45
}

fn default_settle_seconds() -> f64 {
    1.0
}

fn default_guide_seconds() -> f64 {
    30.0
}

fn default_workers() -> usize {
    1
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            maestro: false,
            safe: false,
            dither: false,
            guide: false,
            notify: default_notify(),
            dither_step: default_dither_step(),
            settle_seconds: default_settle_seconds(),
            guide_seconds: default_guide_seconds(),
            programs: Programs::default(),
            timeouts: Timeouts::default(),
            location: LocationSpec::default(),
            window: AltitudeWindow::default(),
            catalog: None,
            order: QueueOrder::default(),
            seed: None,
            workers: default_workers(),
        }
    }
}

impl ExerciseConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: ExerciseConfig = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        AltitudeWindow::new(self.window.min_altitude, self.window.max_altitude)?;
        if self.workers == 0 {
            return Err(ExerciseError::InvalidConfig(
                "workers must be at least 1".into(),
            ));
        }
        if let Some((name, _)) = self.timeouts.named().into_iter().find(|(_, secs)| *secs == 0) {
            return Err(ExerciseError::InvalidConfig(format!(
                "{name} timeout must be positive: a hung program would stall the run"
            )));
        }
        for (name, secs) in [
            ("settle_seconds", self.settle_seconds),
            ("guide_seconds", self.guide_seconds),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(ExerciseError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {secs}"
                )));
            }
        }
        if self.host.trim().is_empty() {
            return Err(ExerciseError::InvalidConfig("host is empty".into()));
        }
        Ok(())
    }

    pub fn resolve_location(&self) -> Result<Location> {
        self.location.resolve()
    }

    pub fn settle(&self) -> Duration {
        Duration::try_from_secs_f64(self.settle_seconds).unwrap_or_default()
    }

    pub fn guide_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.guide_seconds).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
