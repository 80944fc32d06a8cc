pub mod config;
pub mod run;
pub mod targets;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use exercise_core::catalog::Catalog;
use exercise_core::config::ExerciseConfig;
use exercise_core::ephemeris::{LocationSpec, SiderealEphemeris};
use exercise_core::selector::{self, AltitudeWindow, QueueOrder, WorkQueue};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Shared flags
// ---------------------------------------------------------------------------

/// Flags that decide which stars are visited and in what order.
#[derive(Args, Debug, Default)]
pub struct SelectionArgs {
    /// Observer location preset: NewMexicoSkies or Toronto
    #[arg(long, short = 'l')]
    pub location: Option<String>,

    /// Star list: names one per line, or a .yaml file of entries
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Lowest altitude in degrees (exclusive)
    #[arg(long, allow_negative_numbers = true)]
    pub min_alt: Option<f64>,

    /// Highest altitude in degrees (exclusive)
    #[arg(long, allow_negative_numbers = true)]
    pub max_alt: Option<f64>,

    /// Visiting order: shuffle, azimuth, or altitude
    #[arg(long)]
    pub order: Option<QueueOrder>,

    /// Seed for the shuffle, for a repeatable order
    #[arg(long)]
    pub seed: Option<u64>,

    /// Select stars as seen at this instant (RFC 3339) instead of now
    #[arg(long, value_name = "TIME")]
    pub at: Option<DateTime<Utc>>,
}

impl SelectionArgs {
    pub fn apply(&self, config: &mut ExerciseConfig) {
        if let Some(location) = &self.location {
            config.location = LocationSpec::Preset(location.clone());
        }
        if let Some(catalog) = &self.catalog {
            config.catalog = Some(catalog.clone());
        }
        if let Some(min) = self.min_alt {
            config.window.min_altitude = min;
        }
        if let Some(max) = self.max_alt {
            config.window.max_altitude = max;
        }
        if let Some(order) = self.order {
            config.order = order;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

/// Flags that shape each target's sequence.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Dither N, S, E and W after each slew
    #[arg(long, short = 'd')]
    pub dither: bool,

    /// Autoguide after each slew
    #[arg(long, short = 'g')]
    pub guide: bool,

    /// Drive the mount through Keyboard Maestro actions
    #[arg(long, short = 'm')]
    pub maestro: bool,

    /// Fall back to Maestro when the mount socket is blocked
    #[arg(long, short = 's')]
    pub safe: bool,

    /// Don't send guider plots after guiding
    #[arg(long)]
    pub no_notify: bool,

    /// Mount control host
    #[arg(long)]
    pub host: Option<String>,

    /// Seconds to guide before stopping the autoguider
    #[arg(long)]
    pub guide_seconds: Option<f64>,

    /// Seconds to settle around each dither
    #[arg(long)]
    pub settle_seconds: Option<f64>,

    /// Targets worked at once (1 = strictly in order)
    #[arg(long)]
    pub workers: Option<usize>,
}

impl RunArgs {
    pub fn apply(&self, config: &mut ExerciseConfig) {
        config.dither |= self.dither;
        config.guide |= self.guide;
        config.maestro |= self.maestro;
        config.safe |= self.safe;
        if self.no_notify {
            config.notify = false;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(secs) = self.guide_seconds {
            config.guide_seconds = secs;
        }
        if let Some(secs) = self.settle_seconds {
            config.settle_seconds = secs;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read the config file if one was found, else the built-in defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ExerciseConfig> {
    match path {
        Some(path) => ExerciseConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(ExerciseConfig::default()),
    }
}

pub fn load_catalog(config: &ExerciseConfig) -> anyhow::Result<Catalog> {
    match &config.catalog {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("failed to load catalog {}", path.display())),
        None => Ok(Catalog::bright_stars()),
    }
}

/// Observe the catalog from the configured location and keep what sits
/// inside the altitude window.
pub fn build_queue(config: &ExerciseConfig, at: Option<DateTime<Utc>>) -> anyhow::Result<WorkQueue> {
    let location = config
        .resolve_location()
        .context("cannot resolve observer location")?;
    let window = AltitudeWindow::new(config.window.min_altitude, config.window.max_altitude)?;
    let catalog = load_catalog(config)?;
    Ok(selector::select(
        &catalog,
        &SiderealEphemeris,
        &location,
        at.unwrap_or_else(Utc::now),
        window,
        config.order,
        config.seed,
    ))
}
