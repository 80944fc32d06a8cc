use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::ephemeris::{Ephemeris, Location};
use crate::error::{ExerciseError, Result};
use crate::types::Target;

// ---------------------------------------------------------------------------
// AltitudeWindow
// ---------------------------------------------------------------------------

/// Open altitude interval in degrees: both bounds are excluded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AltitudeWindow {
    pub min_altitude: f64,
    pub max_altitude: f64,
}

impl Default for AltitudeWindow {
    fn default() -> Self {
        Self {
            min_altitude: 40.0,
            max_altitude: 85.0,
        }
    }
}

impl AltitudeWindow {
    pub fn new(min_altitude: f64, max_altitude: f64) -> Result<Self> {
        if !min_altitude.is_finite() || !max_altitude.is_finite() {
            return Err(ExerciseError::InvalidWindow(
                "altitudes must be finite".into(),
            ));
        }
        if min_altitude >= max_altitude {
            return Err(ExerciseError::InvalidWindow(format!(
                "minimum {min_altitude} must be below maximum {max_altitude}"
            )));
        }
        if min_altitude < -90.0 || max_altitude > 90.0 {
            return Err(ExerciseError::InvalidWindow(format!(
                "[{min_altitude}, {max_altitude}] reaches past the poles of the horizon system"
            )));
        }
        Ok(Self {
            min_altitude,
            max_altitude,
        })
    }

    pub fn contains(&self, altitude: f64) -> bool {
        self.min_altitude < altitude && altitude < self.max_altitude
    }
}

// ---------------------------------------------------------------------------
// QueueOrder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueOrder {
    /// Uniform random permutation.
    #[default]
    Shuffle,
    /// Ascending azimuth.
    Azimuth,
    /// Ascending altitude.
    Altitude,
}

impl std::str::FromStr for QueueOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "shuffle" => Ok(QueueOrder::Shuffle),
            "azimuth" => Ok(QueueOrder::Azimuth),
            "altitude" => Ok(QueueOrder::Altitude),
            other => Err(format!(
                "unknown order '{other}': expected shuffle, azimuth or altitude"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkQueue
// ---------------------------------------------------------------------------

/// Targets for one run, in the order they will be visited. Fixed once built.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct WorkQueue {
    targets: Vec<Target>,
}

impl WorkQueue {
    pub fn new(targets: Vec<Target>) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Target> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a WorkQueue {
    type Item = &'a Target;
    type IntoIter = std::slice::Iter<'a, Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.iter()
    }
}

// ---------------------------------------------------------------------------
// select
// ---------------------------------------------------------------------------

/// Build the work queue: observe every catalog entry at `time`, keep those
/// strictly inside `window`, and order them.
///
/// A `seed` makes the shuffle reproducible; without one the order differs
/// between runs. An empty result is a valid run with nothing to do.
pub fn select(
    catalog: &Catalog,
    ephemeris: &dyn Ephemeris,
    location: &Location,
    time: DateTime<Utc>,
    window: AltitudeWindow,
    order: QueueOrder,
    seed: Option<u64>,
) -> WorkQueue {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    select_with_rng(catalog, ephemeris, location, time, window, order, &mut rng)
}

pub fn select_with_rng<R: Rng + ?Sized>(
    catalog: &Catalog,
    ephemeris: &dyn Ephemeris,
    location: &Location,
    time: DateTime<Utc>,
    window: AltitudeWindow,
    order: QueueOrder,
    rng: &mut R,
) -> WorkQueue {
    let mut targets: Vec<Target> = catalog
        .entries()
        .iter()
        .map(|entry| ephemeris.observe(entry, location, time))
        .filter(|t| window.contains(t.altitude))
        .collect();

    match order {
        QueueOrder::Shuffle => targets.shuffle(rng),
        QueueOrder::Azimuth => targets.sort_by(|a, b| a.azimuth.total_cmp(&b.azimuth)),
        QueueOrder::Altitude => targets.sort_by(|a, b| a.altitude.total_cmp(&b.altitude)),
    }

    tracing::debug!(
        candidates = catalog.len(),
        selected = targets.len(),
        min_altitude = window.min_altitude,
        max_altitude = window.max_altitude,
        ?order,
        "work queue built"
    );
    WorkQueue::new(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{sky as catalog, FixedSky};
    use chrono::TimeZone;

    fn run(cat: &Catalog, window: AltitudeWindow, order: QueueOrder, seed: u64) -> WorkQueue {
        select(
            cat,
            &FixedSky,
            &Location::new_mexico_skies(),
            Utc.with_ymd_and_hms(2024, 1, 1, 4, 0, 0).unwrap(),
            window,
            order,
            Some(seed),
        )
    }

    fn sorted(mut names: Vec<&str>) -> Vec<&str> {
        names.sort_unstable();
        names
    }

    #[test]
    fn keeps_only_targets_strictly_inside_window() {
        let cat = catalog(&[
            ("low", 0.0, 10.0),
            ("edge_lo", 0.0, 40.0),
            ("in", 0.0, 60.0),
            ("edge_hi", 0.0, 85.0),
            ("high", 0.0, 88.0),
        ]);
        let window = AltitudeWindow::default();
        let queue = run(&cat, window, QueueOrder::Shuffle, 1);
        assert_eq!(queue.names(), vec!["in"]);
        assert!(queue.iter().all(|t| window.contains(t.altitude)));
    }

    #[test]
    fn shuffle_is_a_seeded_permutation() {
        let objects: Vec<(String, f64, f64)> = (0..20)
            .map(|i| (format!("star{i:02}"), i as f64, 50.0))
            .collect();
        let refs: Vec<(&str, f64, f64)> =
            objects.iter().map(|(n, a, b)| (n.as_str(), *a, *b)).collect();
        let cat = catalog(&refs);

        let a = run(&cat, AltitudeWindow::default(), QueueOrder::Shuffle, 99);
        let b = run(&cat, AltitudeWindow::default(), QueueOrder::Shuffle, 99);
        assert_eq!(a.names(), b.names(), "same seed must give the same order");

        let all: Vec<&str> = refs.iter().map(|r| r.0).collect();
        assert_eq!(sorted(a.names()), sorted(all));
    }

    #[test]
    fn end_to_end_window_scenario() {
        let cat = catalog(&[("A", 0.0, 60.0), ("B", 0.0, 10.0), ("C", 0.0, 70.0)]);
        let queue = run(&cat, AltitudeWindow::default(), QueueOrder::Shuffle, 3);
        assert_eq!(sorted(queue.names()), vec!["A", "C"]);
    }

    #[test]
    fn sorts_by_azimuth_or_altitude() {
        let cat = catalog(&[("x", 300.0, 50.0), ("y", 20.0, 70.0), ("z", 150.0, 45.0)]);
        let by_az = run(&cat, AltitudeWindow::default(), QueueOrder::Azimuth, 0);
        assert_eq!(by_az.names(), vec!["y", "z", "x"]);
        let by_alt = run(&cat, AltitudeWindow::default(), QueueOrder::Altitude, 0);
        assert_eq!(by_alt.names(), vec!["z", "x", "y"]);
    }

    #[test]
    fn nothing_visible_is_an_empty_queue() {
        let cat = catalog(&[("down", 0.0, -20.0)]);
        let queue = run(&cat, AltitudeWindow::default(), QueueOrder::Shuffle, 0);
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn window_validation() {
        assert!(AltitudeWindow::new(40.0, 85.0).is_ok());
        assert!(AltitudeWindow::new(85.0, 40.0).is_err());
        assert!(AltitudeWindow::new(40.0, 40.0).is_err());
        assert!(AltitudeWindow::new(-95.0, 10.0).is_err());
        assert!(AltitudeWindow::new(f64::NAN, 10.0).is_err());
    }

    #[test]
    fn order_parses_from_cli_strings() {
        assert_eq!("azimuth".parse::<QueueOrder>(), Ok(QueueOrder::Azimuth));
        assert!("random".parse::<QueueOrder>().is_err());
    }
}
