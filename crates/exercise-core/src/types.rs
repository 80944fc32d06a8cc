use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// Position snapshot of a catalog object for one observer and instant.
///
/// Angles are degrees except `hour_angle`, which is in hours (-12, 12].
/// A target is never re-observed while its sequence is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub altitude: f64,
    pub azimuth: f64,
    pub right_ascension: f64,
    pub declination: f64,
    pub hour_angle: f64,
    pub local_sidereal_time: f64,
    pub magnitude: f64,
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Dither order. Fixed so every target sees the same pattern.
    pub const SEQUENCE: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Single-letter form the mount CLI expects.
    pub fn as_arg(&self) -> &'static str {
        match self {
            Direction::North => "N",
            Direction::South => "S",
            Direction::East => "E",
            Direction::West => "W",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

// ---------------------------------------------------------------------------
// FailureKind / GuideStep
// ---------------------------------------------------------------------------

/// Reporting category for a target-scoped failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Slew,
    Dither,
    Guide,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Slew => "slew",
            FailureKind::Dither => "dither",
            FailureKind::Guide => "guide",
        };
        f.write_str(s)
    }
}

/// Which half of the guide step failed. Both count as one guide failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideStep {
    FindStar,
    Stop,
}

// ---------------------------------------------------------------------------
// SequenceOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SequenceOutcome {
    Completed {
        target: String,
    },
    SlewFailed {
        target: String,
        message: String,
    },
    DitherFailed {
        target: String,
        direction: Direction,
        message: String,
    },
    GuideFailed {
        target: String,
        step: GuideStep,
        message: String,
    },
    Skipped {
        target: String,
    },
}

impl SequenceOutcome {
    pub fn target(&self) -> &str {
        match self {
            SequenceOutcome::Completed { target }
            | SequenceOutcome::SlewFailed { target, .. }
            | SequenceOutcome::DitherFailed { target, .. }
            | SequenceOutcome::GuideFailed { target, .. }
            | SequenceOutcome::Skipped { target } => target,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            SequenceOutcome::SlewFailed { .. } => Some(FailureKind::Slew),
            SequenceOutcome::DitherFailed { .. } => Some(FailureKind::Dither),
            SequenceOutcome::GuideFailed { .. } => Some(FailureKind::Guide),
            SequenceOutcome::Completed { .. } | SequenceOutcome::Skipped { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            SequenceOutcome::SlewFailed { message, .. }
            | SequenceOutcome::DitherFailed { message, .. }
            | SequenceOutcome::GuideFailed { message, .. } => Some(message),
            SequenceOutcome::Completed { .. } | SequenceOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SequenceOutcome::Completed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, SequenceOutcome::Skipped { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dither_sequence_is_north_south_east_west() {
        let args: Vec<_> = Direction::SEQUENCE.iter().map(|d| d.as_arg()).collect();
        assert_eq!(args, vec!["N", "S", "E", "W"]);
    }

    #[test]
    fn outcome_accessors() {
        let failed = SequenceOutcome::DitherFailed {
            target: "Vega".into(),
            direction: Direction::South,
            message: "exit status 1".into(),
        };
        assert_eq!(failed.target(), "Vega");
        assert_eq!(failed.failure_kind(), Some(FailureKind::Dither));
        assert_eq!(failed.message(), Some("exit status 1"));

        let skipped = SequenceOutcome::Skipped {
            target: "Deneb".into(),
        };
        assert!(skipped.is_skipped());
        assert_eq!(skipped.failure_kind(), None);
        assert_eq!(skipped.message(), None);
    }

    #[test]
    fn outcome_json_is_tagged() {
        let outcome = SequenceOutcome::GuideFailed {
            target: "Altair".into(),
            step: GuideStep::Stop,
            message: "guider stop exited with status 2".into(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"outcome\":\"guide_failed\""));
        assert!(json.contains("\"step\":\"stop\""));
    }
}
