use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExerciseError {
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("lost track of '{program}' while waiting for it: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown location '{0}': expected NewMexicoSkies or Toronto")]
    UnknownLocation(String),

    #[error("star '{0}' is not in the built-in catalog")]
    UnknownStar(String),

    #[error("invalid altitude window: {0}")]
    InvalidWindow(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("sequencing worker panicked")]
    WorkerPanicked,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl ExerciseError {
    /// True when the actuator program could not be started at all.
    ///
    /// The sequencer folds these into the failing step's outcome; every
    /// other error coming out of the gateway aborts the run.
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, ExerciseError::Launch { .. })
    }
}

pub type Result<T> = std::result::Result<T, ExerciseError>;
