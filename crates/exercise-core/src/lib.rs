pub mod cancel;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod driver;
pub mod ephemeris;
pub mod error;
pub mod gateway;
pub mod run_log;
pub mod selector;
pub mod sequencer;
pub mod types;

#[cfg(test)]
mod testutil;

pub use error::{ExerciseError, Result};
