//! Tic move test: drive the motor out and back while logging status to CSV.
//!
//! A run creates `test_<YYYYMMDD_HHMMSS>/` and, for each configured turn count,
//! writes `target_<N>.csv` with one row per status poll until the motor has
//! reached the target and come back to 0.

mod config;
mod driver;
mod logger;
mod sample;

pub use config::{MoveTestConfig, StatusMode};
pub use driver::{
    create_run_directory, CycleOutcome, CycleReport, CycleState, MoveTest, RunReport,
};
pub use logger::SampleLogger;
pub use sample::{parse_analog, Sample, ANALOG_SCALE, CSV_HEADER};

use hardware::tic::TicError;
use thiserror::Error;

/// Errors that end a move test run.
#[derive(Error, Debug)]
pub enum MoveTestError {
    /// Status could not be read or parsed.
    #[error("Tic error: {0}")]
    Tic(#[from] TicError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}
