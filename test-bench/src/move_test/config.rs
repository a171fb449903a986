//! Move test configuration.
//!
//! Defaults reproduce the standard bench run: four cycles of 1-4 turns on a
//! 200 step/rev motor, logging into the working directory. A JSON file can
//! override any subset of fields; CLI flags are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use hardware::tic::{AnalogPin, SettleTimes, TicCmd, DEFAULT_PROGRAM};
use serde::{Deserialize, Serialize};

use super::MoveTestError;

/// How a poll reads the five status fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StatusMode {
    /// One `ticcmd` invocation per field; fields may come from different
    /// instants.
    #[default]
    PerField,
    /// All fields from a single status report.
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveTestConfig {
    /// `ticcmd` executable, bare name or path.
    pub ticcmd: String,
    /// Serial number of the Tic, when more than one is connected.
    pub device: Option<String>,
    /// Turn count of each cycle, in run order.
    pub turns: Vec<u32>,
    /// Full steps per motor revolution (no microstepping).
    pub steps_per_turn: i32,
    /// Directory under which the timestamped run directory is created.
    pub output_root: PathBuf,
    pub status_mode: StatusMode,
    pub analog_pin: AnalogPin,
    pub start_settle_ms: u64,
    pub stop_settle_ms: u64,
}

impl Default for MoveTestConfig {
    fn default() -> Self {
        Self {
            ticcmd: DEFAULT_PROGRAM.to_string(),
            device: None,
            turns: vec![1, 2, 3, 4],
            steps_per_turn: 200,
            output_root: PathBuf::from("."),
            status_mode: StatusMode::PerField,
            analog_pin: AnalogPin::Sda,
            start_settle_ms: 2000,
            stop_settle_ms: 4000,
        }
    }
}

impl MoveTestConfig {
    /// Load from a JSON file; missing fields keep their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, MoveTestError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| MoveTestError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), MoveTestError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| MoveTestError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), MoveTestError> {
        if self.turns.is_empty() {
            return Err(MoveTestError::Config("No turn counts given".to_string()));
        }
        for &turns in &self.turns {
            self.target_for(turns)?;
        }
        Ok(())
    }

    /// Target microstep count for a cycle of `turns` turns.
    pub fn target_for(&self, turns: u32) -> Result<i32, MoveTestError> {
        i32::try_from(turns)
            .ok()
            .and_then(|t| t.checked_mul(self.steps_per_turn))
            .ok_or_else(|| {
                MoveTestError::Config(format!(
                    "{turns} turns of {} steps overflows the position range",
                    self.steps_per_turn
                ))
            })
    }

    pub fn settle_times(&self) -> SettleTimes {
        SettleTimes {
            start: Duration::from_millis(self.start_settle_ms),
            stop: Duration::from_millis(self.stop_settle_ms),
        }
    }

    /// Process transport for the configured program and device.
    pub fn ticcmd(&self) -> TicCmd {
        let ticcmd = TicCmd::new(&self.ticcmd);
        match &self.device {
            Some(serial) => ticcmd.with_serial(serial),
            None => ticcmd,
        }
    }
}
