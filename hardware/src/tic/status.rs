//! Field extraction from `ticcmd --status --full` reports.
//!
//! The report is plain text meant for humans, one `Label: value` pair per line
//! with nested sections for the I/O pins:
//!
//! ```text
//! Encoder position:             -12
//! VIN voltage:                  12.3 V
//! Current position:             100
//! Current velocity:             -2000
//! Pin info:
//!   SCL pin:
//!     Analog reading:           1023
//!   SDA pin:
//!     Analog reading:           3200
//! ```
//!
//! Each extractor keeps only the lines containing its label and pulls the first
//! number out of them. A missing label or number is an error; nothing is
//! defaulted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::ticcmd::{TicError, TicResult};

const POSITION_LABEL: &str = "Current position";
const VELOCITY_LABEL: &str = "Current velocity";
const ENCODER_LABEL: &str = "Encoder";
const ANALOG_LABEL: &str = "Analog";
const VIN_LABEL: &str = "VIN";

static SIGNED_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+").expect("valid regex"));
static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid regex"));

/// I/O pins that report an analog reading, in report order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalogPin {
    #[strum(to_string = "SCL")]
    Scl,
    #[strum(to_string = "SDA")]
    Sda,
    #[strum(to_string = "TX")]
    Tx,
    #[strum(to_string = "RX")]
    Rx,
}

impl AnalogPin {
    /// Position of this pin among the report's `Analog reading` lines.
    pub fn index(self) -> usize {
        match self {
            AnalogPin::Scl => 0,
            AnalogPin::Sda => 1,
            AnalogPin::Tx => 2,
            AnalogPin::Rx => 3,
        }
    }
}

/// All logged fields taken from a single status report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    pub position: i32,
    pub velocity: i32,
    pub encoder_position: i32,
    pub analog_reading: u32,
    pub vin: f64,
}

impl StatusSnapshot {
    /// Parse every field from one report, reading the analog value of `pin`.
    pub fn parse(report: &str, pin: AnalogPin) -> TicResult<Self> {
        Ok(Self {
            position: current_position(report)?,
            velocity: current_velocity(report)?,
            encoder_position: encoder_position(report)?,
            analog_reading: analog_reading(report, pin)?,
            vin: vin_voltage(report)?,
        })
    }
}

/// Lines of `report` containing `label`, in order.
fn lines_with<'a>(report: &'a str, label: &str) -> TicResult<Vec<&'a str>> {
    let lines: Vec<&str> = report.lines().filter(|l| l.contains(label)).collect();
    if lines.is_empty() {
        return Err(TicError::LabelNotFound(label.to_string()));
    }
    Ok(lines)
}

fn first_integer(report: &str, label: &str) -> TicResult<i32> {
    let lines = lines_with(report, label)?;
    let token = lines
        .into_iter()
        .find_map(|line| SIGNED_INT.find(line))
        .ok_or_else(|| TicError::ParseError(format!("No integer after {label:?}")))?;
    token
        .as_str()
        .parse()
        .map_err(|_| TicError::ParseError(format!("Invalid integer: {}", token.as_str())))
}

/// Current position in microsteps.
pub fn current_position(report: &str) -> TicResult<i32> {
    first_integer(report, POSITION_LABEL)
}

/// Current velocity in microsteps per 10000 s.
pub fn current_velocity(report: &str) -> TicResult<i32> {
    first_integer(report, VELOCITY_LABEL)
}

/// Raw encoder count.
pub fn encoder_position(report: &str) -> TicResult<i32> {
    first_integer(report, ENCODER_LABEL)
}

/// Raw analog reading of one pin.
///
/// Each `Analog` line carries one pin's reading as a bare unsigned token; the
/// pin is selected by its position among those lines.
pub fn analog_reading(report: &str, pin: AnalogPin) -> TicResult<u32> {
    let lines = lines_with(report, ANALOG_LABEL)?;
    let line = lines.get(pin.index()).ok_or_else(|| {
        TicError::ParseError(format!(
            "No analog reading for {pin} ({} analog lines)",
            lines.len()
        ))
    })?;
    line.split_whitespace()
        .find_map(|token| token.parse::<u32>().ok())
        .ok_or_else(|| TicError::ParseError(format!("No analog value for {pin}: {line:?}")))
}

/// Input voltage in volts.
pub fn vin_voltage(report: &str) -> TicResult<f64> {
    let lines = lines_with(report, VIN_LABEL)?;
    let token = lines
        .into_iter()
        .find_map(|line| DECIMAL.find(line))
        .ok_or_else(|| TicError::ParseError(format!("No number after {VIN_LABEL:?}")))?;
    token
        .as_str()
        .parse()
        .map_err(|_| TicError::ParseError(format!("Invalid number: {}", token.as_str())))
}
