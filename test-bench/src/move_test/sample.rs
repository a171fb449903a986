//! One logged row of Tic status.

use std::time::Duration;

use hardware::tic::StatusSnapshot;
use serde::Serialize;

/// Divisor turning the raw analog reading into the logged `analog_parsed`
/// value. Depends on the sensor wired to the pin.
pub const ANALOG_SCALE: f64 = 160.0;

/// Column names, in row order.
pub const CSV_HEADER: [&str; 7] = [
    "position",
    "speed",
    "encoder_position",
    "analog_reading",
    "analog_parsed",
    "vin",
    "time",
];

/// Scale a raw analog reading.
pub fn parse_analog(raw: u32) -> f64 {
    raw as f64 / ANALOG_SCALE
}

/// A single poll of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub position: i32,
    pub speed: i32,
    pub encoder_position: i32,
    pub analog_reading: u32,
    pub analog_parsed: f64,
    pub vin: f64,
    /// Seconds since the cycle started.
    pub time: f64,
}

impl Sample {
    pub fn new(
        position: i32,
        speed: i32,
        encoder_position: i32,
        analog_reading: u32,
        vin: f64,
        elapsed: Duration,
    ) -> Self {
        Self {
            position,
            speed,
            encoder_position,
            analog_reading,
            analog_parsed: parse_analog(analog_reading),
            vin,
            time: elapsed.as_secs_f64(),
        }
    }

    pub fn from_snapshot(snapshot: &StatusSnapshot, elapsed: Duration) -> Self {
        Self::new(
            snapshot.position,
            snapshot.velocity,
            snapshot.encoder_position,
            snapshot.analog_reading,
            snapshot.vin,
            elapsed,
        )
    }
}
