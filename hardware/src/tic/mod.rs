//! Pololu Tic stepper motor controller driven through the `ticcmd` CLI.
//!
//! The Tic has no structured host protocol exposed here; every operation spawns
//! `ticcmd` and, for status queries, scrapes its human-readable report.
//!
//! - [`TicCmd`] runs the external program (the [`TicTransport`] seam).
//! - [`status`] extracts numeric fields from `ticcmd --status --full` text.
//! - [`Tic`] is the high-level driver: start/stop sequences, moves, homing and
//!   typed status accessors.
//! - [`mock::SimulatedTic`] stands in for the hardware in tests.

mod device;
pub mod mock;
pub mod status;
mod ticcmd;

pub use device::{HomeDirection, SettleTimes, Tic};
pub use status::{AnalogPin, StatusSnapshot};
pub use ticcmd::{TicCmd, TicError, TicResult, TicTransport, DEFAULT_PROGRAM};
