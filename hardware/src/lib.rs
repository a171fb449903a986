//! Hardware drivers for test bench equipment.
//!
//! Each driver is feature-gated for optional compilation.
//!
//! # Features
//!
//! - `tic` - Pololu Tic stepper controller via the `ticcmd` CLI (default)

#[cfg(feature = "tic")]
pub mod tic;
