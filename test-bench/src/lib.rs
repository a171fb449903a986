//! Motion test bench for the Pololu Tic stepper controller.
//!
//! Drives the motor through out-and-back moves with the `hardware::tic`
//! driver and records every status poll to CSV. See [`move_test`].

pub mod move_test;
