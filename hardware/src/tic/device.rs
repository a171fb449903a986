//! High-level Tic driver.
//!
//! Wraps a [`TicTransport`] with the start/stop sequences used by the bench and
//! typed accessors for the status fields. Every accessor fetches a fresh status
//! report, so reading several fields is not atomic; use
//! [`snapshot`](Tic::snapshot) when all fields must come from one report.
//!
//! # Example
//!
//! ```no_run
//! use hardware::tic::{Tic, TicCmd};
//!
//! let mut tic = Tic::new(TicCmd::default());
//! tic.start();
//! tic.set_target_position(800);
//! while tic.current_position()? != 800 {}
//! tic.stop();
//! # Ok::<(), hardware::tic::TicError>(())
//! ```

use std::thread;
use std::time::Duration;

use strum::{Display, EnumString};
use tracing::{debug, info};

use super::status::{self, AnalogPin, StatusSnapshot};
use super::ticcmd::{TicCmd, TicResult, TicTransport};

/// Direction of a homing move toward a limit switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum HomeDirection {
    #[strum(serialize = "fwd")]
    Forward,
    #[strum(serialize = "rev")]
    Reverse,
}

/// Delays applied after the start and stop sequences so the motor can settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleTimes {
    pub start: Duration,
    pub stop: Duration,
}

impl Default for SettleTimes {
    fn default() -> Self {
        Self {
            start: Duration::from_secs(2),
            stop: Duration::from_secs(4),
        }
    }
}

impl SettleTimes {
    /// No waiting at all; used with the simulated controller.
    pub fn none() -> Self {
        Self {
            start: Duration::ZERO,
            stop: Duration::ZERO,
        }
    }
}

/// Tic stepper controller.
pub struct Tic<T = TicCmd> {
    transport: T,
    settle: SettleTimes,
    analog_pin: AnalogPin,
}

impl<T: TicTransport> Tic<T> {
    /// Driver with default settle times, logging the SDA analog channel.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            settle: SettleTimes::default(),
            analog_pin: AnalogPin::Sda,
        }
    }

    pub fn with_settle_times(mut self, settle: SettleTimes) -> Self {
        self.settle = settle;
        self
    }

    /// Pin read by [`analog_reading`](Self::analog_reading) and snapshots.
    pub fn with_analog_pin(mut self, pin: AnalogPin) -> Self {
        self.analog_pin = pin;
        self
    }

    pub fn settle_times(&self) -> SettleTimes {
        self.settle
    }

    pub fn analog_pin(&self) -> AnalogPin {
        self.analog_pin
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ==================== Control Commands ====================

    pub fn energize(&mut self) {
        self.transport.command(&["--energize"]);
    }

    pub fn deenergize(&mut self) {
        self.transport.command(&["--deenergize"]);
    }

    pub fn exit_safe_start(&mut self) {
        self.transport.command(&["--exit-safe-start"]);
    }

    pub fn enter_safe_start(&mut self) {
        self.transport.command(&["--enter-safe-start"]);
    }

    /// Command an absolute target in microsteps. Negative targets are allowed.
    pub fn set_target_position(&mut self, target: i32) {
        let target = target.to_string();
        self.transport.command(&["--position", &target]);
    }

    /// Command a target relative to the current position.
    pub fn set_position_relative(&mut self, delta: i32) {
        let delta = delta.to_string();
        self.transport.command(&["--position-relative", &delta]);
    }

    /// Stop abruptly and redefine the current position.
    pub fn halt_and_set_position(&mut self, position: i32) {
        let position = position.to_string();
        self.transport.command(&["--halt-and-set-position", &position]);
    }

    /// Stop abruptly, keeping the motor energized.
    pub fn halt_and_hold(&mut self) {
        self.transport.command(&["--halt-and-hold"]);
    }

    /// Drive toward the limit switch in `direction`.
    pub fn home(&mut self, direction: HomeDirection) {
        let direction = direction.to_string();
        self.transport.command(&["--home", &direction]);
    }

    /// Make the controller forget its current state.
    pub fn reset(&mut self) {
        self.transport.command(&["--reset"]);
    }

    pub fn clear_driver_error(&mut self) {
        self.transport.command(&["--clear-driver-error"]);
    }

    pub fn reset_command_timeout(&mut self) {
        self.transport.command(&["--reset-command-timeout"]);
    }

    // ==================== Sequences ====================

    /// Leave safe start, energize, command home and wait for the motor to settle.
    pub fn start(&mut self) {
        info!("Starting Tic");
        self.exit_safe_start();
        self.energize();
        self.set_target_position(0);
        thread::sleep(self.settle.start);
    }

    /// Return home, wait, then deenergize and re-enter safe start.
    pub fn stop(&mut self) {
        info!("Stopping Tic");
        self.set_target_position(0);
        thread::sleep(self.settle.stop);
        self.deenergize();
        self.enter_safe_start();
    }

    /// Full cycle through start, reverse homing and stop.
    pub fn restart(&mut self) {
        self.start();
        self.home(HomeDirection::Reverse);
        self.stop();
    }

    // ==================== Status ====================

    pub fn status_report(&mut self) -> TicResult<String> {
        self.transport.status_report()
    }

    pub fn current_position(&mut self) -> TicResult<i32> {
        status::current_position(&self.transport.status_report()?)
    }

    pub fn current_velocity(&mut self) -> TicResult<i32> {
        status::current_velocity(&self.transport.status_report()?)
    }

    pub fn encoder_position(&mut self) -> TicResult<i32> {
        status::encoder_position(&self.transport.status_report()?)
    }

    /// Raw analog reading of the configured pin.
    pub fn analog_reading(&mut self) -> TicResult<u32> {
        self.analog_reading_of(self.analog_pin)
    }

    pub fn analog_reading_of(&mut self, pin: AnalogPin) -> TicResult<u32> {
        status::analog_reading(&self.transport.status_report()?, pin)
    }

    /// Input voltage in volts.
    pub fn vin_voltage(&mut self) -> TicResult<f64> {
        status::vin_voltage(&self.transport.status_report()?)
    }

    /// Every field read from one report, one `ticcmd` invocation.
    pub fn snapshot(&mut self) -> TicResult<StatusSnapshot> {
        let report = self.transport.status_report()?;
        let snapshot = StatusSnapshot::parse(&report, self.analog_pin)?;
        debug!("Tic snapshot: {:?}", snapshot);
        Ok(snapshot)
    }
}
