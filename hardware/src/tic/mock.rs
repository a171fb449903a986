//! Simulated Tic for tests.
//!
//! Interprets the same arguments `ticcmd` accepts and renders status reports in
//! the same layout. Each status query advances the motor one step toward its
//! target, so a poll loop sees the position ramp just like on hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::ticcmd::{TicError, TicResult, TicTransport};

/// In-process stand-in for the `ticcmd` tool.
///
/// Clones share state, so a test can keep one handle for inspection while the
/// driver owns another.
#[derive(Clone)]
pub struct SimulatedTic {
    inner: Arc<Mutex<SimState>>,
}

struct SimState {
    position: i32,
    target: i32,
    velocity: i32,
    step: i32,
    energized: bool,
    safe_start: bool,
    vin: f64,
    analog: [u32; 4],
    status_queries: usize,
    commands: Vec<Vec<String>>,
    corrupt_after: Option<usize>,
    interrupt: Option<(usize, Arc<AtomicBool>)>,
    killed_by_interrupt: Option<(usize, Arc<AtomicBool>)>,
}

impl Default for SimulatedTic {
    fn default() -> Self {
        Self::new(50)
    }
}

impl SimulatedTic {
    /// New controller at position 0 moving `step` microsteps per status query.
    pub fn new(step: i32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimState {
                position: 0,
                target: 0,
                velocity: 0,
                step: step.max(1),
                energized: false,
                safe_start: true,
                vin: 12.3,
                analog: [1023, 3200, 65, 4095],
                status_queries: 0,
                commands: Vec::new(),
                corrupt_after: None,
                interrupt: None,
                killed_by_interrupt: None,
            })),
        }
    }

    /// Set the reported analog readings (SCL, SDA, TX, RX).
    pub fn set_analog(&self, readings: [u32; 4]) {
        self.inner.lock().unwrap().analog = readings;
    }

    pub fn set_vin(&self, vin: f64) {
        self.inner.lock().unwrap().vin = vin;
    }

    /// Return an empty report once `queries` status reports have been served.
    pub fn corrupt_after(&self, queries: usize) {
        self.inner.lock().unwrap().corrupt_after = Some(queries);
    }

    /// Raise `flag` once `queries` status reports have been served.
    pub fn interrupt_after(&self, queries: usize, flag: Arc<AtomicBool>) {
        self.inner.lock().unwrap().interrupt = Some((queries, flag));
    }

    /// Once `queries` status reports have been served, raise `flag` and fail
    /// the next query the way a `ticcmd` killed by SIGINT does. Fires once.
    pub fn kill_on_interrupt_after(&self, queries: usize, flag: Arc<AtomicBool>) {
        self.inner.lock().unwrap().killed_by_interrupt = Some((queries, flag));
    }

    pub fn position(&self) -> i32 {
        self.inner.lock().unwrap().position
    }

    pub fn target(&self) -> i32 {
        self.inner.lock().unwrap().target
    }

    pub fn is_energized(&self) -> bool {
        self.inner.lock().unwrap().energized
    }

    pub fn status_queries(&self) -> usize {
        self.inner.lock().unwrap().status_queries
    }

    /// Every control command received, as argument lists.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.inner.lock().unwrap().commands.clone()
    }

    /// Control commands joined with spaces, e.g. `"--position 200"`.
    pub fn command_lines(&self) -> Vec<String> {
        self.commands().iter().map(|args| args.join(" ")).collect()
    }

    pub fn clear_commands(&self) {
        self.inner.lock().unwrap().commands.clear();
    }
}

impl SimState {
    fn apply(&mut self, args: &[&str]) {
        let value = || args.get(1).and_then(|v| v.parse::<i32>().ok());
        match args.first().copied() {
            Some("--position") => {
                if let Some(target) = value() {
                    self.target = target;
                }
            }
            Some("--position-relative") => {
                if let Some(delta) = value() {
                    self.target = self.position + delta;
                }
            }
            Some("--halt-and-set-position") => {
                if let Some(position) = value() {
                    self.position = position;
                    self.target = position;
                }
            }
            Some("--halt-and-hold") => self.target = self.position,
            Some("--home") => self.target = 0,
            Some("--energize") => self.energized = true,
            Some("--deenergize") => self.energized = false,
            Some("--exit-safe-start") => self.safe_start = false,
            Some("--enter-safe-start") => self.safe_start = true,
            Some("--resume") => {
                self.energized = true;
                self.safe_start = false;
            }
            Some("--reset") => {
                self.target = self.position;
                self.safe_start = true;
            }
            _ => {}
        }
    }

    fn advance(&mut self) {
        if !self.energized || self.safe_start {
            self.velocity = 0;
            return;
        }
        let delta = (self.target - self.position).clamp(-self.step, self.step);
        self.position += delta;
        self.velocity = delta * 10_000;
    }

    fn render(&self) -> String {
        let [scl, sda, tx, rx] = self.analog;
        format!(
            "\
Name:                         Tic T825 Stepper Motor Controller
Serial number:                00000000
Firmware version:             1.06
Last reset:                   Power-on reset
Up time:                      0:00:01

Encoder position:             {encoder}
Input state:                  Position
VIN voltage:                  {vin:.1} V
Operation state:              {state}
Energized:                    {energized}

Target position:              {target}
Current position:             {position}
Current velocity:             {velocity}

Pin info:
  SCL pin:
    Analog reading:           {scl}
  SDA pin:
    Analog reading:           {sda}
  TX pin:
    Analog reading:           {tx}
  RX pin:
    Analog reading:           {rx}
",
            encoder = self.position / 4,
            vin = self.vin,
            state = if self.safe_start { "Safe start" } else { "Normal" },
            energized = if self.energized { "Yes" } else { "No" },
            target = self.target,
            position = self.position,
            velocity = self.velocity,
        )
    }
}

impl TicTransport for SimulatedTic {
    fn command(&mut self, args: &[&str]) {
        let mut state = self.inner.lock().unwrap();
        state
            .commands
            .push(args.iter().map(|s| s.to_string()).collect());
        state.apply(args);
    }

    fn query(&mut self, args: &[&str]) -> TicResult<String> {
        if args != ["--status", "--full"] {
            return Err(TicError::StatusFailed {
                status: "exit status: 1".to_string(),
                stderr: format!("Unsupported query: {}", args.join(" ")),
            });
        }

        let mut state = self.inner.lock().unwrap();
        if let Some((after, flag)) = &state.interrupt {
            if state.status_queries >= *after {
                flag.store(true, Ordering::SeqCst);
            }
        }
        let killed = matches!(
            &state.killed_by_interrupt,
            Some((after, _)) if state.status_queries >= *after
        );
        if killed {
            if let Some((_, flag)) = state.killed_by_interrupt.take() {
                flag.store(true, Ordering::SeqCst);
            }
            return Err(TicError::StatusFailed {
                status: "signal: 2 (SIGINT)".to_string(),
                stderr: String::new(),
            });
        }
        if matches!(state.corrupt_after, Some(after) if state.status_queries >= after) {
            return Ok(String::new());
        }

        state.status_queries += 1;
        state.advance();
        Ok(state.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tic::status;

    #[test]
    fn test_moves_only_when_energized() {
        let mut sim = SimulatedTic::new(10);
        sim.command(&["--position", "30"]);
        let report = sim.status_report().unwrap();
        assert_eq!(status::current_position(&report).unwrap(), 0);

        sim.command(&["--exit-safe-start"]);
        sim.command(&["--energize"]);
        let report = sim.status_report().unwrap();
        assert_eq!(status::current_position(&report).unwrap(), 10);
        assert_eq!(status::current_velocity(&report).unwrap(), 100_000);
    }

    #[test]
    fn test_does_not_overshoot() {
        let mut sim = SimulatedTic::new(25);
        sim.command(&["--resume"]);
        sim.command(&["--position", "-40"]);
        for _ in 0..5 {
            sim.status_report().unwrap();
        }
        assert_eq!(sim.position(), -40);
    }

    #[test]
    fn test_unsupported_query_fails() {
        let mut sim = SimulatedTic::default();
        assert!(sim.query(&["--list"]).is_err());
    }

    #[test]
    fn test_kill_on_interrupt_fires_once() {
        let mut sim = SimulatedTic::default();
        let flag = Arc::new(AtomicBool::new(false));
        sim.kill_on_interrupt_after(1, Arc::clone(&flag));

        assert!(sim.status_report().is_ok());
        assert!(!flag.load(Ordering::SeqCst));
        let err = sim.status_report().unwrap_err();
        assert!(matches!(err, TicError::StatusFailed { .. }));
        assert!(flag.load(Ordering::SeqCst));
        assert!(sim.status_report().is_ok());
        assert_eq!(sim.status_queries(), 2);
    }

    #[test]
    fn test_corrupt_report() {
        let mut sim = SimulatedTic::default();
        sim.corrupt_after(1);
        assert!(sim.status_report().unwrap().contains("Current position"));
        assert_eq!(sim.status_report().unwrap(), "");
    }
}
