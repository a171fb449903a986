//! Cycle driver: out to the target, back to home, one CSV file per cycle.
//!
//! Polling is as fast as `ticcmd` answers; there is no sleep between polls and
//! no timeout. Transitions use exact equality on the reported position.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local};
use hardware::tic::{Tic, TicCmd, TicTransport};
use tracing::{debug, info, warn};

use super::config::{MoveTestConfig, StatusMode};
use super::logger::SampleLogger;
use super::sample::Sample;
use super::MoveTestError;

const HOME_POSITION: i32 = 0;

/// Phase of a single cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    MovingToTarget,
    ReturningHome,
    Complete,
}

impl CycleState {
    /// State after observing `position` while heading for `target`.
    pub fn advance(self, position: i32, target: i32) -> Self {
        match self {
            CycleState::MovingToTarget if position == target => CycleState::ReturningHome,
            CycleState::ReturningHome if position == HOME_POSITION => CycleState::Complete,
            state => state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    /// Cancelled by Ctrl-C; the device was sent home and stopped.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub turns: u32,
    pub target: i32,
    pub path: PathBuf,
    pub rows: usize,
    pub outcome: CycleOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub directory: PathBuf,
    pub cycles: Vec<CycleReport>,
    /// The run was cut short by an interrupt outside any cycle.
    pub interrupted: bool,
}

/// Create `test_<YYYYMMDD_HHMMSS>` under `root`. An existing directory is
/// reused.
pub fn create_run_directory(
    root: &Path,
    timestamp: DateTime<Local>,
) -> std::io::Result<PathBuf> {
    let directory = root.join(format!("test_{}", timestamp.format("%Y%m%d_%H%M%S")));
    std::fs::create_dir_all(&directory)?;
    Ok(directory)
}

/// Runs move cycles against a Tic and logs every poll.
pub struct MoveTest<T: TicTransport> {
    tic: Tic<T>,
    config: MoveTestConfig,
    interrupt: Arc<AtomicBool>,
}

impl MoveTest<TicCmd> {
    /// Bench against the real `ticcmd` described by `config`.
    pub fn from_config(config: MoveTestConfig) -> Self {
        let tic = Tic::new(config.ticcmd()).with_settle_times(config.settle_times());
        Self::new(tic, config)
    }
}

impl<T: TicTransport> MoveTest<T> {
    pub fn new(tic: Tic<T>, config: MoveTestConfig) -> Self {
        let tic = tic.with_analog_pin(config.analog_pin);
        Self {
            tic,
            config,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share `flag` as the interrupt signal, e.g. with a Ctrl-C handler.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn config(&self) -> &MoveTestConfig {
        &self.config
    }

    pub fn tic(&self) -> &Tic<T> {
        &self.tic
    }

    pub fn tic_mut(&mut self) -> &mut Tic<T> {
        &mut self.tic
    }

    /// Read one sample from the controller.
    pub fn poll(&mut self, started: Instant) -> Result<Sample, MoveTestError> {
        let sample = match self.config.status_mode {
            StatusMode::PerField => {
                let position = self.tic.current_position()?;
                let speed = self.tic.current_velocity()?;
                let encoder = self.tic.encoder_position()?;
                let analog = self.tic.analog_reading()?;
                let vin = self.tic.vin_voltage()?;
                Sample::new(position, speed, encoder, analog, vin, started.elapsed())
            }
            StatusMode::Snapshot => {
                let snapshot = self.tic.snapshot()?;
                Sample::from_snapshot(&snapshot, started.elapsed())
            }
        };
        Ok(sample)
    }

    fn poll_into(
        &mut self,
        logger: &mut SampleLogger,
        started: Instant,
    ) -> Result<i32, MoveTestError> {
        let sample = self.poll(started)?;
        logger.append(&sample)?;
        Ok(sample.position)
    }

    /// Poll and log one row. `None` means the poll failed while an interrupt
    /// was pending; the interrupt is consumed.
    fn poll_or_interrupt(
        &mut self,
        logger: &mut SampleLogger,
        started: Instant,
    ) -> Result<Option<i32>, MoveTestError> {
        match self.poll_into(logger, started) {
            Ok(position) => Ok(Some(position)),
            // Ctrl-C can kill the `ticcmd` child mid-query
            Err(e) if self.interrupt.swap(false, Ordering::SeqCst) => {
                warn!("Status read failed after interrupt: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Send the motor home, stop the device and close the cycle's file.
    fn cancel_cycle(
        &mut self,
        turns: u32,
        target: i32,
        path: PathBuf,
        logger: SampleLogger,
    ) -> Result<CycleReport, MoveTestError> {
        self.tic.set_target_position(HOME_POSITION);
        self.tic.stop();
        let rows = logger.rows();
        logger.close()?;
        Ok(CycleReport {
            turns,
            target,
            path,
            rows,
            outcome: CycleOutcome::Interrupted,
        })
    }

    /// Run one out-and-back cycle of `turns` turns, logging into `directory`.
    ///
    /// A status failure propagates immediately unless an interrupt is
    /// pending. An interrupt sends the motor home, stops the device and
    /// returns normally.
    pub fn run_cycle(
        &mut self,
        directory: &Path,
        turns: u32,
    ) -> Result<CycleReport, MoveTestError> {
        let target = self.config.target_for(turns)?;
        info!("Number of turns: {}", turns);

        let path = directory.join(format!("target_{target}.csv"));
        let mut logger = SampleLogger::create(&path)?;
        let started = Instant::now();

        let Some(mut position) = self.poll_or_interrupt(&mut logger, started)? else {
            return self.cancel_cycle(turns, target, path, logger);
        };
        self.tic.set_target_position(target);
        let mut state = CycleState::MovingToTarget;

        loop {
            let next = state.advance(position, target);
            if next != state {
                debug!("{:?} -> {:?} at position {}", state, next, position);
                if next == CycleState::ReturningHome {
                    self.tic.set_target_position(HOME_POSITION);
                }
                state = next;
                continue;
            }
            if state == CycleState::Complete {
                break;
            }

            if self.interrupt.swap(false, Ordering::SeqCst) {
                warn!("Interrupted at position {}, returning home", position);
                return self.cancel_cycle(turns, target, path, logger);
            }

            match self.poll_or_interrupt(&mut logger, started)? {
                Some(next_position) => position = next_position,
                None => return self.cancel_cycle(turns, target, path, logger),
            }
        }

        let rows = logger.rows();
        logger.close()?;
        info!(
            "Cycle to {} done: {} samples in {:.2}s",
            target,
            rows,
            started.elapsed().as_secs_f64()
        );
        Ok(CycleReport {
            turns,
            target,
            path,
            rows,
            outcome: CycleOutcome::Completed,
        })
    }

    /// Full run into a new timestamped directory under the output root.
    pub fn run(&mut self) -> Result<RunReport, MoveTestError> {
        let directory = create_run_directory(&self.config.output_root, Local::now())?;
        self.run_in(directory)
    }

    /// Start the device, run every configured cycle into `directory`, stop.
    ///
    /// An interrupt raised outside a cycle (during `start` or between
    /// cycles) ends the run before the next cycle begins.
    pub fn run_in(&mut self, directory: PathBuf) -> Result<RunReport, MoveTestError> {
        info!("Logging to {}", directory.display());
        self.tic.start();

        let mut cycles = Vec::with_capacity(self.config.turns.len());
        let mut interrupted = false;
        for turns in self.config.turns.clone() {
            // An interrupted cycle leaves the device stopped
            let restart = cycles
                .last()
                .is_some_and(|c: &CycleReport| c.outcome == CycleOutcome::Interrupted);
            if restart {
                self.tic.start();
            }
            if self.interrupt.swap(false, Ordering::SeqCst) {
                warn!("Interrupted before the {} turn cycle, ending run", turns);
                interrupted = true;
                break;
            }
            cycles.push(self.run_cycle(&directory, turns)?);
        }

        self.tic.stop();
        if self.interrupt.swap(false, Ordering::SeqCst) {
            debug!("Interrupt during stop ignored");
        }
        Ok(RunReport {
            directory,
            cycles,
            interrupted,
        })
    }
}
