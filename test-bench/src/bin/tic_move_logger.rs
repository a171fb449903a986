//! Log Tic status across a series of out-and-back moves.
//!
//! With no arguments this runs four cycles (1 to 4 turns of a 200 step motor)
//! and writes `test_<timestamp>/target_<N>.csv` in the working directory.
//! Ctrl-C cancels the current cycle: the motor is sent home and stopped, and
//! the run continues with the next cycle. Ctrl-C outside a cycle ends the run.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hardware::tic::AnalogPin;
use test_bench::move_test::{CycleOutcome, MoveTest, MoveTestConfig, StatusMode};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Log Tic status while moving out and back", long_about = None)]
struct Args {
    #[arg(short, long, help = "JSON config file (fields default when absent)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Path to the ticcmd executable")]
    ticcmd: Option<String>,

    #[arg(short, long, help = "Serial number of the Tic to use")]
    device: Option<String>,

    #[arg(
        short,
        long,
        value_delimiter = ',',
        help = "Turn count of each cycle, comma separated (default 1,2,3,4)"
    )]
    turns: Option<Vec<u32>>,

    #[arg(long, help = "Motor steps per turn (default 200)")]
    steps_per_turn: Option<i32>,

    #[arg(short, long, help = "Directory in which the run directory is created")]
    output_root: Option<PathBuf>,

    #[arg(long, value_enum, help = "Read status per field or as one snapshot")]
    status_mode: Option<StatusMode>,

    #[arg(long, help = "Analog pin to log: SCL, SDA, TX or RX (default SDA)")]
    analog_pin: Option<AnalogPin>,

    #[arg(long, help = "Settle time after starting the Tic, in milliseconds")]
    start_settle_ms: Option<u64>,

    #[arg(long, help = "Settle time before deenergizing, in milliseconds")]
    stop_settle_ms: Option<u64>,

    #[arg(long, help = "Write the effective config to this file and exit")]
    save_config: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<(MoveTestConfig, Option<PathBuf>)> {
        let mut config = match &self.config {
            Some(path) => MoveTestConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => MoveTestConfig::default(),
        };

        if let Some(ticcmd) = self.ticcmd {
            config.ticcmd = ticcmd;
        }
        if self.device.is_some() {
            config.device = self.device;
        }
        if let Some(turns) = self.turns {
            config.turns = turns;
        }
        if let Some(steps) = self.steps_per_turn {
            config.steps_per_turn = steps;
        }
        if let Some(root) = self.output_root {
            config.output_root = root;
        }
        if let Some(mode) = self.status_mode {
            config.status_mode = mode;
        }
        if let Some(pin) = self.analog_pin {
            config.analog_pin = pin;
        }
        if let Some(ms) = self.start_settle_ms {
            config.start_settle_ms = ms;
        }
        if let Some(ms) = self.stop_settle_ms {
            config.stop_settle_ms = ms;
        }

        config.validate()?;
        Ok((config, self.save_config))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let (config, save_path) = Args::parse().into_config()?;

    if let Some(path) = save_path {
        config.save_to_file(&path)?;
        info!("Config written to {}", path.display());
        return Ok(());
    }

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupt);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl-C handler")?;

    let mut test = MoveTest::from_config(config).with_interrupt(interrupt);
    let report = test.run()?;

    for cycle in &report.cycles {
        match cycle.outcome {
            CycleOutcome::Completed => info!(
                "{}: {} samples ({} turns)",
                cycle.path.display(),
                cycle.rows,
                cycle.turns
            ),
            CycleOutcome::Interrupted => warn!(
                "{}: interrupted after {} samples",
                cycle.path.display(),
                cycle.rows
            ),
        }
    }
    if report.interrupted {
        warn!(
            "Run ended early after {} of {} cycles: {}",
            report.cycles.len(),
            test.config().turns.len(),
            report.directory.display()
        );
    } else {
        info!("Run complete: {}", report.directory.display());
    }
    Ok(())
}
