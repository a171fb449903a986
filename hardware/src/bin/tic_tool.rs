//! Manual control tool for a Pololu Tic through `ticcmd`.
//!
//! Subcommands:
//! - `status`: print the parsed status fields (or the raw report)
//! - `move` / `move-relative`: command a target, optionally waiting for it
//! - `home`: drive to a limit switch
//! - `start` / `stop` / `restart` / `reset` / `halt`: device sequences

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hardware::tic::{status, AnalogPin, HomeDirection, SettleTimes, Tic, TicCmd, DEFAULT_PROGRAM};
use strum::IntoEnumIterator;
use tracing::info;

/// Pololu Tic control tool
#[derive(Parser, Debug)]
#[command(name = "tic_tool")]
#[command(about = "Control a Pololu Tic stepper controller through ticcmd")]
#[command(version)]
struct Args {
    /// Path to the ticcmd executable
    #[arg(long, global = true, default_value = DEFAULT_PROGRAM)]
    ticcmd: String,

    /// Serial number of the Tic to address
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Settle time after the start sequence, in milliseconds
    #[arg(long, global = true, default_value = "2000")]
    start_settle_ms: u64,

    /// Settle time before deenergizing in the stop sequence, in milliseconds
    #[arg(long, global = true, default_value = "4000")]
    stop_settle_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print current position, velocity, encoder, analog inputs and VIN
    Status {
        /// Print the unparsed ticcmd report instead
        #[arg(long)]
        raw: bool,
    },

    /// Move to an absolute position in microsteps
    Move {
        #[arg(allow_negative_numbers = true)]
        position: i32,

        /// Wait until the reported position equals the target
        #[arg(short, long)]
        wait: bool,

        /// Timeout in seconds when waiting
        #[arg(short, long, default_value = "30")]
        timeout: u64,
    },

    /// Move relative to the current position
    MoveRelative {
        #[arg(allow_negative_numbers = true)]
        delta: i32,
    },

    /// Drive to a limit switch ("fwd" or "rev")
    Home { direction: HomeDirection },

    /// Exit safe start, energize and go to position 0
    Start,

    /// Return to 0, deenergize and enter safe start
    Stop,

    /// Start, home in reverse, then stop
    Restart,

    /// Make the controller forget its current state
    Reset,

    /// Stop abruptly and hold position
    Halt,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut ticcmd = TicCmd::new(&args.ticcmd);
    if let Some(serial) = &args.device {
        ticcmd = ticcmd.with_serial(serial);
    }
    let mut tic = Tic::new(ticcmd).with_settle_times(SettleTimes {
        start: Duration::from_millis(args.start_settle_ms),
        stop: Duration::from_millis(args.stop_settle_ms),
    });

    match args.command {
        Command::Status { raw } => cmd_status(&mut tic, raw),
        Command::Move {
            position,
            wait,
            timeout,
        } => cmd_move(&mut tic, position, wait, Duration::from_secs(timeout)),
        Command::MoveRelative { delta } => {
            info!("Moving {} microsteps", delta);
            tic.set_position_relative(delta);
            Ok(())
        }
        Command::Home { direction } => {
            info!("Homing {}", direction);
            tic.home(direction);
            Ok(())
        }
        Command::Start => {
            tic.start();
            Ok(())
        }
        Command::Stop => {
            tic.stop();
            Ok(())
        }
        Command::Restart => {
            tic.restart();
            Ok(())
        }
        Command::Reset => {
            tic.reset();
            Ok(())
        }
        Command::Halt => {
            tic.halt_and_hold();
            Ok(())
        }
    }
}

fn cmd_status(tic: &mut Tic, raw: bool) -> Result<()> {
    let report = tic.status_report().context("Failed to read Tic status")?;
    if raw {
        print!("{report}");
        return Ok(());
    }

    println!("Position: {}", status::current_position(&report)?);
    println!("Velocity: {}", status::current_velocity(&report)?);
    println!("Encoder:  {}", status::encoder_position(&report)?);
    for pin in AnalogPin::iter() {
        println!("Analog {pin}: {}", status::analog_reading(&report, pin)?);
    }
    println!("VIN:      {:.2} V", status::vin_voltage(&report)?);
    Ok(())
}

fn cmd_move(tic: &mut Tic, position: i32, wait: bool, timeout: Duration) -> Result<()> {
    info!("Moving to {}", position);
    tic.set_target_position(position);
    if !wait {
        return Ok(());
    }

    let start = Instant::now();
    loop {
        let current = tic.current_position()?;
        if current == position {
            info!("Reached {} in {:.2}s", position, start.elapsed().as_secs_f64());
            return Ok(());
        }
        if start.elapsed() > timeout {
            bail!("Timed out at position {current} waiting for {position}");
        }
    }
}
