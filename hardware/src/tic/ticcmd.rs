//! Process transport for the `ticcmd` command-line tool.
//!
//! Control commands (`--position`, `--energize`, ...) are fire-and-forget: the
//! exit status is logged and otherwise ignored. Queries (`--status --full`)
//! capture stdout and fail on a spawn error or a non-zero exit.
//!
//! On unix every child runs in its own process group, so a Ctrl-C at the
//! terminal reaches only the bench and never a `ticcmd` mid-query.

use std::path::{Path, PathBuf};
use std::process::Command;

#[cfg(unix)]
use std::os::unix::process::CommandExt;

use thiserror::Error;
use tracing::{debug, trace, warn};

/// Program name looked up on `PATH` when no explicit path is configured.
pub const DEFAULT_PROGRAM: &str = "ticcmd";

/// Errors that can occur while querying the Tic.
#[derive(Error, Debug)]
pub enum TicError {
    /// Low-level I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The external program could not be started at all.
    #[error("Failed to run {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The status query ran but exited unsuccessfully.
    #[error("Status query exited with {status}: {stderr}")]
    StatusFailed { status: String, stderr: String },

    /// No line of the status report carries the expected label.
    #[error("Label {0:?} not found in status report")]
    LabelNotFound(String),

    /// The label was present but no usable number followed it.
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type for Tic operations.
pub type TicResult<T> = Result<T, TicError>;

/// How commands reach the controller.
///
/// [`TicCmd`] shells out to the real tool; [`SimulatedTic`](super::mock::SimulatedTic)
/// answers in-process for tests.
pub trait TicTransport {
    /// Send a control command. Failures are not reported to the caller.
    fn command(&mut self, args: &[&str]);

    /// Run a query and return its standard output.
    fn query(&mut self, args: &[&str]) -> TicResult<String>;

    /// Fetch the full human-readable status report.
    fn status_report(&mut self) -> TicResult<String> {
        self.query(&["--status", "--full"])
    }
}

/// Invokes the `ticcmd` executable, optionally pinned to one device.
///
/// # Example
///
/// ```no_run
/// use hardware::tic::{TicCmd, TicTransport};
///
/// let mut ticcmd = TicCmd::new("ticcmd").with_serial("00312345");
/// ticcmd.command(&["--energize"]);
/// let report = ticcmd.status_report()?;
/// println!("{report}");
/// # Ok::<(), hardware::tic::TicError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TicCmd {
    program: PathBuf,
    serial: Option<String>,
}

impl Default for TicCmd {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl TicCmd {
    /// Use the given program path (or bare name resolved via `PATH`).
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            serial: None,
        }
    }

    /// Address a specific controller by serial number (`-d SERIALNUMBER`).
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    fn build(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(serial) = &self.serial {
            cmd.arg("-d").arg(serial);
        }
        cmd.args(args);
        // Terminal Ctrl-C must not kill a query mid-flight
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

impl TicTransport for TicCmd {
    fn command(&mut self, args: &[&str]) {
        debug!("ticcmd {}", args.join(" "));
        match self.build(args).status() {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("ticcmd {} exited with {}", args.join(" "), status),
            Err(e) => warn!("Failed to run {}: {}", self.program.display(), e),
        }
    }

    fn query(&mut self, args: &[&str]) -> TicResult<String> {
        debug!("ticcmd {}", args.join(" "));
        let output = self
            .build(args)
            .output()
            .map_err(|source| TicError::SpawnFailed {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(TicError::StatusFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!("ticcmd recv: {:?}", stdout);
        Ok(stdout)
    }
}
