//! External stage runner abstraction.
//!
//! The pipeline drives external binaries (MACS2) through this trait so the
//! orchestration logic can be exercised with an in-process fake.

use std::process::Command;

use log::debug;

use crate::narrowpeak::{PeakError, Result};

/// Invoke an external program and wait for it to exit.
///
/// Implementations block until the process exits and must report a non-zero
/// exit status as an error. No retries.
pub trait ExternalRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<()>;
}

/// Runs external programs via `std::process::Command`, inheriting stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ExternalRunner for ShellRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<()> {
        debug!("Running: {} {}", program, args.join(" "));

        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|e| PeakError::ExternalProcess {
                command: format!("{} ({})", program, e),
                code: None,
            })?;

        if !status.success() {
            return Err(PeakError::ExternalProcess {
                command: format!("{} {}", program, args.join(" ")),
                code: status.code(),
            });
        }
        Ok(())
    }
}
