//! Command surface consumed by the host
//!
//! Each command maps onto one engine operation and reports back the
//! formatted version plus a success flag, independent of how the host
//! parses its arguments.

use crate::engine::VersionEngine;
use crate::error::Result;
use crate::format::Formatter;

/// One host-level command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read and format; `None` uses the configured default format
    Show { format: Option<String> },
    Commit,
    Major,
    Minor,
    Patch,
    /// Absorb from the source, or only refresh the timestamp
    Absorb { timestamp_only: bool },
}

impl Command {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Command::Show { .. })
    }
}

/// What a command hands back to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Formatted version on success, error message on failure
    pub output: String,
    pub success: bool,
}

/// Run `command` and format the resulting record.
///
/// `default_format` is used by every command except a `Show` that names
/// its own format.
pub fn execute(
    engine: &mut VersionEngine,
    formatter: &Formatter,
    default_format: &str,
    command: &Command,
) -> Result<String> {
    let record = match command {
        Command::Show { .. } => engine.read()?,
        Command::Commit => engine.bump_commit()?,
        Command::Major => engine.bump_major()?,
        Command::Minor => engine.bump_minor()?,
        Command::Patch => engine.bump_patch()?,
        Command::Absorb {
            timestamp_only: true,
        } => engine.touch_timestamp()?,
        Command::Absorb {
            timestamp_only: false,
        } => engine.absorb()?,
    };

    let format = match command {
        Command::Show {
            format: Some(format),
        } => format.as_str(),
        _ => default_format,
    };
    formatter.format(&record, format)
}

/// Like [execute], folding the error into the outcome
pub fn run_command(
    engine: &mut VersionEngine,
    formatter: &Formatter,
    default_format: &str,
    command: &Command,
) -> CommandOutcome {
    match execute(engine, formatter, default_format, command) {
        Ok(output) => CommandOutcome {
            output,
            success: true,
        },
        Err(e) => CommandOutcome {
            output: e.to_string(),
            success: false,
        },
    }
}
