//! Host-facing command layer, kept free of argument parsing so it can be
//! driven programmatically as well as from `main`.

pub mod commands;

pub use commands::{execute, run_command, Command, CommandOutcome};
