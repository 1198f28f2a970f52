//! Command line interface for app_dmg_pkg.
//!
//! This module provides argument parsing, command execution, and user feedback
//! for the `pkg` and `inspect` commands.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, RuntimeConfig, OUTPUT_DIR_ENV};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
