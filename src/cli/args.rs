//! Command line argument parsing and validation.

use crate::error::CliError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Environment variable consulted when `--output-dir` is not given.
pub const OUTPUT_DIR_ENV: &str = "APP_DMG_PKG_OUTPUT_DIR";

/// Repackage drag-and-drop disk images as flat installer packages
#[derive(Parser, Debug)]
#[command(
    name = "app_dmg_pkg",
    version,
    about = "Repackage drag-and-drop disk images as flat installer packages",
    long_about = "Mount a disk image, find the application bundle on it, and build a flat
package that installs the app into /Applications. The image is always
unmounted again, even when packaging fails.

Usage:
  app_dmg_pkg pkg --dmg Tool.dmg
  app_dmg_pkg pkg --dmg Tool.dmg --app-path Tool.app --pkgname CustomPkg
  app_dmg_pkg inspect --dmg Tool.dmg"
)]
pub struct Args {
    /// Command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Show detailed progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print results and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build a flat package from the application on a disk image
    Pkg {
        /// Disk image to repackage
        #[arg(long, value_name = "PATH")]
        dmg: PathBuf,

        /// Bundle path relative to the mounted volume (skips the search)
        #[arg(long, value_name = "REL")]
        app_path: Option<PathBuf>,

        /// Package name to use instead of <name>-<version>
        #[arg(long, value_name = "NAME")]
        pkgname: Option<String>,

        /// Directory the package is written to
        #[arg(long, value_name = "DIR", env = OUTPUT_DIR_ENV)]
        output_dir: Option<PathBuf>,

        /// Also write the package build request as JSON to this file
        #[arg(long, value_name = "FILE")]
        request_json: Option<PathBuf>,
    },

    /// Print the name, identifier and version of the application on a disk image
    Inspect {
        /// Disk image to inspect
        #[arg(long, value_name = "PATH")]
        dmg: PathBuf,
    },
}

impl Command {
    /// Command name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Pkg { .. } => "pkg",
            Command::Inspect { .. } => "inspect",
        }
    }

    /// Disk image the command operates on
    pub fn dmg(&self) -> &PathBuf {
        match self {
            Command::Pkg { dmg, .. } | Command::Inspect { dmg } => dmg,
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    ///
    /// Empty `--dmg` values are already rejected by clap's path parser.
    pub fn validate(&self) -> Result<(), CliError> {
        let invalid = |reason: String| CliError::InvalidArguments { reason };

        let dmg = self.command.dmg();
        if !dmg.exists() {
            return Err(invalid(format!(
                "disk image {} does not exist",
                dmg.display()
            )));
        }

        if let Command::Pkg {
            pkgname: Some(name),
            ..
        } = &self.command
            && name.is_empty()
        {
            return Err(invalid("--pkgname must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            output: super::OutputManager::new(verbose, quiet),
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print result line; shown even in quiet mode
    pub fn result_println(&self, message: &str) {
        let _ = self.output.result(message);
    }

    /// Print verbose message
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.verbose, args.quiet)
    }
}
