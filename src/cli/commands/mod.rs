//! Command execution for the `pkg` and `inspect` commands.

mod inspect;
mod pkg;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::{AppError, Result};

use inspect::execute_inspect;
use pkg::{PkgOptions, execute_pkg};

pub use pkg::RequestDump;

/// Execute the main command based on parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        // Validation errors are never quiet
        let config = RuntimeConfig::new(false, false);
        report_failure(&config, &AppError::from(validation_error));
        return Ok(1);
    }

    let config = RuntimeConfig::from(&args);

    let result = match &args.command {
        Command::Pkg {
            dmg,
            app_path,
            pkgname,
            output_dir,
            request_json,
        } => {
            let options = PkgOptions {
                dmg,
                app_path: app_path.as_deref(),
                pkgname: pkgname.as_deref(),
                output_dir: output_dir.as_deref(),
                request_json: request_json.as_deref(),
            };
            execute_pkg(options, &config).await
        }
        Command::Inspect { dmg } => execute_inspect(dmg, &config).await,
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            config.error_println(&format!("Command '{}' failed:", args.command.name()));
            report_failure(&config, &e);
            Ok(1)
        }
    }
}

/// Print an error followed by its recovery suggestions
fn report_failure(config: &RuntimeConfig, error: &AppError) {
    config.error_println(&error.to_string());

    let suggestions = error.recovery_suggestions();
    if !suggestions.is_empty() {
        config.println("\n💡 Recovery suggestions:");
        for suggestion in suggestions {
            config.println(&format!("  • {}", suggestion));
        }
    }

    if !error.is_recoverable() {
        config.verbose_println("Retrying with the same input will fail the same way");
    }
}
