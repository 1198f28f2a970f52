//! `inspect` command: report the application carried by a disk image.

use crate::cli::RuntimeConfig;
use crate::error::Result;
use crate::repack::{HdiutilMounter, InspectedApp, Workflow};
use std::path::Path;

/// Execute the `inspect` command
pub(super) async fn execute_inspect(dmg: &Path, config: &RuntimeConfig) -> Result<i32> {
    let _ = config
        .output()
        .progress(&format!("Inspecting {}", dmg.display()));

    let mut workflow = Workflow::for_inspection(HdiutilMounter::new());
    let app = workflow.inspect(dmg).await?;

    for line in report(&app) {
        config.result_println(&line);
    }
    Ok(0)
}

fn report(app: &InspectedApp) -> [String; 3] {
    [
        format!("app_name: {}", app.app_name),
        format!("bundleid: {}", app.metadata.identifier),
        format!("version: {}", app.metadata.version),
    ]
}
