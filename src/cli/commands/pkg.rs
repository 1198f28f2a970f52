//! `pkg` command: repackage a disk image into a flat package.

use crate::cli::RuntimeConfig;
use crate::error::Result;
use crate::repack::{
    self, ErrorExt, HdiutilMounter, PackageBuildRequest, PackageBuilder, PkgbuildBuilder,
    Workflow, WorkflowConfig,
};
use std::path::{Path, PathBuf};

/// Parsed `pkg` arguments.
#[derive(Debug, Clone, Copy)]
pub(super) struct PkgOptions<'a> {
    pub dmg: &'a Path,
    pub app_path: Option<&'a Path>,
    pub pkgname: Option<&'a str>,
    pub output_dir: Option<&'a Path>,
    pub request_json: Option<&'a Path>,
}

/// Package builder that writes each request as pretty JSON before handing it on.
#[derive(Debug, Clone)]
pub struct RequestDump<B> {
    inner: B,
    path: Option<PathBuf>,
}

impl<B> RequestDump<B> {
    /// Wraps `inner`; requests are written to `path` when it is set.
    pub fn new(inner: B, path: Option<PathBuf>) -> Self {
        Self { inner, path }
    }

    /// The wrapped builder.
    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<B: PackageBuilder> PackageBuilder for RequestDump<B> {
    async fn build(&mut self, request: PackageBuildRequest) -> repack::Result<PathBuf> {
        if let Some(path) = &self.path {
            let json = serde_json::to_string_pretty(&request).map_err(|e| {
                repack::Error::GenericError(format!("Failed to serialize build request: {e}"))
            })?;
            tokio::fs::write(path, json)
                .await
                .fs_context("writing build request", path)?;
            log::debug!("Wrote build request to {}", path.display());
        }
        self.inner.build(request).await
    }
}

/// Execute the `pkg` command
pub(super) async fn execute_pkg(options: PkgOptions<'_>, config: &RuntimeConfig) -> Result<i32> {
    let output_dir = match options.output_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };

    let mut workflow_config = WorkflowConfig::new(options.dmg);
    if let Some(app_path) = options.app_path {
        workflow_config = workflow_config.with_app_path(app_path);
    }
    if let Some(pkgname) = options.pkgname {
        workflow_config = workflow_config.with_package_name(pkgname);
    }

    let _ = config
        .output()
        .progress(&format!("Repackaging {}", options.dmg.display()));
    config.verbose_println(&format!("Output directory: {}", output_dir.display()));

    let builder = RequestDump::new(
        PkgbuildBuilder::new(output_dir),
        options.request_json.map(Path::to_path_buf),
    );
    let mut workflow = Workflow::new(HdiutilMounter::new(), builder);
    let package = workflow.run(&workflow_config).await?;

    config.success_println("Package created");
    config.result_println(&package.display().to_string());
    if let Some(path) = options.request_json {
        config.verbose_println(&format!("Build request written to {}", path.display()));
    }

    Ok(0)
}
