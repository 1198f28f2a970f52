//! `pkgbuild`-backed flat package builder.

use super::PackageBuilder;
use crate::repack::{
    error::{Context, Error, ErrorExt, Result},
    request::{OwnershipDirective, PackageBuildRequest},
    tool_detection::{self, PKGBUILD},
    utils::fs,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// How `pkgbuild` should record file ownership in the payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum OwnershipMode {
    /// Keep the ownership staged on disk (directives were applied).
    Preserve,
    /// Let `pkgbuild` pick root ownership itself.
    Recommended,
}

impl OwnershipMode {
    fn as_arg(self) -> &'static str {
        match self {
            OwnershipMode::Preserve => "preserve",
            OwnershipMode::Recommended => "recommended",
        }
    }
}

/// Builds flat packages with `pkgbuild`.
///
/// The bundle is staged as `<root>/Applications/<App>.app` in a temporary
/// directory and packaged with an install location of `/`. The package is
/// written to `<output_dir>/<pkgname>.pkg`, replacing any previous file.
#[derive(Debug, Clone)]
pub struct PkgbuildBuilder {
    output_dir: PathBuf,
}

impl PkgbuildBuilder {
    /// Creates a builder writing packages into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory packages are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where the package for `request` will be written.
    pub fn package_path(&self, request: &PackageBuildRequest) -> PathBuf {
        self.output_dir.join(format!("{}.pkg", request.package_name))
    }
}

impl PackageBuilder for PkgbuildBuilder {
    async fn build(&mut self, request: PackageBuildRequest) -> Result<PathBuf> {
        log::info!(
            "Building {} package {}",
            request.package_type,
            request.package_name
        );

        let pkgbuild = tool_detection::require("pkgbuild", &PKGBUILD)?;

        fs::create_dir_all(&self.output_dir).await?;
        let pkg_path = self.package_path(&request);
        if pkg_path.exists() {
            tokio::fs::remove_file(&pkg_path)
                .await
                .fs_context("removing old package", &pkg_path)?;
        }

        let staging = tempfile::tempdir()
            .map_err(|e| Error::GenericError(format!("Failed to create package root: {e}")))?;
        let root = staging.path().join("root");

        let app_name = request
            .package_root
            .file_name()
            .context("package root has no file name")?;
        let staged_app = root.join("Applications").join(app_name);

        log::debug!("Staging {} at {}", request.package_root.display(), staged_app.display());
        fs::copy_dir(&request.package_root, &staged_app)
            .await
            .with_context(|| format!("staging {}", request.package_root.display()))?;

        let ownership = apply_ownership(&root, &request.chown)?;

        let args = pkgbuild_args(&request, &root, ownership, &pkg_path);
        let output = tokio::process::Command::new(&pkgbuild)
            .args(&args)
            .output()
            .await
            .map_err(|error| Error::CommandFailed {
                command: "pkgbuild".to_string(),
                error,
            })?;

        if !output.status.success() {
            return Err(Error::Build(format!(
                "pkgbuild failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        if !pkg_path.is_file() {
            return Err(Error::Build(format!(
                "pkgbuild reported success but {} was not created",
                pkg_path.display()
            )));
        }

        // tempfile removes the staged root
        drop(staging);

        log::info!("✓ Created package: {}", pkg_path.display());
        Ok(pkg_path)
    }
}

/// Command line for `pkgbuild`.
pub(crate) fn pkgbuild_args(
    request: &PackageBuildRequest,
    root: &Path,
    ownership: OwnershipMode,
    pkg_path: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--root".into(),
        root.into(),
        "--identifier".into(),
        request.identifier.clone().into(),
        "--version".into(),
        request.version.clone().into(),
        "--install-location".into(),
        "/".into(),
        "--ownership".into(),
        ownership.as_arg().into(),
    ];
    if !request.infofile.is_empty() {
        args.push("--info".into());
        args.push(request.infofile.clone().into());
    }
    args.push(pkg_path.into());
    args
}

/// Applies ownership directives to the staged root.
///
/// Changing ownership needs root privileges; without them the directives are
/// skipped and `pkgbuild` assigns its recommended ownership.
#[cfg(unix)]
fn apply_ownership(root: &Path, directives: &[OwnershipDirective]) -> Result<OwnershipMode> {
    if directives.is_empty() {
        return Ok(OwnershipMode::Recommended);
    }

    if users::get_effective_uid() != 0 {
        log::warn!(
            "Not running as root; skipping ownership directives and using pkgbuild's recommended ownership"
        );
        return Ok(OwnershipMode::Recommended);
    }

    for directive in directives {
        let uid = users::get_user_by_name(&directive.user)
            .map(|user| user.uid())
            .ok_or_else(|| Error::Build(format!("unknown user '{}'", directive.user)))?;
        let gid = users::get_group_by_name(&directive.group)
            .map(|group| group.gid())
            .ok_or_else(|| Error::Build(format!("unknown group '{}'", directive.group)))?;

        let target = root.join(&directive.path);
        log::debug!(
            "chown -R {}:{} {}",
            directive.user,
            directive.group,
            target.display()
        );
        fs::chown_recursive(&target, uid, gid)?;
    }

    Ok(OwnershipMode::Preserve)
}

#[cfg(not(unix))]
fn apply_ownership(_root: &Path, directives: &[OwnershipDirective]) -> Result<OwnershipMode> {
    if !directives.is_empty() {
        log::warn!("Ownership directives are not supported on this platform; skipping");
    }
    Ok(OwnershipMode::Recommended)
}
