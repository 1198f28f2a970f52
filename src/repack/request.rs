//! Package build request assembly.
//!
//! A [`PackageBuildRequest`] is the in-memory handoff between the workflow and
//! the [`PackageBuilder`](crate::repack::PackageBuilder). It serializes with the
//! short keys (`pkgroot`, `pkgname`, `id`, `chown`, ...) that flat-package
//! build servers conventionally expect, which is what `--request-json` dumps.

use crate::repack::metadata::BundleMetadata;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Separator between app name and version in derived package names.
pub const PKGNAME_SEPARATOR: &str = "-";

/// Installer package format.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageFormat {
    /// Single-file flat package consumed by the macOS installer.
    Flat,
}

impl fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageFormat::Flat => f.write_str("flat"),
        }
    }
}

/// Ownership applied to a path inside the package payload.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct OwnershipDirective {
    /// Path relative to the package root
    pub path: String,
    /// Owning user name
    pub user: String,
    /// Owning group name
    pub group: String,
}

impl OwnershipDirective {
    /// `Applications` owned by `root:admin`, the layout every app package uses.
    pub fn applications() -> Self {
        Self {
            path: "Applications".to_string(),
            user: "root".to_string(),
            group: "admin".to_string(),
        }
    }
}

/// Everything the package builder needs to produce one flat package.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PackageBuildRequest {
    /// Package format, always [`PackageFormat::Flat`]
    #[serde(rename = "pkgtype")]
    pub package_type: PackageFormat,
    /// Application bundle that becomes the payload
    #[serde(rename = "pkgroot")]
    pub package_root: PathBuf,
    /// Output package name without extension
    #[serde(rename = "pkgname")]
    pub package_name: String,
    /// Package version
    pub version: String,
    /// Package identifier
    #[serde(rename = "id")]
    pub identifier: String,
    /// Installer resources directory (unused, empty)
    pub resources: String,
    /// Builder options (unused, empty)
    pub options: String,
    /// Package info file (unused, empty)
    pub infofile: String,
    /// Ownership to apply inside the payload
    pub chown: Vec<OwnershipDirective>,
}

/// Package name for `metadata`: `override_name` when non-empty, else `name-version`.
pub fn package_name(metadata: &BundleMetadata, override_name: Option<&str>) -> String {
    match override_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!(
            "{}{}{}",
            metadata.name, PKGNAME_SEPARATOR, metadata.version
        ),
    }
}

/// Assemble the request for `bundle`.
///
/// The bundle path is taken as-is; identifier and version are not validated.
pub fn build_request(
    bundle: &Path,
    metadata: &BundleMetadata,
    override_name: Option<&str>,
) -> PackageBuildRequest {
    PackageBuildRequest {
        package_type: PackageFormat::Flat,
        package_root: bundle.to_path_buf(),
        package_name: package_name(metadata, override_name),
        version: metadata.version.clone(),
        identifier: metadata.identifier.clone(),
        resources: String::new(),
        options: String::new(),
        infofile: String::new(),
        chown: vec![OwnershipDirective::applications()],
    }
}
