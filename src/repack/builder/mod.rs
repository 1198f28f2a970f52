//! Flat package building.
//!
//! The workflow hands a finished [`PackageBuildRequest`] to a [`PackageBuilder`]
//! and gets back the path of the artifact. [`PkgbuildBuilder`] is the macOS
//! implementation built on `pkgbuild`.

mod pkgbuild;

pub use pkgbuild::PkgbuildBuilder;

use crate::repack::{error::Result, request::PackageBuildRequest};
use std::path::PathBuf;

/// Produces an installer package from a [`PackageBuildRequest`].
#[allow(async_fn_in_trait)]
pub trait PackageBuilder {
    /// Build the package described by `request` and return its path.
    async fn build(&mut self, request: PackageBuildRequest) -> Result<PathBuf>;
}
