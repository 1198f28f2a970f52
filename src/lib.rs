//! # app_dmg_pkg
//!
//! Repackages drag-and-drop disk images into flat installer packages.
//!
//! A disk image that carries an application bundle is mounted read-only, the
//! bundle is located and its `Info.plist` read, and a flat package that installs
//! the app into `/Applications` is built. The image is always unmounted again,
//! including when a step fails.
//!
//! ## Features
//!
//! - **Guaranteed cleanup**: every successful mount is released exactly once
//! - **Pluggable collaborators**: mounting and package building are traits
//! - **Structured errors**: each failure is classified by kind and stage
//! - **Inspection**: read an image's app name, identifier and version without packaging
//!
//! ## Usage
//!
//! ```bash
//! app_dmg_pkg pkg --dmg Tool.dmg                       # -> ./Tool-2.1.pkg
//! app_dmg_pkg pkg --dmg Tool.dmg --pkgname CustomPkg   # -> ./CustomPkg.pkg
//! app_dmg_pkg inspect --dmg Tool.dmg
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod cli;
pub mod error;
pub mod repack;

// Re-export main types for public API
pub use cli::Args;
pub use error::{AppError, CliError, Result};
pub use repack::{
    HdiutilMounter, InspectedApp, PackageBuildRequest, PkgbuildBuilder, Workflow, WorkflowConfig,
};
