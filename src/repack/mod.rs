//! Drag-and-drop disk image to flat package repackaging.
//!
//! This module turns a disk image that carries an application bundle into a
//! flat installer package that installs the app into `/Applications`.
//!
//! # Pipeline
//!
//! | Step | Module | Notes |
//! |------|--------|-------|
//! | Mount | [`mounter`] | `hdiutil attach`, read-only, no Finder window |
//! | Locate | [`locator`] | first `.app` at the volume root, or an explicit path |
//! | Extract | [`metadata`] | `Contents/Info.plist` version and identifier |
//! | Request | [`request`] | pure assembly of the [`PackageBuildRequest`] |
//! | Build | [`builder`] | `pkgbuild` flat package |
//! | Unmount | [`mounter`] | always, including after failures |
//!
//! The [`Workflow`] drives these steps. The mounter and package builder are
//! traits, so either can be swapped without touching the workflow.

#![warn(missing_docs)]

pub mod builder;
mod error;
pub mod locator;
pub mod metadata;
pub mod mounter;
pub mod request;
mod tool_detection;
mod utils;
mod workflow;

// Public re-exports
pub use builder::{PackageBuilder, PkgbuildBuilder};
pub use error::{Context, Error, ErrorExt, ErrorKind, Result, Stage};
pub use metadata::{BundleMetadata, ManifestReader, PlistManifestReader};
pub use mounter::{HdiutilMounter, Mounter};
pub use request::{OwnershipDirective, PackageBuildRequest, PackageFormat};
pub use workflow::{InspectedApp, Workflow, WorkflowConfig, WorkflowState};
