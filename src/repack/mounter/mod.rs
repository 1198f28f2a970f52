//! Disk image mounting.
//!
//! The workflow only talks to the [`Mounter`] trait. [`HdiutilMounter`] is the
//! macOS implementation built on `hdiutil attach`/`hdiutil detach`.

mod hdiutil;

pub use hdiutil::HdiutilMounter;

use crate::repack::error::Result;
use std::path::{Path, PathBuf};

/// Mounts disk images and releases them again.
///
/// An image is addressed by its own path for both operations.
#[allow(async_fn_in_trait)]
pub trait Mounter {
    /// Mount `image` read-only and return the mount point.
    async fn mount(&mut self, image: &Path) -> Result<PathBuf>;

    /// Release the mount previously created for `image`.
    async fn unmount(&mut self, image: &Path) -> Result<()>;
}
