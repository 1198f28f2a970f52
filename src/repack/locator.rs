//! Application bundle discovery on a mounted volume.

use crate::repack::error::{Error, ErrorExt, Result};
use std::path::{Path, PathBuf};

/// File name suffix identifying an application bundle.
pub const APP_BUNDLE_SUFFIX: &str = ".app";

/// Find the application bundle to package.
///
/// An explicit `app_path` is joined onto `mount_point` and used without
/// searching (an absolute `app_path` replaces the mount point entirely). An
/// empty `app_path` counts as absent.
/// Otherwise the first direct child of `mount_point` whose name ends in
/// `.app` is returned, in the order the filesystem lists them.
///
/// `image` only names the disk image in the [`Error::NotFound`] message.
pub async fn find_app_bundle(
    mount_point: &Path,
    app_path: Option<&Path>,
    image: &Path,
) -> Result<PathBuf> {
    if let Some(relative) = app_path.filter(|p| !p.as_os_str().is_empty()) {
        let resolved = mount_point.join(relative);
        log::debug!("Using supplied app path: {}", resolved.display());
        return Ok(resolved);
    }

    let mut entries = tokio::fs::read_dir(mount_point)
        .await
        .fs_context("reading mounted volume", mount_point)?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .fs_context("reading mounted volume", mount_point)?
    {
        if entry
            .file_name()
            .to_string_lossy()
            .ends_with(APP_BUNDLE_SUFFIX)
        {
            let found = entry.path();
            log::debug!("Found application bundle: {}", found.display());
            return Ok(found);
        }
    }

    Err(Error::NotFound {
        image: image.to_path_buf(),
    })
}
