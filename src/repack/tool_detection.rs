//! External tool availability checking.
//!
//! `hdiutil` and `pkgbuild` ship with macOS. They are looked up on `PATH` once
//! and fall back to their standard system locations.

use crate::repack::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Location of `hdiutil`, if available.
pub static HDIUTIL: LazyLock<Option<PathBuf>> =
    LazyLock::new(|| locate("hdiutil", "/usr/bin/hdiutil"));

/// Location of `pkgbuild`, if available.
pub static PKGBUILD: LazyLock<Option<PathBuf>> =
    LazyLock::new(|| locate("pkgbuild", "/usr/bin/pkgbuild"));

fn locate(tool: &str, system_path: &str) -> Option<PathBuf> {
    match which::which(tool) {
        Ok(path) => {
            log::debug!("Found {} at: {}", tool, path.display());
            Some(path)
        }
        Err(e) => {
            let fallback = Path::new(system_path);
            if fallback.is_file() {
                log::debug!("{} not in PATH ({}), using {}", tool, e, system_path);
                Some(fallback.to_path_buf())
            } else {
                log::debug!("{} not found: {}", tool, e);
                None
            }
        }
    }
}

/// Returns the tool path or an error naming the missing tool.
pub fn require(tool: &str, location: &Option<PathBuf>) -> Result<PathBuf> {
    location.clone().ok_or_else(|| {
        Error::GenericError(format!(
            "{tool} not found; it is part of macOS and required for this operation"
        ))
    })
}
