//! Application metadata extraction from a bundle's Info.plist.

use crate::repack::error::{Error, Result};
use plist::Value;
use std::path::{Path, PathBuf};

/// Manifest location relative to the bundle root.
pub const INFO_PLIST: &str = "Contents/Info.plist";

/// Manifest key holding the user-facing short version.
pub const VERSION_KEY: &str = "CFBundleShortVersionString";

/// Manifest key holding the reverse-DNS bundle identifier.
pub const IDENTIFIER_KEY: &str = "CFBundleIdentifier";

/// Reads a structured property-list document from disk.
pub trait ManifestReader: Send + Sync {
    /// Read and parse the document at `path`.
    fn read(&self, path: &Path) -> Result<Value>;
}

/// [`ManifestReader`] backed by the `plist` crate (XML, binary, and ASCII plists).
#[derive(Debug, Clone, Copy, Default)]
pub struct PlistManifestReader;

impl ManifestReader for PlistManifestReader {
    fn read(&self, path: &Path) -> Result<Value> {
        Ok(Value::from_file(path)?)
    }
}

/// Identity of an application bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleMetadata {
    /// Bundle file name without its extension (e.g., `Tool` for `Tool.app`)
    pub name: String,
    /// Short version string from the manifest
    pub version: String,
    /// Bundle identifier from the manifest
    pub identifier: String,
}

/// Path of the manifest inside `bundle`.
pub fn info_plist_path(bundle: &Path) -> PathBuf {
    bundle.join(INFO_PLIST)
}

/// Extract [`BundleMetadata`] from the bundle at `bundle`.
///
/// The name comes from the bundle's file name, never from the manifest.
pub fn extract_metadata(bundle: &Path, reader: &dyn ManifestReader) -> Result<BundleMetadata> {
    let manifest_path = info_plist_path(bundle);

    let document = reader
        .read(&manifest_path)
        .map_err(|e| Error::ManifestUnreadable {
            path: manifest_path.clone(),
            reason: e.to_string(),
        })?;

    let Some(info) = document.as_dictionary() else {
        return Err(Error::ManifestUnreadable {
            path: manifest_path,
            reason: "root object is not a dictionary".to_string(),
        });
    };

    let name = bundle
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| Error::InvalidBundlePath(bundle.to_path_buf()))?;

    let version = required_string(info, VERSION_KEY, &manifest_path)?;
    let identifier = required_string(info, IDENTIFIER_KEY, &manifest_path)?;

    log::debug!("{name}: version {version}, identifier {identifier}");

    Ok(BundleMetadata {
        name,
        version,
        identifier,
    })
}

fn required_string(info: &plist::Dictionary, key: &str, manifest_path: &Path) -> Result<String> {
    let missing = |detail: String| Error::ManifestMissingKey {
        path: manifest_path.to_path_buf(),
        detail,
    };

    match info.get(key) {
        None => Err(missing(format!("'{key}' is not present"))),
        Some(value) => match value.as_string() {
            Some("") => Err(missing(format!("'{key}' is empty"))),
            Some(s) => Ok(s.to_string()),
            None => Err(missing(format!("'{key}' is not a string"))),
        },
    }
}
