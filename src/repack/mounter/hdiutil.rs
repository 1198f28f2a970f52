//! `hdiutil`-backed disk image mounter.

use super::Mounter;
use crate::repack::{
    error::{Error, Result},
    tool_detection::{self, HDIUTIL},
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;

const PLIST_HEADER: &str = "<?xml version";
const PLIST_FOOTER: &str = "</plist>";

/// Mounts disk images with `hdiutil`, tracking which images it has attached.
///
/// Images are attached with `-nobrowse` under a random mount point in
/// `/private/tmp`. Images that carry a Software License Agreement are accepted
/// automatically so the attach never waits on a prompt.
#[derive(Debug, Default)]
pub struct HdiutilMounter {
    mounts: HashMap<PathBuf, PathBuf>,
}

impl HdiutilMounter {
    /// Creates a mounter with no active mounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `image` carries a Software License Agreement.
    ///
    /// Probe failures count as "no agreement"; attach reports the real error.
    async fn has_license_agreement(&self, hdiutil: &Path, image: &Path) -> bool {
        let output = match tokio::process::Command::new(hdiutil)
            .arg("imageinfo")
            .arg(image)
            .arg("-plist")
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                log::warn!("hdiutil imageinfo failed for {}: {}", image.display(), e);
                return false;
            }
        };

        if !output.stderr.is_empty() {
            log::warn!(
                "hdiutil error {} with image {}",
                String::from_utf8_lossy(&output.stderr).trim(),
                image.display()
            );
        }

        license_agreement_from_imageinfo(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Mounter for HdiutilMounter {
    async fn mount(&mut self, image: &Path) -> Result<PathBuf> {
        let mount_failed = |reason: String| Error::Mount {
            image: image.to_path_buf(),
            reason,
        };

        if self.mounts.contains_key(image) {
            return Err(mount_failed("already mounted".to_string()));
        }

        let hdiutil = tool_detection::require("hdiutil", &HDIUTIL)
            .map_err(|e| mount_failed(e.to_string()))?;

        let accept_license = self.has_license_agreement(&hdiutil, image).await;
        if accept_license {
            log::debug!("{} has a license agreement, accepting it", image.display());
        }

        let mut child = tokio::process::Command::new(&hdiutil)
            .args(["attach", "-plist", "-mountrandom", "/private/tmp", "-nobrowse"])
            .arg(image)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| Error::CommandFailed {
                command: "hdiutil attach".to_string(),
                error,
            })
            .map_err(|e| mount_failed(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            if accept_license {
                stdin
                    .write_all(b"Y\n")
                    .await
                    .map_err(|e| mount_failed(format!("answering license prompt: {e}")))?;
            }
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| mount_failed(format!("hdiutil execution failed: {e}")))?;

        if !output.status.success() {
            return Err(mount_failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let mount_point = mount_point_from_attach(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| mount_failed("unexpected output from hdiutil".to_string()))?;

        log::info!("Mounted disk image {}", image.display());
        self.mounts.insert(image.to_path_buf(), mount_point.clone());
        Ok(mount_point)
    }

    async fn unmount(&mut self, image: &Path) -> Result<()> {
        let unmount_failed = |reason: String| Error::Unmount {
            image: image.to_path_buf(),
            reason,
        };

        let Some(mount_point) = self.mounts.get(image).cloned() else {
            return Err(unmount_failed("not mounted".to_string()));
        };

        let hdiutil = tool_detection::require("hdiutil", &HDIUTIL)
            .map_err(|e| unmount_failed(e.to_string()))?;

        let output = tokio::process::Command::new(&hdiutil)
            .arg("detach")
            .arg(&mount_point)
            .output()
            .await
            .map_err(|e| unmount_failed(format!("hdiutil execution failed: {e}")))?;

        if !output.status.success() {
            return Err(unmount_failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        self.mounts.remove(image);
        log::info!("✓ Unmounted {}", mount_point.display());
        Ok(())
    }
}

/// Splits off the first XML plist embedded in `text`.
///
/// Returns the plist (if a complete one is present) and the text following it.
/// Without a complete plist the whole input is returned as the remainder.
pub(crate) fn first_plist(text: &str) -> (Option<&str>, &str) {
    let Some(start) = text.find(PLIST_HEADER) else {
        return (None, text);
    };
    let Some(footer) = text[start + PLIST_HEADER.len()..].find(PLIST_FOOTER) else {
        return (None, text);
    };
    let end = start + PLIST_HEADER.len() + footer + PLIST_FOOTER.len();
    (Some(&text[start..end]), &text[end..])
}

/// First `mount-point` listed under `system-entities` in `hdiutil attach -plist` output.
pub(crate) fn mount_point_from_attach(stdout: &str) -> Option<PathBuf> {
    let (plist_text, _) = first_plist(stdout);
    let value = plist::Value::from_reader_xml(plist_text?.as_bytes()).ok()?;

    value
        .as_dictionary()?
        .get("system-entities")?
        .as_array()?
        .iter()
        .filter_map(|entity| entity.as_dictionary()?.get("mount-point")?.as_string())
        .map(PathBuf::from)
        .next()
}

/// `Properties["Software License Agreement"]` from `hdiutil imageinfo -plist` output.
pub(crate) fn license_agreement_from_imageinfo(stdout: &str) -> bool {
    let (Some(plist_text), _) = first_plist(stdout) else {
        return false;
    };
    plist::Value::from_reader_xml(plist_text.as_bytes())
        .ok()
        .and_then(|value| {
            value
                .as_dictionary()?
                .get("Properties")?
                .as_dictionary()?
                .get("Software License Agreement")?
                .as_boolean()
        })
        .unwrap_or(false)
}
