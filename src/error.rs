//! Error types for app_dmg_pkg command line operations.
//!
//! This module wraps workflow errors for the CLI and adds actionable recovery
//! suggestions.

use crate::repack::{self, ErrorKind};
use thiserror::Error;

/// Result type alias for app_dmg_pkg operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Main error type for app_dmg_pkg operations
#[derive(Error, Debug)]
pub enum AppError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// Repackaging workflow errors
    #[error("{0}")]
    Repack(#[from] repack::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl AppError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        let err = match self {
            AppError::Repack(err) => err,
            AppError::Cli(_) => {
                return vec!["Run with --help to see the expected arguments".to_string()];
            }
            AppError::Io(_) => {
                return vec!["Check the error message above for specific details".to_string()];
            }
        };

        let mut suggestions = match err.kind() {
            ErrorKind::MountFailure => vec![
                "Verify the disk image opens: hdiutil imageinfo <image>".to_string(),
                "Make sure the image is not already attached: hdiutil info".to_string(),
            ],
            ErrorKind::NotFound => vec![
                "List the volume contents to find the bundle: hdiutil attach <image>".to_string(),
                "Pass the bundle location explicitly with --app-path".to_string(),
            ],
            ErrorKind::ManifestUnreadable => vec![
                "Check that Contents/Info.plist is a valid property list: plutil -lint"
                    .to_string(),
            ],
            ErrorKind::ManifestMissingKey => vec![
                "The bundle must declare CFBundleShortVersionString and CFBundleIdentifier"
                    .to_string(),
            ],
            ErrorKind::BuildFailure => vec![
                "Confirm pkgbuild is available: xcrun --find pkgbuild".to_string(),
                "Check that the output directory is writable".to_string(),
            ],
            ErrorKind::UnmountFailure => vec![
                "Detach the volume manually: hdiutil detach <mount point>".to_string(),
            ],
            ErrorKind::Other => {
                vec!["Check the error message above for specific details".to_string()]
            }
        };

        if err.kind() != ErrorKind::UnmountFailure && err.unmount_error().is_some() {
            suggestions.push(
                "The volume may still be attached; detach it with: hdiutil detach <mount point>"
                    .to_string(),
            );
        }

        suggestions
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Repack(err) => !matches!(
                err.kind(),
                ErrorKind::NotFound | ErrorKind::ManifestUnreadable | ErrorKind::ManifestMissingKey
            ),
            AppError::Cli(CliError::InvalidArguments { .. }) => false,
            AppError::Io(_) => true,
        }
    }
}
