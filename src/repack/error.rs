//! Error types for repackaging operations.
//!
//! Provides the workflow error taxonomy together with contextual error chaining,
//! filesystem-specific errors, and a `bail!` macro.
//!
//! # Features
//!
//! - **Error kinds**: every error maps to an [`ErrorKind`] so callers can tell
//!   which step failed without matching on message text
//! - **Context trait**: Add context to errors similar to anyhow
//! - **ErrorExt trait**: Filesystem operations with automatic path context
//! - **bail! macro**: Early return with formatted error messages

use std::{
    fmt::{self, Display},
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Stage of the packaging workflow in which an error was raised.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    /// Searching the mounted volume for the application bundle.
    Locate,
    /// Reading the bundle manifest.
    ExtractMetadata,
    /// Running the package builder.
    Package,
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Locate => "locating application bundle",
            Stage::ExtractMetadata => "reading application metadata",
            Stage::Package => "building package",
        };
        f.write_str(name)
    }
}

/// Coarse classification of an [`Error`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// The disk image could not be mounted.
    MountFailure,
    /// No application bundle on the mounted volume.
    NotFound,
    /// The bundle manifest could not be read or is not a dictionary.
    ManifestUnreadable,
    /// A required manifest key is absent, empty, or not a string.
    ManifestMissingKey,
    /// The package builder failed.
    BuildFailure,
    /// Releasing the mount failed.
    UnmountFailure,
    /// Infrastructure failures (I/O, invalid paths, panics).
    Other,
}

/// Errors returned by the repackaging workflow and its collaborators.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// Failure inside the mounted region, wrapped once at the workflow boundary.
    ///
    /// `unmount_error` is set when releasing the volume failed as well.
    #[error("{stage} failed: {source}{}", unmount_suffix(.unmount_error))]
    Workflow {
        /// Step that failed
        stage: Stage,
        /// The original error
        source: Box<Self>,
        /// Cleanup error raised while this one was pending
        unmount_error: Option<Box<Self>>,
    },

    /// The disk image could not be mounted.
    #[error("mounting {image} failed: {reason}")]
    Mount {
        /// Image that was being mounted
        image: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// No application bundle was found on the mounted volume.
    #[error("can't find an application to package on {image}")]
    NotFound {
        /// Image that was searched
        image: PathBuf,
    },

    /// The manifest could not be read, parsed, or is not a dictionary.
    #[error("couldn't read {path}: {reason}")]
    ManifestUnreadable {
        /// Manifest path
        path: PathBuf,
        /// Underlying parse or I/O error text
        reason: String,
    },

    /// A required manifest key is missing or unusable.
    #[error("missing key in {path}: {detail}")]
    ManifestMissingKey {
        /// Manifest path
        path: PathBuf,
        /// Which key and why
        detail: String,
    },

    /// The bundle path has no file name to derive the app name from.
    #[error("invalid application bundle path {}", .0.display())]
    InvalidBundlePath(PathBuf),

    /// The package builder failed.
    #[error("package build failed: {0}")]
    Build(String),

    /// Releasing the mount failed.
    #[error("unmounting {image} failed: {reason}")]
    Unmount {
        /// Image whose mount was being released
        image: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// A workflow step panicked.
    #[error("step panicked: {0}")]
    Panicked(String),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "reading directory")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// Child process execution error.
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Command that failed to execute
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Error walking a directory tree.
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// Property list parsing error.
    #[error("{0}")]
    Plist(#[from] plist::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

fn unmount_suffix(unmount_error: &Option<Box<Error>>) -> String {
    match unmount_error {
        Some(err) => format!(" (additionally, {err})"),
        None => String::new(),
    }
}

impl Error {
    /// Returns the kind of the original failure, looking through wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Context(_, inner) => inner.kind(),
            Error::Workflow { source, .. } => source.kind(),
            Error::Mount { .. } => ErrorKind::MountFailure,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::ManifestUnreadable { .. } => ErrorKind::ManifestUnreadable,
            Error::ManifestMissingKey { .. } => ErrorKind::ManifestMissingKey,
            Error::Build(_) => ErrorKind::BuildFailure,
            Error::Unmount { .. } => ErrorKind::UnmountFailure,
            _ => ErrorKind::Other,
        }
    }

    /// Stage that failed, for errors raised inside the mounted region.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Workflow { stage, .. } => Some(*stage),
            Error::Context(_, inner) => inner.stage(),
            _ => None,
        }
    }

    /// Cleanup error recorded alongside a pending workflow failure.
    pub fn unmount_error(&self) -> Option<&Error> {
        match self {
            Error::Workflow { unmount_error, .. } => unmount_error.as_deref(),
            Error::Context(_, inner) => inner.unmount_error(),
            _ => None,
        }
    }

    /// Reclassifies a mounter error as [`Error::Mount`] unless it already is one.
    pub(crate) fn into_mount_failure(self, image: &std::path::Path) -> Self {
        match self.kind() {
            ErrorKind::MountFailure => self,
            _ => Error::Mount {
                image: image.to_path_buf(),
                reason: self.to_string(),
            },
        }
    }

    /// Reclassifies a mounter error as [`Error::Unmount`] unless it already is one.
    pub(crate) fn into_unmount_failure(self, image: &std::path::Path) -> Self {
        match self.kind() {
            ErrorKind::UnmountFailure => self,
            _ => Error::Unmount {
                image: image.to_path_buf(),
                reason: self.to_string(),
            },
        }
    }

    /// Reclassifies a builder error as [`Error::Build`] unless it already is one.
    pub(crate) fn into_build_failure(self) -> Self {
        match self.kind() {
            ErrorKind::BuildFailure => self,
            _ => Error::Build(self.to_string()),
        }
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with the repackaging Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading directory", "copying bundle".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// # Examples
///
/// ```ignore
/// bail!("operation failed");
/// bail!("{path:?} does not exist");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::repack::Error::GenericError(format!($msg)))
    };
    ($err:expr $(,)?) => {
        return Err($crate::repack::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::repack::Error::GenericError(format!($fmt, $($arg)*)))
    };
}
