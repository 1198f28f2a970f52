//! Mount → locate → extract → request → build → unmount orchestration.
//!
//! Every step after a successful mount runs inside [`mounted`], which always
//! releases the image before returning: on success, on error, and when a step
//! panics. Errors raised inside that region are wrapped once into
//! [`Error::Workflow`], tagged with the stage that failed.

use crate::repack::{
    builder::PackageBuilder,
    error::{Error, Result, Stage},
    locator::find_app_bundle,
    metadata::{BundleMetadata, ManifestReader, PlistManifestReader, extract_metadata},
    mounter::Mounter,
    request::build_request,
};
use futures_lite::FutureExt;
use std::any::Any;
use std::cell::Cell;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

/// Progress of a single workflow run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum WorkflowState {
    /// Nothing has happened yet.
    Idle,
    /// The disk image is mounted.
    Mounted,
    /// The application bundle was found.
    Located,
    /// Bundle metadata was read.
    Extracted,
    /// The package build request exists.
    RequestBuilt,
    /// The package builder finished.
    Packaged,
    /// Terminal state; also reached when mounting fails.
    Unmounted {
        /// Whether the run as a whole succeeded
        succeeded: bool,
    },
}

/// Inputs of a packaging run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Disk image to mount and search
    pub image: PathBuf,
    /// Bundle path relative to the mount point; skips the search when set
    pub app_path: Option<PathBuf>,
    /// Package name to use instead of `name-version`
    pub package_name: Option<String>,
}

impl WorkflowConfig {
    /// Configuration for `image` with no overrides.
    pub fn new(image: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    /// Use `app_path` (relative to the mount point) instead of searching.
    pub fn with_app_path(mut self, app_path: impl Into<PathBuf>) -> Self {
        self.app_path = Some(app_path.into());
        self
    }

    /// Name the package `package_name` instead of `name-version`.
    pub fn with_package_name(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = Some(package_name.into());
        self
    }
}

/// Application found on a disk image by [`Workflow::inspect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectedApp {
    /// Bundle file name, including the `.app` extension
    pub app_name: String,
    /// Metadata read from the bundle
    pub metadata: BundleMetadata,
}

/// Repackages the application on a disk image into a flat package.
///
/// The mounter and builder are injected so each can be replaced independently;
/// the manifest reader defaults to [`PlistManifestReader`].
///
/// # Examples
///
/// ```no_run
/// use app_dmg_pkg::repack::{HdiutilMounter, PkgbuildBuilder, Workflow, WorkflowConfig};
///
/// # async fn example() -> app_dmg_pkg::repack::Result<()> {
/// let mut workflow = Workflow::new(HdiutilMounter::new(), PkgbuildBuilder::new("/tmp/pkgs"));
/// let pkg = workflow.run(&WorkflowConfig::new("/tmp/Tool.dmg")).await?;
/// println!("Created {}", pkg.display());
/// # Ok(())
/// # }
/// ```
pub struct Workflow<M, B> {
    mounter: M,
    builder: B,
    reader: Box<dyn ManifestReader>,
    state: Cell<WorkflowState>,
}

impl<M: std::fmt::Debug, B: std::fmt::Debug> std::fmt::Debug for Workflow<M, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("mounter", &self.mounter)
            .field("builder", &self.builder)
            .field("reader", &"<ManifestReader>")
            .field("state", &self.state.get())
            .finish()
    }
}

impl<M> Workflow<M, ()> {
    /// A workflow that can only [`inspect`](Self::inspect) images.
    pub fn for_inspection(mounter: M) -> Self {
        Workflow::new(mounter, ())
    }
}

impl<M, B> Workflow<M, B> {
    /// Creates a workflow from its collaborators.
    pub fn new(mounter: M, builder: B) -> Self {
        Self {
            mounter,
            builder,
            reader: Box::new(PlistManifestReader),
            state: Cell::new(WorkflowState::Idle),
        }
    }

    /// Replaces the manifest reader.
    pub fn with_manifest_reader(mut self, reader: impl ManifestReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    /// Last state reached by the most recent run.
    pub fn state(&self) -> WorkflowState {
        self.state.get()
    }

    /// The injected mounter.
    pub fn mounter(&self) -> &M {
        &self.mounter
    }

    /// The injected package builder.
    pub fn builder(&self) -> &B {
        &self.builder
    }

    /// Consumes the workflow, returning its collaborators.
    pub fn into_parts(self) -> (M, B) {
        (self.mounter, self.builder)
    }
}

impl<M: Mounter, B> Workflow<M, B> {
    /// Mount `image`, find the first application on it, read its metadata, and
    /// unmount again.
    pub async fn inspect(&mut self, image: &Path) -> Result<InspectedApp> {
        self.state.set(WorkflowState::Idle);
        let reader = self.reader.as_ref();
        let state = &self.state;

        mounted(&mut self.mounter, image, state, move |mount_point| async move {
            let bundle = find_app_bundle(&mount_point, None, image).await?;
            advance(state, WorkflowState::Located);

            let metadata = extract_metadata(&bundle, reader)?;
            advance(state, WorkflowState::Extracted);

            let app_name = bundle
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| Error::InvalidBundlePath(bundle.clone()))?;

            Ok::<_, Error>(InspectedApp { app_name, metadata })
        })
        .await
    }
}

impl<M: Mounter, B: PackageBuilder> Workflow<M, B> {
    /// Run the packaging workflow and return the path of the created package.
    ///
    /// The image is unmounted exactly once for every successful mount, whatever
    /// happens in between.
    pub async fn run(&mut self, config: &WorkflowConfig) -> Result<PathBuf> {
        self.state.set(WorkflowState::Idle);
        let reader = self.reader.as_ref();
        let builder = &mut self.builder;
        let state = &self.state;

        log::info!("Repackaging {}", config.image.display());

        mounted(
            &mut self.mounter,
            &config.image,
            state,
            move |mount_point| async move {
                let bundle =
                    find_app_bundle(&mount_point, config.app_path.as_deref(), &config.image)
                        .await?;
                advance(state, WorkflowState::Located);

                let metadata = extract_metadata(&bundle, reader)?;
                advance(state, WorkflowState::Extracted);

                let request = build_request(&bundle, &metadata, config.package_name.as_deref());
                advance(state, WorkflowState::RequestBuilt);
                log::debug!("Package request: {request:?}");

                let package = builder
                    .build(request)
                    .await
                    .map_err(Error::into_build_failure)?;
                advance(state, WorkflowState::Packaged);

                Ok::<_, Error>(package)
            },
        )
        .await
    }
}

fn advance(state: &Cell<WorkflowState>, next: WorkflowState) {
    log::debug!("workflow: {:?} -> {:?}", state.get(), next);
    state.set(next);
}

/// Stage that was running when a failure interrupted a run at `state`.
fn failing_stage(state: WorkflowState) -> Stage {
    match state {
        WorkflowState::Idle | WorkflowState::Mounted => Stage::Locate,
        WorkflowState::Located => Stage::ExtractMetadata,
        _ => Stage::Package,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Mounts `image`, runs `body` with the mount point, and always unmounts.
///
/// A mount failure returns immediately, with nothing to release, and leaves the
/// run in its terminal failure state. Anything `body` returns or raises
/// (including a panic) is held until the unmount has been attempted; an
/// unmount failure is attached to a pending error rather than replacing it.
async fn mounted<M, T, F, Fut>(
    mounter: &mut M,
    image: &Path,
    state: &Cell<WorkflowState>,
    body: F,
) -> Result<T>
where
    M: Mounter,
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mount_point = match mounter.mount(image).await {
        Ok(mount_point) => mount_point,
        Err(e) => {
            advance(state, WorkflowState::Unmounted { succeeded: false });
            return Err(e.into_mount_failure(image));
        }
    };
    advance(state, WorkflowState::Mounted);
    log::debug!("{} mounted at {}", image.display(), mount_point.display());

    let outcome = match AssertUnwindSafe(body(mount_point)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Error::Panicked(panic_message(payload.as_ref()))),
    }
    .map_err(|source| Error::Workflow {
        stage: failing_stage(state.get()),
        source: Box::new(source),
        unmount_error: None,
    });

    let released = mounter
        .unmount(image)
        .await
        .map_err(|e| e.into_unmount_failure(image));

    advance(
        state,
        WorkflowState::Unmounted {
            succeeded: outcome.is_ok() && released.is_ok(),
        },
    );

    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(unmount_err)) => Err(unmount_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(unmount_err)) => {
            log::error!("{unmount_err}");
            Err(match err {
                Error::Workflow { stage, source, .. } => Error::Workflow {
                    stage,
                    source,
                    unmount_error: Some(Box::new(unmount_err)),
                },
                other => other,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failing_stage_follows_last_state() {
        assert_eq!(failing_stage(WorkflowState::Mounted), Stage::Locate);
        assert_eq!(failing_stage(WorkflowState::Located), Stage::ExtractMetadata);
        assert_eq!(failing_stage(WorkflowState::RequestBuilt), Stage::Package);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(panic_message(payload.as_ref()), "kaboom");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }

    #[test]
    fn test_config_builders() {
        let config = WorkflowConfig::new("/tmp/Tool.dmg")
            .with_app_path("Tool.app")
            .with_package_name("CustomPkg");
        assert_eq!(config.image, PathBuf::from("/tmp/Tool.dmg"));
        assert_eq!(config.app_path, Some(PathBuf::from("Tool.app")));
        assert_eq!(config.package_name.as_deref(), Some("CustomPkg"));
    }
}
