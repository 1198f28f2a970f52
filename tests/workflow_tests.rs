#[cfg(test)]
mod tests {
    use app_dmg_pkg::repack::{
        self, ErrorKind, ManifestReader, Mounter, PackageBuildRequest, PackageBuilder, Stage,
        Workflow, WorkflowConfig, WorkflowState,
    };
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Mount(PathBuf),
        Unmount(PathBuf),
        Build(String),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    /// Mounter that "mounts" every image at a fixed scratch directory.
    #[derive(Debug)]
    struct FakeMounter {
        volume: PathBuf,
        log: Log,
        mounted: Option<PathBuf>,
        fail_mount: bool,
        fail_unmount: bool,
    }

    impl FakeMounter {
        fn new(volume: &Path, log: &Log) -> Self {
            Self {
                volume: volume.to_path_buf(),
                log: log.clone(),
                mounted: None,
                fail_mount: false,
                fail_unmount: false,
            }
        }
    }

    impl Mounter for FakeMounter {
        async fn mount(&mut self, image: &Path) -> repack::Result<PathBuf> {
            if self.fail_mount {
                return Err(repack::Error::GenericError("attach failed".into()));
            }
            assert!(self.mounted.is_none(), "image mounted twice");
            self.log.borrow_mut().push(Event::Mount(image.to_path_buf()));
            self.mounted = Some(image.to_path_buf());
            Ok(self.volume.clone())
        }

        async fn unmount(&mut self, image: &Path) -> repack::Result<()> {
            assert_eq!(self.mounted.as_deref(), Some(image), "unmount without mount");
            self.log
                .borrow_mut()
                .push(Event::Unmount(image.to_path_buf()));
            self.mounted = None;
            if self.fail_unmount {
                return Err(repack::Error::Unmount {
                    image: image.to_path_buf(),
                    reason: "resource busy".into(),
                });
            }
            Ok(())
        }
    }

    enum Behavior {
        Succeed,
        Fail,
        Panic,
    }

    /// Builder that records requests instead of running pkgbuild.
    struct FakeBuilder {
        log: Log,
        requests: Vec<PackageBuildRequest>,
        behavior: Behavior,
    }

    impl FakeBuilder {
        fn new(log: &Log) -> Self {
            Self {
                log: log.clone(),
                requests: Vec::new(),
                behavior: Behavior::Succeed,
            }
        }
    }

    impl PackageBuilder for FakeBuilder {
        async fn build(&mut self, request: PackageBuildRequest) -> repack::Result<PathBuf> {
            self.log
                .borrow_mut()
                .push(Event::Build(request.package_name.clone()));
            let path = PathBuf::from(format!("/out/{}.pkg", request.package_name));
            self.requests.push(request);
            match self.behavior {
                Behavior::Succeed => Ok(path),
                Behavior::Fail => Err(repack::Error::GenericError("pkgbuild exited 1".into())),
                Behavior::Panic => panic!("builder exploded"),
            }
        }
    }

    fn info_plist(version: Option<&str>, identifier: Option<&str>) -> String {
        let mut entries = String::new();
        if let Some(version) = version {
            entries.push_str(&format!(
                "<key>CFBundleShortVersionString</key><string>{version}</string>"
            ));
        }
        if let Some(identifier) = identifier {
            entries.push_str(&format!(
                "<key>CFBundleIdentifier</key><string>{identifier}</string>"
            ));
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0"><dict>{entries}</dict></plist>"#
        )
    }

    fn add_app(volume: &Path, rel: &str, version: Option<&str>, identifier: Option<&str>) {
        let contents = volume.join(rel).join("Contents");
        std::fs::create_dir_all(&contents).unwrap();
        std::fs::write(contents.join("Info.plist"), info_plist(version, identifier)).unwrap();
    }

    fn tool_volume() -> TempDir {
        let volume = tempfile::tempdir().unwrap();
        add_app(volume.path(), "Tool.app", Some("2.1"), Some("com.example.tool"));
        volume
    }

    fn setup(volume: &Path) -> (Log, Workflow<FakeMounter, FakeBuilder>) {
        let log = Log::default();
        let workflow = Workflow::new(FakeMounter::new(volume, &log), FakeBuilder::new(&log));
        (log, workflow)
    }

    fn image() -> PathBuf {
        PathBuf::from("/images/Tool.dmg")
    }

    fn events(log: &Log) -> Vec<Event> {
        log.borrow().clone()
    }

    #[tokio::test]
    async fn test_successful_run() {
        let volume = tool_volume();
        let (log, mut workflow) = setup(volume.path());

        let pkg = workflow.run(&WorkflowConfig::new(image())).await.unwrap();

        assert_eq!(pkg, PathBuf::from("/out/Tool-2.1.pkg"));
        assert_eq!(
            events(&log),
            [
                Event::Mount(image()),
                Event::Build("Tool-2.1".into()),
                Event::Unmount(image()),
            ]
        );
        assert_eq!(workflow.state(), WorkflowState::Unmounted { succeeded: true });

        let request = &workflow.builder().requests[0];
        assert_eq!(request.package_root, volume.path().join("Tool.app"));
        assert_eq!(request.version, "2.1");
        assert_eq!(request.identifier, "com.example.tool");
        assert_eq!(request.package_type.to_string(), "flat");
        assert_eq!(request.resources, "");
        assert_eq!(request.options, "");
        assert_eq!(request.infofile, "");
        assert_eq!(request.chown.len(), 1);
        assert_eq!(request.chown[0].path, "Applications");
        assert_eq!(request.chown[0].user, "root");
        assert_eq!(request.chown[0].group, "admin");
    }

    #[tokio::test]
    async fn test_package_name_override() {
        let volume = tool_volume();
        let (_log, mut workflow) = setup(volume.path());

        let config = WorkflowConfig::new(image()).with_package_name("CustomPkg");
        let pkg = workflow.run(&config).await.unwrap();

        assert_eq!(pkg, PathBuf::from("/out/CustomPkg.pkg"));
        assert_eq!(workflow.builder().requests[0].package_name, "CustomPkg");
    }

    #[tokio::test]
    async fn test_app_path_override_skips_search() {
        let volume = tempfile::tempdir().unwrap();
        add_app(volume.path(), "Other.app", Some("9.9"), Some("com.example.other"));
        add_app(volume.path(), "Nested/Tool.app", Some("2.1"), Some("com.example.tool"));
        let (_log, mut workflow) = setup(volume.path());

        let config = WorkflowConfig::new(image()).with_app_path("Nested/Tool.app");
        workflow.run(&config).await.unwrap();

        let request = &workflow.builder().requests[0];
        assert_eq!(request.package_root, volume.path().join("Nested/Tool.app"));
        assert_eq!(request.package_name, "Tool-2.1");
    }

    #[tokio::test]
    async fn test_empty_app_path_falls_back_to_search() {
        let volume = tool_volume();
        let (_log, mut workflow) = setup(volume.path());

        let config = WorkflowConfig::new(image()).with_app_path("");
        let pkg = workflow.run(&config).await.unwrap();

        assert_eq!(pkg, PathBuf::from("/out/Tool-2.1.pkg"));
        assert_eq!(
            workflow.builder().requests[0].package_root,
            volume.path().join("Tool.app")
        );
    }

    #[tokio::test]
    async fn test_no_app_still_unmounts() {
        let volume = tempfile::tempdir().unwrap();
        std::fs::write(volume.path().join("ReadMe.txt"), b"hello").unwrap();
        let (log, mut workflow) = setup(volume.path());

        let err = workflow.run(&WorkflowConfig::new(image())).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.stage(), Some(Stage::Locate));
        assert!(err.to_string().contains("can't find an application to package"));
        assert_eq!(events(&log), [Event::Mount(image()), Event::Unmount(image())]);
        assert_eq!(workflow.state(), WorkflowState::Unmounted { succeeded: false });
    }

    #[tokio::test]
    async fn test_missing_identifier_never_builds() {
        let volume = tempfile::tempdir().unwrap();
        add_app(volume.path(), "Tool.app", Some("2.1"), None);
        let (log, mut workflow) = setup(volume.path());

        let err = workflow.run(&WorkflowConfig::new(image())).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ManifestMissingKey);
        assert_eq!(err.stage(), Some(Stage::ExtractMetadata));
        assert!(err.to_string().contains("CFBundleIdentifier"));
        assert!(workflow.builder().requests.is_empty());
        assert_eq!(events(&log), [Event::Mount(image()), Event::Unmount(image())]);
    }

    #[tokio::test]
    async fn test_unreadable_manifest() {
        let volume = tempfile::tempdir().unwrap();
        let contents = volume.path().join("Tool.app/Contents");
        std::fs::create_dir_all(&contents).unwrap();
        std::fs::write(contents.join("Info.plist"), b"not a property list").unwrap();
        let (log, mut workflow) = setup(volume.path());

        let err = workflow.run(&WorkflowConfig::new(image())).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ManifestUnreadable);
        assert!(err.to_string().contains("couldn't read"));
        assert_eq!(events(&log).last(), Some(&Event::Unmount(image())));
    }

    #[tokio::test]
    async fn test_mount_failure_does_not_unmount() {
        let volume = tool_volume();
        let (log, mut workflow) = setup(volume.path());
        let mut mounter = FakeMounter::new(volume.path(), &log);
        mounter.fail_mount = true;
        let mut workflow_failing = Workflow::new(mounter, FakeBuilder::new(&log));

        let err = workflow_failing
            .run(&WorkflowConfig::new(image()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MountFailure);
        assert_eq!(err.stage(), None);
        assert!(events(&log).is_empty());
        assert_eq!(
            workflow_failing.state(),
            WorkflowState::Unmounted { succeeded: false }
        );

        // The untouched workflow on the same log still works.
        workflow.run(&WorkflowConfig::new(image())).await.unwrap();
        assert_eq!(events(&log).len(), 3);
    }

    #[tokio::test]
    async fn test_build_failure_still_unmounts() {
        let volume = tool_volume();
        let (log, mut workflow) = setup(volume.path());
        let mut builder = FakeBuilder::new(&log);
        builder.behavior = Behavior::Fail;
        let (mounter, _) = workflow.into_parts();
        workflow = Workflow::new(mounter, builder);

        let err = workflow.run(&WorkflowConfig::new(image())).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BuildFailure);
        assert_eq!(err.stage(), Some(Stage::Package));
        assert!(err.unmount_error().is_none());
        assert_eq!(
            events(&log),
            [
                Event::Mount(image()),
                Event::Build("Tool-2.1".into()),
                Event::Unmount(image()),
            ]
        );
    }

    #[tokio::test]
    async fn test_unmount_failure_after_success() {
        let volume = tool_volume();
        let log = Log::default();
        let mut mounter = FakeMounter::new(volume.path(), &log);
        mounter.fail_unmount = true;
        let mut workflow = Workflow::new(mounter, FakeBuilder::new(&log));

        let err = workflow.run(&WorkflowConfig::new(image())).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnmountFailure);
        assert_eq!(err.stage(), None);
        assert_eq!(workflow.builder().requests.len(), 1);
        assert_eq!(workflow.state(), WorkflowState::Unmounted { succeeded: false });
    }

    #[tokio::test]
    async fn test_unmount_failure_is_attached_to_pending_error() {
        let volume = tool_volume();
        let log = Log::default();
        let mut mounter = FakeMounter::new(volume.path(), &log);
        mounter.fail_unmount = true;
        let mut builder = FakeBuilder::new(&log);
        builder.behavior = Behavior::Fail;
        let mut workflow = Workflow::new(mounter, builder);

        let err = workflow.run(&WorkflowConfig::new(image())).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BuildFailure);
        let unmount = err.unmount_error().unwrap();
        assert_eq!(unmount.kind(), ErrorKind::UnmountFailure);
        assert!(err.to_string().contains("additionally"));
        assert_eq!(events(&log).last(), Some(&Event::Unmount(image())));
    }

    #[tokio::test]
    async fn test_panicking_builder_still_unmounts() {
        let volume = tool_volume();
        let log = Log::default();
        let mut builder = FakeBuilder::new(&log);
        builder.behavior = Behavior::Panic;
        let mut workflow = Workflow::new(FakeMounter::new(volume.path(), &log), builder);

        let err = workflow.run(&WorkflowConfig::new(image())).await.unwrap_err();

        assert!(err.to_string().contains("builder exploded"));
        assert_eq!(err.stage(), Some(Stage::Package));
        assert_eq!(events(&log).last(), Some(&Event::Unmount(image())));
        assert!(workflow.mounter().mounted.is_none());
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let volume = tool_volume();
        let (log, mut workflow) = setup(volume.path());
        let config = WorkflowConfig::new(image());

        let first = workflow.run(&config).await.unwrap();
        let second = workflow.run(&config).await.unwrap();

        assert_eq!(first, second);
        let requests = &workflow.builder().requests;
        assert_eq!(requests[0], requests[1]);

        let mounts = events(&log)
            .iter()
            .filter(|e| matches!(e, Event::Mount(_)))
            .count();
        let unmounts = events(&log)
            .iter()
            .filter(|e| matches!(e, Event::Unmount(_)))
            .count();
        assert_eq!((mounts, unmounts), (2, 2));
    }

    #[tokio::test]
    async fn test_inspect_reports_app_and_unmounts() {
        let volume = tool_volume();
        let log = Log::default();
        let mut workflow = Workflow::for_inspection(FakeMounter::new(volume.path(), &log));

        let app = workflow.inspect(&image()).await.unwrap();

        assert_eq!(app.app_name, "Tool.app");
        assert_eq!(app.metadata.name, "Tool");
        assert_eq!(app.metadata.version, "2.1");
        assert_eq!(app.metadata.identifier, "com.example.tool");
        assert_eq!(events(&log), [Event::Mount(image()), Event::Unmount(image())]);
    }

    struct FixedManifest;

    impl ManifestReader for FixedManifest {
        fn read(&self, _path: &Path) -> repack::Result<plist::Value> {
            let mut dict = plist::Dictionary::new();
            dict.insert("CFBundleShortVersionString".into(), "3.0".into());
            dict.insert("CFBundleIdentifier".into(), "com.example.fixed".into());
            Ok(plist::Value::Dictionary(dict))
        }
    }

    #[tokio::test]
    async fn test_custom_manifest_reader() {
        let volume = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(volume.path().join("Tool.app")).unwrap();
        let (_log, workflow) = setup(volume.path());
        let mut workflow = workflow.with_manifest_reader(FixedManifest);

        let pkg = workflow.run(&WorkflowConfig::new(image())).await.unwrap();

        assert_eq!(pkg, PathBuf::from("/out/Tool-3.0.pkg"));
        assert_eq!(workflow.builder().requests[0].identifier, "com.example.fixed");
    }
}
