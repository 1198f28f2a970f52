#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use predicates::prelude::*;

    fn app_dmg_pkg() -> Command {
        Command::cargo_bin("app_dmg_pkg").unwrap()
    }

    #[test]
    fn test_help_lists_commands() {
        app_dmg_pkg()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("pkg"))
            .stdout(predicate::str::contains("inspect"));
    }

    #[test]
    fn test_pkg_requires_dmg() {
        app_dmg_pkg()
            .arg("pkg")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--dmg"));
    }

    #[test]
    fn test_missing_image_exits_with_one() {
        app_dmg_pkg()
            .args(["pkg", "--dmg", "/nonexistent/Tool.dmg"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("does not exist"));
    }

    #[test]
    fn test_empty_pkgname_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let dmg = dir.path().join("Tool.dmg");
        std::fs::write(&dmg, b"").unwrap();

        app_dmg_pkg()
            .arg("pkg")
            .arg("--dmg")
            .arg(&dmg)
            .args(["--pkgname", ""])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("--pkgname must not be empty"))
            .stdout(predicate::str::contains("Run with --help"));
    }

    #[test]
    fn test_empty_dmg_is_rejected() {
        app_dmg_pkg()
            .args(["pkg", "--dmg", ""])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--dmg"));
    }

    #[test]
    fn test_inspect_missing_image_exits_with_one() {
        app_dmg_pkg()
            .args(["inspect", "--dmg", "/nonexistent/Tool.dmg"])
            .assert()
            .code(1);
    }
}
