use std::process::Command;

fn pkg_release() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pkg-release"))
}

#[test]
fn test_pkg_release_help() {
    let output = pkg_release()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("pkg-release"));
    assert!(stdout.contains("--nuke-release"));
    assert!(stdout.contains("--dry-run"));
}

#[test]
fn test_pkg_release_version() {
    let output = pkg_release()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_package_is_validation_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("pkg-release.toml");
    std::fs::write(
        &config,
        format!(
            "[site]\nsite_top = \"{0}/epics\"\n[git]\nroot = \"{0}/git\"\n[svn]\nroot = \"file://{0}/svn\"\n[cvs]\nroot = \"{0}/cvs\"\n",
            dir.path().display()
        ),
    )
    .unwrap();

    let output = pkg_release()
        .current_dir(dir.path())
        .args(["--batch", "--package", "ioc/xpp/nothing", "--release", "R1.0.0"])
        .arg("--config")
        .arg(&config)
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ioc/xpp/nothing"), "stderr: {}", stderr);
}

#[test]
fn test_bad_config_exits_with_validation_code() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("broken.toml");
    std::fs::write(&config, "[site\n").unwrap();

    let output = pkg_release()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(3));
}
