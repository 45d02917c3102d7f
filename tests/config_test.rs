// tests/config_test.rs
use pkg_release::config::{load_config, SiteConfig};
use pkg_release::domain::PipelineOutcome;
use pkg_release::ReleaseError;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[test]
fn test_default_site_config() {
    let config = SiteConfig::default();
    assert_eq!(config.site.site_top, PathBuf::from("/reg/g/pcds/epics"));
    assert_eq!(config.site.module_base_version, "R3.14.12-0.4.0");
    assert_eq!(config.site.install_group.as_deref(), Some("ps-pcds"));
    assert_eq!(config.svn.trunk, "epics/trunk");
    assert_eq!(config.build.command, vec!["make".to_string()]);
}

#[test]
fn test_load_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let toml_content = r#"
[site]
site_top = "/opt/epics"
module_base_version = "R7.0.2-2.0"
group_roots = ["/opt"]

[git]
root = "/srv/git/epics"

[svn]
root = "file:///srv/svn"

[build]
command = ["make", "-j8"]
"#;
    temp_file.write_all(toml_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = load_config(Some(temp_file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.site.site_top, PathBuf::from("/opt/epics"));
    assert_eq!(config.site.module_base_version, "R7.0.2-2.0");
    assert_eq!(config.site.group_roots, vec![PathBuf::from("/opt")]);
    assert_eq!(config.git.root, PathBuf::from("/srv/git/epics"));
    assert_eq!(config.svn.root, "file:///srv/svn");
    // Unset keys keep their defaults
    assert_eq!(config.svn.tags, "epics/tags");
    assert_eq!(config.build.command, vec!["make", "-j8"]);
}

#[test]
fn test_malformed_file_is_config_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[site\nsite_top = ").unwrap();
    temp_file.flush().unwrap();

    let err = load_config(Some(temp_file.path().to_str().unwrap())).unwrap_err();
    assert!(matches!(err, ReleaseError::Config(_)));
    assert_eq!(err.outcome(), PipelineOutcome::ValidationFailed);
}

#[test]
fn test_relative_site_top_rejected() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"[site]\nsite_top = \"epics\"\n")
        .unwrap();
    temp_file.flush().unwrap();

    let err = load_config(Some(temp_file.path().to_str().unwrap())).unwrap_err();
    assert!(err.to_string().contains("site_top"));
}

#[test]
fn test_missing_explicit_file_is_error() {
    let err = load_config(Some("/nonexistent/pkg-release.toml")).unwrap_err();
    assert!(matches!(err, ReleaseError::Config(_)));
}
