use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReleaseError, Result};

/// File name looked up in the current directory and the user config directory.
pub const CONFIG_FILE_NAME: &str = "pkg-release.toml";

/// Site-specific settings injected into every backend and the pipeline.
///
/// Nothing below this value reads the process environment; all paths, group
/// names and repository roots come from here.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct SiteConfig {
    #[serde(default)]
    pub site: SiteSettings,

    #[serde(default)]
    pub git: GitSettings,

    #[serde(default)]
    pub svn: SvnSettings,

    #[serde(default)]
    pub cvs: CvsSettings,

    #[serde(default)]
    pub build: BuildSettings,
}

fn default_site_top() -> PathBuf {
    PathBuf::from("/reg/g/pcds/epics")
}

fn default_module_base_version() -> String {
    "R3.14.12-0.4.0".to_string()
}

fn default_install_group() -> Option<String> {
    Some("ps-pcds".to_string())
}

fn default_group_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("/reg/g/pcds")]
}

/// Install layout and ownership.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SiteSettings {
    /// Root of the installed release tree.
    #[serde(default = "default_site_top")]
    pub site_top: PathBuf,

    /// EPICS base version that shared modules are built against.
    #[serde(default = "default_module_base_version")]
    pub module_base_version: String,

    /// Group that should own installed trees under one of `group_roots`.
    #[serde(default = "default_install_group")]
    pub install_group: Option<String>,

    /// Recognized site roots for group ownership.
    #[serde(default = "default_group_roots")]
    pub group_roots: Vec<PathBuf>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        SiteSettings {
            site_top: default_site_top(),
            module_base_version: default_module_base_version(),
            install_group: default_install_group(),
            group_roots: default_group_roots(),
        }
    }
}

fn default_git_root() -> PathBuf {
    PathBuf::from("/afs/slac/g/cd/swe/git/repos/package/epics")
}

/// Git repositories live at `<root>/<package>.git`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitSettings {
    #[serde(default = "default_git_root")]
    pub root: PathBuf,
}

impl Default for GitSettings {
    fn default() -> Self {
        GitSettings {
            root: default_git_root(),
        }
    }
}

fn default_svn_root() -> String {
    "file:///afs/slac/g/pcds/vol2/svn/pcds".to_string()
}

fn default_svn_trunk() -> String {
    "epics/trunk".to_string()
}

fn default_svn_tags() -> String {
    "epics/tags".to_string()
}

fn default_svn_branches() -> String {
    "epics/branches".to_string()
}

/// Subversion repository root and the conventional directory stubs below it.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SvnSettings {
    #[serde(default = "default_svn_root")]
    pub root: String,

    #[serde(default = "default_svn_trunk")]
    pub trunk: String,

    #[serde(default = "default_svn_tags")]
    pub tags: String,

    #[serde(default = "default_svn_branches")]
    pub branches: String,
}

impl Default for SvnSettings {
    fn default() -> Self {
        SvnSettings {
            root: default_svn_root(),
            trunk: default_svn_trunk(),
            tags: default_svn_tags(),
            branches: default_svn_branches(),
        }
    }
}

fn default_cvs_root() -> Option<String> {
    Some("/afs/slac/g/lcls/cvs".to_string())
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CvsSettings {
    #[serde(default = "default_cvs_root")]
    pub root: Option<String>,
}

impl Default for CvsSettings {
    fn default() -> Self {
        CvsSettings {
            root: default_cvs_root(),
        }
    }
}

fn default_build_command() -> Vec<String> {
    vec!["make".to_string()]
}

/// The opaque build step, run inside the checkout directory.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BuildSettings {
    #[serde(default = "default_build_command")]
    pub command: Vec<String>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings {
            command: default_build_command(),
        }
    }
}

impl SiteConfig {
    /// Reject settings that would make every run fail later.
    pub fn validate(&self) -> Result<()> {
        if self.build.command.is_empty() || self.build.command[0].trim().is_empty() {
            return Err(ReleaseError::config("[build].command must name a program"));
        }
        if self.site.module_base_version.trim().is_empty() {
            return Err(ReleaseError::config(
                "[site].module_base_version must not be empty",
            ));
        }
        if !self.site.site_top.is_absolute() {
            return Err(ReleaseError::config(format!(
                "[site].site_top must be absolute, got {}",
                self.site.site_top.display()
            )));
        }
        Ok(())
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `pkg-release.toml` in current directory
/// 3. `pkg-release.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(SiteConfig)` - Loaded or default configuration
/// * `Err(ReleaseError::Config)` - If a file exists but cannot be read, parsed or validated
pub fn load_config(config_path: Option<&str>) -> Result<SiteConfig> {
    let path = if let Some(path) = config_path {
        Some(PathBuf::from(path))
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        Some(PathBuf::from(CONFIG_FILE_NAME))
    } else {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .filter(|candidate| candidate.exists())
    };

    let config = match path {
        Some(path) => parse_config_file(&path)?,
        None => {
            log::debug!("no {} found, using built-in site defaults", CONFIG_FILE_NAME);
            SiteConfig::default()
        }
    };

    config.validate()?;
    Ok(config)
}

fn parse_config_file(path: &Path) -> Result<SiteConfig> {
    let text = fs::read_to_string(path).map_err(|e| {
        ReleaseError::config(format!("cannot read {}: {}", path.display(), e))
    })?;
    log::debug!("loading site configuration from {}", path.display());
    toml::from_str(&text)
        .map_err(|e| ReleaseError::config(format!("cannot parse {}: {}", path.display(), e)))
}
