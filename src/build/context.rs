use std::collections::HashMap;
use std::path::PathBuf;

use crate::domain::{Package, ReleaseVersion};

/// Why the build step is being run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// Throwaway build in the workspace, proving the release builds
    TestBuild,
    /// Build directly into the install directory
    Install,
}

impl BuildPhase {
    /// Get the phase name as a string
    pub fn name(&self) -> &'static str {
        match self {
            BuildPhase::TestBuild => "test-build",
            BuildPhase::Install => "install",
        }
    }
}

/// Context information passed to the build step
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub phase: BuildPhase,
    pub package: Package,
    pub version: ReleaseVersion,
    /// Set for [`BuildPhase::Install`] only
    pub install_dir: Option<PathBuf>,
}

impl BuildContext {
    pub fn test_build(package: &Package, version: &ReleaseVersion) -> Self {
        BuildContext {
            phase: BuildPhase::TestBuild,
            package: package.clone(),
            version: version.clone(),
            install_dir: None,
        }
    }

    pub fn install(package: &Package, version: &ReleaseVersion, install_dir: PathBuf) -> Self {
        BuildContext {
            phase: BuildPhase::Install,
            package: package.clone(),
            version: version.clone(),
            install_dir: Some(install_dir),
        }
    }

    /// Convert context to environment variables for the build command
    ///
    /// Maps context fields to PKG_RELEASE_* environment variables
    pub fn to_env_vars(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();

        env.insert("PKG_RELEASE_PACKAGE".to_string(), self.package.to_string());
        env.insert("PKG_RELEASE_VERSION".to_string(), self.version.to_string());
        env.insert("PKG_RELEASE_PHASE".to_string(), self.phase.name().to_string());

        if let Some(ref dir) = self.install_dir {
            env.insert(
                "PKG_RELEASE_INSTALL_DIR".to_string(),
                dir.to_string_lossy().into_owned(),
            );
        }

        env
    }
}
