use std::fmt;
use std::path::PathBuf;

use crate::config::SiteConfig;
use crate::domain::version::ReleaseVersion;
use crate::error::{ReleaseError, Result};

/// A releasable unit, identified by a relative path such as `modules/asyn`,
/// `ioc/xpp/vacuum` or `base`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Package {
    name: String,
}

impl Package {
    pub fn parse(name: &str) -> Result<Self> {
        let trimmed = name.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ReleaseError::validation("package name is empty"));
        }
        if trimmed.starts_with('/') {
            return Err(ReleaseError::validation(format!(
                "package '{}' must be a relative path like modules/<name>",
                name
            )));
        }
        if trimmed
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(ReleaseError::validation(format!(
                "package '{}' contains an empty or relative path segment",
                name
            )));
        }

        Ok(Package {
            name: trimmed.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Shared EPICS modules install under the module base version.
    pub fn is_module(&self) -> bool {
        self.name.starts_with("modules/")
    }

    /// Last path segment, e.g. `asyn` for `modules/asyn`.
    pub fn leaf(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Default install location for `version` of this package.
    ///
    /// * modules: `<site_top>/<module_base_version>/<package>/<version>`
    /// * everything else: `<site_top>/<package>/<version>`
    pub fn install_dir(&self, site: &SiteConfig, version: &ReleaseVersion) -> PathBuf {
        let mut dir = site.site.site_top.clone();
        if self.is_module() {
            dir.push(&site.site.module_base_version);
        }
        dir.push(&self.name);
        dir.push(version.as_str());
        dir
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_packages() {
        for name in ["base", "modules/asyn", "ioc/xpp/vacuum", "modules/asyn/"] {
            assert!(Package::parse(name).is_ok(), "{name} should be valid");
        }
        assert_eq!(Package::parse("modules/asyn/").unwrap().as_str(), "modules/asyn");
    }

    #[test]
    fn test_parse_rejects_bad_paths() {
        for name in ["", "  ", "/modules/asyn", "modules//asyn", "modules/../base", "./base"] {
            assert!(Package::parse(name).is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn test_leaf_and_module() {
        let asyn = Package::parse("modules/asyn").unwrap();
        assert!(asyn.is_module());
        assert_eq!(asyn.leaf(), "asyn");

        let base = Package::parse("base").unwrap();
        assert!(!base.is_module());
        assert_eq!(base.leaf(), "base");
    }

    #[test]
    fn test_install_dir_layout() {
        let mut site = SiteConfig::default();
        site.site.site_top = PathBuf::from("/epics");
        site.site.module_base_version = "R3.14.12-0.4.0".to_string();

        let version = ReleaseVersion::parse("R4.31-0.1.0").unwrap();
        let module = Package::parse("modules/asyn").unwrap();
        assert_eq!(
            module.install_dir(&site, &version),
            PathBuf::from("/epics/R3.14.12-0.4.0/modules/asyn/R4.31-0.1.0")
        );

        let ioc = Package::parse("ioc/xpp/vacuum").unwrap();
        assert_eq!(
            ioc.install_dir(&site, &version),
            PathBuf::from("/epics/ioc/xpp/vacuum/R4.31-0.1.0")
        );
    }
}
