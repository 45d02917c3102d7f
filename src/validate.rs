//! Release validation
//!
//! Turns a partial [`ReleaseRequest`] into a [`ResolvedRelease`], filling in
//! missing fields from the working directory's checkout and refusing any
//! release that cannot legally proceed.

use std::path::Path;

use crate::config::SiteConfig;
use crate::domain::{Package, ReleaseRequest, ReleaseVersion, ResolvedRelease};
use crate::error::{ReleaseError, Result};
use crate::exec::CommandExecutor;
use crate::repo::{RepositoryBackend, WorkingContext};
use crate::ui::Prompter;

/// Message used with `--no-msg` when none was given.
pub fn default_message(package: &Package, version: &ReleaseVersion) -> String {
    format!("Release {} {}", package, version)
}

pub struct ReleaseValidator<'a> {
    backend: &'a dyn RepositoryBackend,
    exec: &'a CommandExecutor,
    site: &'a SiteConfig,
    prompter: &'a dyn Prompter,
}

impl<'a> ReleaseValidator<'a> {
    pub fn new(
        backend: &'a dyn RepositoryBackend,
        exec: &'a CommandExecutor,
        site: &'a SiteConfig,
        prompter: &'a dyn Prompter,
    ) -> Self {
        ReleaseValidator {
            backend,
            exec,
            site,
            prompter,
        }
    }

    /// Resolve `request` against the checkout in `cwd`.
    ///
    /// Removal requests skip the message, tag-absence and branch checks; a
    /// tag removal instead requires the tag to exist.
    ///
    /// # Returns
    /// * `Ok(ResolvedRelease)` - Every field filled in and checked
    /// * `Err(ReleaseError::Validation)` / `Err(ReleaseError::InvalidVersion)` - Release refused
    pub fn validate(&self, request: &ReleaseRequest, cwd: &Path) -> Result<ResolvedRelease> {
        let context = self.backend.working_context(self.exec, cwd)?;
        let candidates = self.backend.package_candidates(&context);
        log::debug!("working context of {}: {:?}", cwd.display(), context);

        let package = self.resolve_package(request, &candidates, cwd)?;
        // The checkout only supplies defaults when it belongs to this package.
        let own_context = if candidates.iter().any(|c| c == package.as_str()) {
            context
        } else {
            WorkingContext::default()
        };

        let branch = match &request.branch {
            Some(branch) => branch.clone(),
            None => own_context
                .branch
                .clone()
                .unwrap_or_else(|| self.backend.default_branch(&package)),
        };

        let version = match request.version.as_deref().or(own_context.tag.as_deref()) {
            Some(version) => ReleaseVersion::parse(version)?,
            None => {
                return Err(ReleaseError::validation(format!(
                    "no release version given and {} is not on a release tag; pass --release",
                    cwd.display()
                )))
            }
        };

        let tag_location = self.backend.tag_location(&package, &version);
        let install_dir = request
            .install_dir
            .clone()
            .unwrap_or_else(|| package.install_dir(self.site, &version));
        let flags = request.flags;

        if flags.is_removal() {
            if flags.removes_tag()
                && !self.backend.tag_exists(self.exec, &package, &version)?
            {
                return Err(ReleaseError::validation(format!(
                    "tag {} does not exist, nothing to remove",
                    tag_location
                )));
            }
            return Ok(ResolvedRelease {
                package,
                version,
                branch,
                tag_location,
                message: None,
                install_dir,
                flags,
            });
        }

        let message = if flags.creates_tag() {
            Some(self.resolve_message(request, &package, &version)?)
        } else {
            request.message.clone().filter(|m| !m.trim().is_empty())
        };

        if flags.creates_tag() && self.backend.tag_exists(self.exec, &package, &version)? {
            return Err(ReleaseError::validation(format!(
                "tag {} already exists; use --no-tag or remove the stale tag first",
                tag_location
            )));
        }

        if let Some(current) = &own_context.branch {
            if !flags.batch && *current != branch {
                let question = format!(
                    "Releasing from branch {} but the working directory is on {}. Continue?",
                    branch, current
                );
                if !self.prompter.confirm(&question)? {
                    return Err(ReleaseError::validation(format!(
                        "branch mismatch: release branch {} differs from working branch {}",
                        branch, current
                    )));
                }
            }
        }

        Ok(ResolvedRelease {
            package,
            version,
            branch,
            tag_location,
            message,
            install_dir,
            flags,
        })
    }

    fn resolve_package(
        &self,
        request: &ReleaseRequest,
        candidates: &[String],
        cwd: &Path,
    ) -> Result<Package> {
        if let Some(name) = &request.package {
            return Package::parse(name);
        }
        match candidates {
            [only] => Package::parse(only),
            [] => Err(ReleaseError::validation(format!(
                "cannot determine the package from {}; pass --package",
                cwd.display()
            ))),
            many => Err(ReleaseError::validation(format!(
                "{} could belong to several packages ({}); pass --package",
                cwd.display(),
                many.join(", ")
            ))),
        }
    }

    fn resolve_message(
        &self,
        request: &ReleaseRequest,
        package: &Package,
        version: &ReleaseVersion,
    ) -> Result<String> {
        if let Some(message) = request.message.as_deref().filter(|m| !m.trim().is_empty()) {
            return Ok(message.trim().to_string());
        }
        if request.flags.no_msg {
            return Ok(default_message(package, version));
        }

        let message = self
            .prompter
            .read_message(&format!("Release message for {} {}", package, version))?;
        let message = message.trim();
        if message.is_empty() {
            return Err(ReleaseError::validation("the release message is empty"));
        }
        Ok(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReleaseFlags;
    use crate::exec::{ExecMode, MockRunner};
    use crate::repo::MockBackend;
    use crate::ui::{BatchPrompter, ScriptedPrompter};
    use std::path::PathBuf;

    fn executor() -> CommandExecutor {
        CommandExecutor::with_runner(Box::new(MockRunner::new()), ExecMode::default())
    }

    fn request(package: Option<&str>, version: Option<&str>) -> ReleaseRequest {
        ReleaseRequest {
            package: package.map(str::to_string),
            version: version.map(str::to_string),
            message: Some("Fix ring buffer overflow".to_string()),
            ..Default::default()
        }
    }

    fn on_tag(tag: &str) -> MockBackend {
        MockBackend::new()
            .with_context(WorkingContext {
                url: Some("/git/modules/foo.git".to_string()),
                branch: None,
                tag: Some(tag.to_string()),
            })
            .with_candidates(&["modules/foo"])
    }

    #[test]
    fn test_version_from_working_tag() {
        let backend = on_tag("R1.2.3-0.1.0");
        let exec = executor();
        let site = SiteConfig::default();
        let prompter = ScriptedPrompter::new();
        let validator = ReleaseValidator::new(&backend, &exec, &site, &prompter);

        let release = validator
            .validate(&request(Some("modules/foo"), None), Path::new("/work"))
            .unwrap();
        assert_eq!(release.version.as_str(), "R1.2.3-0.1.0");
        assert_eq!(release.branch, "master");
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn test_package_from_context() {
        let backend = on_tag("R1.0.0");
        let exec = executor();
        let site = SiteConfig::default();
        let validator = ReleaseValidator::new(&backend, &exec, &site, &BatchPrompter);

        let release = validator
            .validate(&request(None, Some("R1.1.0")), Path::new("/work"))
            .unwrap();
        assert_eq!(release.package.as_str(), "modules/foo");
        assert_eq!(
            release.install_dir,
            PathBuf::from("/reg/g/pcds/epics/R3.14.12-0.4.0/modules/foo/R1.1.0")
        );
    }

    #[test]
    fn test_ambiguous_or_missing_package() {
        let exec = executor();
        let site = SiteConfig::default();

        let none = MockBackend::new();
        let err = ReleaseValidator::new(&none, &exec, &site, &BatchPrompter)
            .validate(&request(None, Some("R1.0.0")), Path::new("/work"))
            .unwrap_err();
        assert!(err.to_string().contains("--package"));

        let many = MockBackend::new().with_candidates(&["ioc/a", "ioc/b"]);
        let err = ReleaseValidator::new(&many, &exec, &site, &BatchPrompter)
            .validate(&request(None, Some("R1.0.0")), Path::new("/work"))
            .unwrap_err();
        assert!(err.to_string().contains("ioc/a, ioc/b"));
    }

    #[test]
    fn test_existing_tag_is_refused() {
        let backend = MockBackend::new().with_tag("R1.0.0");
        let exec = executor();
        let site = SiteConfig::default();
        let validator = ReleaseValidator::new(&backend, &exec, &site, &BatchPrompter);

        let err = validator
            .validate(&request(Some("base"), Some("R1.0.0")), Path::new("/work"))
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Validation { .. }));
        assert!(err.to_string().contains("mock:base@R1.0.0"));
    }

    #[test]
    fn test_existing_tag_allowed_with_no_tag() {
        let backend = MockBackend::new().with_tag("R1.0.0");
        let exec = executor();
        let site = SiteConfig::default();
        let validator = ReleaseValidator::new(&backend, &exec, &site, &BatchPrompter);
        let mut req = request(Some("base"), Some("R1.0.0"));
        req.flags.no_tag = true;

        assert!(validator.validate(&req, Path::new("/work")).is_ok());
    }

    #[test]
    fn test_invalid_version() {
        let backend = MockBackend::new();
        let exec = executor();
        let site = SiteConfig::default();
        let validator = ReleaseValidator::new(&backend, &exec, &site, &BatchPrompter);

        let err = validator
            .validate(&request(Some("base"), Some("3.15.4")), Path::new("/work"))
            .unwrap_err();
        assert!(matches!(err, ReleaseError::InvalidVersion { .. }));
    }

    #[test]
    fn test_message_prompted_then_required() {
        let backend = MockBackend::new();
        let exec = executor();
        let site = SiteConfig::default();
        let mut req = request(Some("base"), Some("R1.0.0"));
        req.message = None;

        let prompter = ScriptedPrompter::new().with_message("  New driver\n");
        let release = ReleaseValidator::new(&backend, &exec, &site, &prompter)
            .validate(&req, Path::new("/work"))
            .unwrap();
        assert_eq!(release.message.as_deref(), Some("New driver"));

        let silent = ScriptedPrompter::new();
        let err = ReleaseValidator::new(&backend, &exec, &site, &silent)
            .validate(&req, Path::new("/work"))
            .unwrap_err();
        assert!(err.to_string().contains("empty"));

        let err = ReleaseValidator::new(&backend, &exec, &site, &BatchPrompter)
            .validate(&req, Path::new("/work"))
            .unwrap_err();
        assert!(err.to_string().contains("--no-msg"));
    }

    #[test]
    fn test_no_msg_uses_default_message() {
        let backend = MockBackend::new();
        let exec = executor();
        let site = SiteConfig::default();
        let mut req = request(Some("base"), Some("R1.0.0"));
        req.message = None;
        req.flags.no_msg = true;

        let release = ReleaseValidator::new(&backend, &exec, &site, &BatchPrompter)
            .validate(&req, Path::new("/work"))
            .unwrap();
        assert_eq!(release.message.as_deref(), Some("Release base R1.0.0"));
    }

    #[test]
    fn test_branch_mismatch_prompts() {
        let backend = MockBackend::new()
            .with_context(WorkingContext {
                url: Some("/git/base.git".to_string()),
                branch: Some("feature".to_string()),
                tag: None,
            })
            .with_candidates(&["base"]);
        let exec = executor();
        let site = SiteConfig::default();
        let mut req = request(Some("base"), Some("R1.0.0"));
        req.branch = Some("master".to_string());

        let decline = ScriptedPrompter::new().with_answers(&[false]);
        let err = ReleaseValidator::new(&backend, &exec, &site, &decline)
            .validate(&req, Path::new("/work"))
            .unwrap_err();
        assert!(err.to_string().contains("branch mismatch"));

        let accept = ScriptedPrompter::new().with_answers(&[true]);
        assert!(ReleaseValidator::new(&backend, &exec, &site, &accept)
            .validate(&req, Path::new("/work"))
            .is_ok());

        req.flags.batch = true;
        let never = ScriptedPrompter::new();
        assert!(ReleaseValidator::new(&backend, &exec, &site, &never)
            .validate(&req, Path::new("/work"))
            .is_ok());
        assert!(never.asked().is_empty());
    }

    #[test]
    fn test_rm_tag_requires_existing_tag() {
        let exec = executor();
        let site = SiteConfig::default();
        let req = ReleaseRequest {
            package: Some("base".to_string()),
            version: Some("R1.0.0".to_string()),
            flags: ReleaseFlags {
                rm_tag: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let missing = MockBackend::new();
        let err = ReleaseValidator::new(&missing, &exec, &site, &BatchPrompter)
            .validate(&req, Path::new("/work"))
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        let present = MockBackend::new().with_tag("R1.0.0");
        let release = ReleaseValidator::new(&present, &exec, &site, &BatchPrompter)
            .validate(&req, Path::new("/work"))
            .unwrap();
        assert!(release.message.is_none());
    }
}
