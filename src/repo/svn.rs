use std::path::Path;

use crate::config::SvnSettings;
use crate::domain::{Package, ReleaseVersion};
use crate::error::{ReleaseError, Result};
use crate::exec::{Cmd, CommandExecutor};
use crate::repo::{RepositoryBackend, Revision, TagRequest, VcsKind, WorkingContext};
use crate::warning::ReleaseWarning;

/// Directory under the package trunk that holds the development line.
const CURRENT: &str = "current";

/// Subversion repository laid out as `<trunk>/<package>/current` and
/// `<tags>/<package>/<version>`.
pub struct SvnBackend {
    settings: SvnSettings,
}

impl SvnBackend {
    pub fn new(settings: &SvnSettings) -> Self {
        SvnBackend {
            settings: settings.clone(),
        }
    }

    fn root(&self) -> &str {
        self.settings.root.trim_end_matches('/')
    }

    fn tag_parent(&self, package: &Package) -> String {
        format!("{}/{}/{}", self.root(), self.settings.tags, package)
    }

    fn tag_url(&self, package: &Package, version: &ReleaseVersion) -> String {
        format!("{}/{}", self.tag_parent(package), version)
    }

    /// Branches given without a scheme are taken relative to the repository root.
    fn branch_url(&self, branch: &str) -> String {
        if branch.contains("://") {
            branch.to_string()
        } else {
            format!("{}/{}", self.root(), branch.trim_start_matches('/'))
        }
    }

    fn revision_url(&self, revision: &Revision) -> String {
        match revision {
            Revision::Branch { branch, .. } => self.branch_url(branch),
            Revision::Tag { package, version } => self.tag_url(package, version),
        }
    }

    fn checkout(
        &self,
        exec: &CommandExecutor,
        target_dir: &Path,
        revision: &Revision,
    ) -> Result<()> {
        let url = self.revision_url(revision);

        if target_dir.join(".svn").exists() {
            let current = exec
                .query(&Cmd::new("svn").arg("info").current_dir(target_dir))?
                .as_deref()
                .and_then(|info| info_field(info, "URL"));
            if current.as_deref() == Some(url.as_str()) {
                log::info!("{} already tracks {}", target_dir.display(), url);
                return Ok(());
            }
            return Err(ReleaseError::validation(format!(
                "{} is a working copy of {}, not {}",
                target_dir.display(),
                current.unwrap_or_else(|| "an unknown URL".to_string()),
                url
            )));
        }

        exec.run(
            &Cmd::new("svn")
                .args(["checkout", "--quiet", url.as_str()])
                .path_arg(target_dir),
            true,
        )?;
        Ok(())
    }

    /// Locate the package inside a repository-relative path.
    ///
    /// Returns the layout stub, the path segments below it and the index of
    /// the first segment past the package name (`current` or a version).
    fn locate<'p>(&self, relative: &'p str) -> Option<(String, Vec<&'p str>, usize)> {
        let stubs = [
            self.settings.trunk.as_str(),
            self.settings.branches.as_str(),
            self.settings.tags.as_str(),
        ];

        for stub in stubs {
            let stub = stub.trim_matches('/');
            let Some(rest) = relative.strip_prefix(stub).and_then(|r| r.strip_prefix('/')) else {
                continue;
            };
            let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
            let end = segments
                .iter()
                .position(|s| *s == CURRENT || ReleaseVersion::parse(s).is_ok())
                .unwrap_or(segments.len());
            if end == 0 {
                return None;
            }
            return Some((stub.to_string(), segments, end));
        }
        None
    }

    /// Split a repository-relative path into the package it belongs to.
    fn package_from_path(&self, relative: &str) -> Option<String> {
        self.locate(relative)
            .map(|(_, segments, end)| segments[..end].join("/"))
    }

    /// The development line a working-copy URL belongs to.
    ///
    /// A URL inside `<package>/current` is cut back to that directory, so a
    /// subdirectory of the checkout names the whole package line.
    fn branch_from_url(&self, url: &str) -> String {
        let prefix = format!("{}/", self.root());
        let located = url
            .strip_prefix(&prefix)
            .and_then(|relative| self.locate(relative));
        match located {
            Some((stub, segments, end)) if segments.get(end) == Some(&CURRENT) => {
                format!("{}{}/{}", prefix, stub, segments[..=end].join("/"))
            }
            _ => url.to_string(),
        }
    }
}

/// Value of a `Key: value` line in `svn info` output.
fn info_field(info: &str, key: &str) -> Option<String> {
    info.lines()
        .find_map(|line| line.strip_prefix(key)?.strip_prefix(": "))
        .map(|value| value.trim().to_string())
}

impl RepositoryBackend for SvnBackend {
    fn kind(&self) -> VcsKind {
        VcsKind::Subversion
    }

    fn working_context(&self, exec: &CommandExecutor, dir: &Path) -> Result<WorkingContext> {
        let info = match exec.query(&Cmd::new("svn").arg("info").current_dir(dir)) {
            Ok(Some(info)) => info,
            Ok(None) => return Ok(WorkingContext::default()),
            Err(ReleaseError::Interrupted) => return Err(ReleaseError::Interrupted),
            Err(_) => return Ok(WorkingContext::default()),
        };

        let Some(url) = info_field(&info, "URL") else {
            return Ok(WorkingContext::default());
        };

        let tags_prefix = format!("{}/{}/", self.root(), self.settings.tags.trim_matches('/'));
        let tag = url
            .strip_prefix(&tags_prefix)
            .and_then(|rest| rest.split('/').find(|s| ReleaseVersion::parse(s).is_ok()))
            .map(str::to_string);
        let branch = if tag.is_some() {
            None
        } else {
            Some(self.branch_from_url(&url))
        };

        Ok(WorkingContext {
            url: Some(url),
            branch,
            tag,
        })
    }

    fn package_candidates(&self, context: &WorkingContext) -> Vec<String> {
        let prefix = format!("{}/", self.root());
        context
            .url
            .as_deref()
            .and_then(|url| url.strip_prefix(&prefix))
            .and_then(|relative| self.package_from_path(relative))
            .into_iter()
            .collect()
    }

    fn default_branch(&self, package: &Package) -> String {
        format!("{}/{}/{}/{}", self.root(), self.settings.trunk, package, CURRENT)
    }

    fn tag_location(&self, package: &Package, version: &ReleaseVersion) -> String {
        self.tag_url(package, version)
    }

    fn tag_exists(
        &self,
        exec: &CommandExecutor,
        package: &Package,
        version: &ReleaseVersion,
    ) -> Result<bool> {
        exec.probe(&Cmd::new("svn").args(["ls", &*self.tag_url(package, version)]))
    }

    fn checkout_release(
        &self,
        exec: &CommandExecutor,
        target_dir: &Path,
        revision: &Revision,
    ) -> Result<Vec<ReleaseWarning>> {
        self.checkout(exec, target_dir, revision)
            .map(|_| Vec::new())
            .map_err(|e| ReleaseError::checkout_failed(revision.label(), e))
    }

    fn tag_release(&self, exec: &CommandExecutor, request: &TagRequest) -> Result<()> {
        let tag_url = self.tag_url(&request.package, &request.version);
        let tag = || -> Result<()> {
            let parent = self.tag_parent(&request.package);
            if !exec.probe(&Cmd::new("svn").args(["ls", parent.as_str()]))? {
                exec.run(
                    &Cmd::new("svn").args([
                        "mkdir",
                        "--parents",
                        "-m",
                        &*format!("Creating release directory for {}", request.package),
                        parent.as_str(),
                    ]),
                    true,
                )?;
            }
            exec.run(
                &Cmd::new("svn").args([
                    "copy",
                    "-m",
                    request.message.as_str(),
                    &*self.branch_url(&request.branch),
                    tag_url.as_str(),
                ]),
                true,
            )?;
            Ok(())
        };
        tag().map_err(|e| ReleaseError::tag_failed(tag_url.clone(), e))
    }

    fn remove_tag(&self, exec: &CommandExecutor, request: &TagRequest) -> Result<()> {
        let tag_url = self.tag_url(&request.package, &request.version);
        exec.run(
            &Cmd::new("svn").args([
                "delete",
                "-m",
                &*format!("Removing release {} {}", request.package, request.version),
                tag_url.as_str(),
            ]),
            true,
        )
        .map(|_| ())
        .map_err(|e| ReleaseError::tag_removal_failed(tag_url.clone(), e))
    }
}
