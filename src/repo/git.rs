use std::path::{Path, PathBuf};

use crate::config::GitSettings;
use crate::domain::{Package, ReleaseVersion};
use crate::error::{ReleaseError, Result};
use crate::exec::{Cmd, CommandExecutor};
use crate::repo::{RepositoryBackend, Revision, TagRequest, VcsKind, WorkingContext};
use crate::warning::ReleaseWarning;

/// Prefix for a same-named branch moved aside during checkout.
const OBSOLETE_PREFIX: &str = "obs-";

/// Git repository driven through the system `git` client.
///
/// Tags are created directly in the central repository with `--git-dir`, so
/// `url` must be a local path to that repository.
pub struct GitBackend {
    url: String,
    root: PathBuf,
}

impl GitBackend {
    pub fn new(url: impl Into<String>, settings: &GitSettings) -> Self {
        GitBackend {
            url: url.into(),
            root: settings.root.clone(),
        }
    }

    /// Git directory of the central repository.
    fn git_dir(&self) -> PathBuf {
        let path = PathBuf::from(&self.url);
        let dot_git = path.join(".git");
        if dot_git.is_dir() {
            dot_git
        } else {
            path
        }
    }

    fn central(&self) -> Cmd {
        Cmd::new("git").arg("--git-dir").path_arg(&self.git_dir())
    }

    fn in_checkout(dir: &Path) -> Cmd {
        Cmd::new("git").current_dir(dir)
    }

    fn has_local_branch(exec: &CommandExecutor, dir: &Path, branch: &str) -> Result<bool> {
        exec.probe(&Self::in_checkout(dir).args([
            "show-ref",
            "--verify",
            "--quiet",
            &*format!("refs/heads/{}", branch),
        ]))
    }

    /// Point local branch `local` at `start`, creating it afresh.
    ///
    /// An existing branch of the same name is renamed to `obs-<local>` first
    /// and deleted only after the new branch is checked out.
    fn switch_branch(
        &self,
        exec: &CommandExecutor,
        dir: &Path,
        local: &str,
        start: &str,
    ) -> Result<Vec<ReleaseWarning>> {
        let mut warnings = Vec::new();
        let obsolete = format!("{}{}", OBSOLETE_PREFIX, local);

        if Self::has_local_branch(exec, dir, &obsolete)? {
            log::info!("removing leftover branch {} in {}", obsolete, dir.display());
            exec.run(&Self::in_checkout(dir).args(["branch", "-D", obsolete.as_str()]), true)?;
        }

        let renamed = Self::has_local_branch(exec, dir, local)?;
        if renamed {
            exec.run(
                &Self::in_checkout(dir).args(["branch", "-m", local, obsolete.as_str()]),
                true,
            )?;
        }

        exec.run(
            &Self::in_checkout(dir).args(["checkout", "--quiet", "-b", local, start]),
            true,
        )?;

        if renamed {
            let old = exec.query(&Self::in_checkout(dir).args(["rev-parse", obsolete.as_str()]))?;
            let new = exec.query(&Self::in_checkout(dir).args(["rev-parse", "HEAD"]))?;
            if let (Some(old), Some(new)) = (old, new) {
                if old.trim() != new.trim() {
                    log::warn!(
                        "branch {} pointed at {}, not at {}; discarding it",
                        local,
                        old.trim(),
                        start
                    );
                    warnings.push(ReleaseWarning::StaleBranchDiscarded {
                        branch: obsolete.clone(),
                        commit: old.trim().to_string(),
                    });
                }
            }
            exec.run(&Self::in_checkout(dir).args(["branch", "-D", obsolete.as_str()]), true)?;
        }

        Ok(warnings)
    }

    fn checkout(
        &self,
        exec: &CommandExecutor,
        target_dir: &Path,
        revision: &Revision,
    ) -> Result<Vec<ReleaseWarning>> {
        let (local, start, refspec) = match revision {
            Revision::Tag { version, .. } => (
                version.to_string(),
                format!("refs/tags/{}", version),
                format!("refs/tags/{0}:refs/tags/{0}", version),
            ),
            Revision::Branch { branch, .. } => {
                (branch.clone(), format!("origin/{}", branch), branch.clone())
            }
        };

        if !target_dir.join(".git").exists() {
            exec.run(
                &Cmd::new("git")
                    .args(["clone", "--quiet", self.url.as_str()])
                    .path_arg(target_dir),
                true,
            )?;
        }

        exec.run(
            &Self::in_checkout(target_dir).args(["fetch", "--quiet", "origin", refspec.as_str()]),
            true,
        )?;

        self.switch_branch(exec, target_dir, &local, &start)
    }
}

impl RepositoryBackend for GitBackend {
    fn kind(&self) -> VcsKind {
        VcsKind::Git
    }

    fn working_context(&self, exec: &CommandExecutor, dir: &Path) -> Result<WorkingContext> {
        let inside =
            exec.query(&Self::in_checkout(dir).args(["rev-parse", "--is-inside-work-tree"]));
        match inside {
            Ok(Some(answer)) if answer.trim() == "true" => {}
            Ok(_) => return Ok(WorkingContext::default()),
            Err(ReleaseError::Interrupted) => return Err(ReleaseError::Interrupted),
            Err(_) => return Ok(WorkingContext::default()),
        }

        let url = exec
            .query(&Self::in_checkout(dir).args(["config", "--get", "remote.origin.url"]))?
            .map(|u| u.trim().to_string());

        let branch = exec
            .query(&Self::in_checkout(dir).args(["symbolic-ref", "--short", "-q", "HEAD"]))?
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());

        // Release checkouts sit on a local branch named after the tag.
        let tag = match &branch {
            Some(name) if ReleaseVersion::parse(name).is_ok() => {
                let tagged = exec.probe(&Self::in_checkout(dir).args([
                    "show-ref",
                    "--verify",
                    "--quiet",
                    &*format!("refs/tags/{}", name),
                ]))?;
                tagged.then(|| name.clone())
            }
            Some(_) => None,
            None => exec
                .query(&Self::in_checkout(dir).args([
                    "describe",
                    "--tags",
                    "--exact-match",
                    "HEAD",
                ]))?
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        };

        let branch = if tag.is_some() { None } else { branch };
        Ok(WorkingContext { url, branch, tag })
    }

    fn package_candidates(&self, context: &WorkingContext) -> Vec<String> {
        let url = context.url.as_deref().unwrap_or(&self.url);
        let root = self.root.to_string_lossy();
        let root = root.trim_end_matches('/');

        url.strip_prefix(root)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|rest| rest.trim_end_matches('/'))
            .map(|rest| rest.strip_suffix(".git").unwrap_or(rest))
            .filter(|rest| !rest.is_empty())
            .map(|rest| vec![rest.to_string()])
            .unwrap_or_default()
    }

    fn default_branch(&self, _package: &Package) -> String {
        "master".to_string()
    }

    fn tag_location(&self, _package: &Package, version: &ReleaseVersion) -> String {
        format!("{}:refs/tags/{}", self.url, version)
    }

    fn tag_exists(
        &self,
        exec: &CommandExecutor,
        _package: &Package,
        version: &ReleaseVersion,
    ) -> Result<bool> {
        exec.probe(&self.central().args([
            "show-ref",
            "--verify",
            "--quiet",
            &*format!("refs/tags/{}", version),
        ]))
    }

    fn checkout_release(
        &self,
        exec: &CommandExecutor,
        target_dir: &Path,
        revision: &Revision,
    ) -> Result<Vec<ReleaseWarning>> {
        self.checkout(exec, target_dir, revision)
            .map_err(|e| ReleaseError::checkout_failed(revision.label(), e))
    }

    fn tag_release(&self, exec: &CommandExecutor, request: &TagRequest) -> Result<()> {
        let tag = request.version.to_string();
        exec.run(
            &self.central().args([
                "tag",
                "-a",
                tag.as_str(),
                "-m",
                request.message.as_str(),
                request.branch.as_str(),
            ]),
            true,
        )
        .map(|_| ())
        .map_err(|e| {
            ReleaseError::tag_failed(self.tag_location(&request.package, &request.version), e)
        })
    }

    fn remove_tag(&self, exec: &CommandExecutor, request: &TagRequest) -> Result<()> {
        let tag = request.version.to_string();
        exec.run(&self.central().args(["tag", "-d", tag.as_str()]), true)
            .map(|_| ())
            .map_err(|e| {
                ReleaseError::tag_removal_failed(
                    self.tag_location(&request.package, &request.version),
                    e,
                )
            })
    }
}
