//! Version-control backends
//!
//! This module provides a trait-based abstraction over the three version-control
//! systems a package can live in. Their tagging models differ fundamentally:
//!
//! - [git::GitBackend]: atomic ref creation (`git tag -a`)
//! - [svn::SvnBackend]: server-side copy of the branch into a tag directory
//! - [cvs::CvsBackend]: linear `cvs tag` against a checked-out sandbox
//! - [mock::MockBackend]: an in-memory backend for testing
//!
//! The concrete variant is chosen once, at discovery time, and carried as a
//! [`Backend`] value; callers depend only on [`RepositoryBackend`].

pub mod cvs;
pub mod git;
pub mod mock;
pub mod svn;

pub use cvs::CvsBackend;
pub use git::GitBackend;
pub use mock::MockBackend;
pub use svn::SvnBackend;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::SiteConfig;
use crate::domain::{Package, ReleaseVersion};
use crate::error::{ReleaseError, Result};
use crate::exec::{Cmd, CommandExecutor};
use crate::warning::ReleaseWarning;

/// Which version-control system a backend talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsKind {
    Git,
    Subversion,
    Cvs,
}

impl VcsKind {
    pub fn name(&self) -> &'static str {
        match self {
            VcsKind::Git => "git",
            VcsKind::Subversion => "svn",
            VcsKind::Cvs => "cvs",
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the version-control metadata of a directory says about it.
///
/// All fields are `None` when the directory is not a checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingContext {
    /// Repository location (remote URL, Subversion URL, or CVS module path)
    pub url: Option<String>,
    /// Branch the checkout follows, if it is on one
    pub branch: Option<String>,
    /// Release tag the checkout sits on, if any
    pub tag: Option<String>,
}

impl WorkingContext {
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.branch.is_none() && self.tag.is_none()
    }
}

/// A revision to materialize: the tip of a branch or a release tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Revision {
    Branch { package: Package, branch: String },
    Tag { package: Package, version: ReleaseVersion },
}

impl Revision {
    pub fn branch(package: &Package, branch: &str) -> Self {
        Revision::Branch {
            package: package.clone(),
            branch: branch.to_string(),
        }
    }

    pub fn tag(package: &Package, version: &ReleaseVersion) -> Self {
        Revision::Tag {
            package: package.clone(),
            version: version.clone(),
        }
    }

    pub fn package(&self) -> &Package {
        match self {
            Revision::Branch { package, .. } | Revision::Tag { package, .. } => package,
        }
    }

    /// Short description used in messages.
    pub fn label(&self) -> String {
        match self {
            Revision::Branch { package, branch } => format!("{} branch {}", package, branch),
            Revision::Tag { package, version } => format!("{} tag {}", package, version),
        }
    }
}

/// Everything a backend needs to create or delete a release tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TagRequest {
    pub package: Package,
    pub version: ReleaseVersion,
    pub branch: String,
    pub message: String,
    /// Scratch directory for backends that tag from a sandbox.
    pub sandbox: PathBuf,
}

/// Common version-control capability set used by validation and the pipeline.
///
/// Every operation runs its external commands through the supplied
/// [`CommandExecutor`] and reports failures as typed errors carrying the
/// failing command line and its output.
pub trait RepositoryBackend: Send + Sync {
    fn kind(&self) -> VcsKind;

    /// Inspect `dir` for version-control metadata.
    ///
    /// Returns an empty context when `dir` is not a checkout of this backend.
    fn working_context(&self, exec: &CommandExecutor, dir: &Path) -> Result<WorkingContext>;

    /// Package names the working context could belong to.
    fn package_candidates(&self, context: &WorkingContext) -> Vec<String>;

    /// Branch a release of `package` is cut from when none is given.
    fn default_branch(&self, package: &Package) -> String;

    /// Where the tag for `version` lives, for display.
    fn tag_location(&self, package: &Package, version: &ReleaseVersion) -> String;

    fn tag_exists(
        &self,
        exec: &CommandExecutor,
        package: &Package,
        version: &ReleaseVersion,
    ) -> Result<bool>;

    /// Materialize `revision` into `target_dir`.
    ///
    /// # Returns
    /// * `Ok(warnings)` - Checkout done; non-fatal observations attached
    /// * `Err(ReleaseError::CheckoutFailed)` - Any version-control failure
    fn checkout_release(
        &self,
        exec: &CommandExecutor,
        target_dir: &Path,
        revision: &Revision,
    ) -> Result<Vec<ReleaseWarning>>;

    /// Create the release tag. Fails with `ReleaseError::TagFailed`.
    fn tag_release(&self, exec: &CommandExecutor, request: &TagRequest) -> Result<()>;

    /// Delete the release tag. Fails with `ReleaseError::TagRemovalFailed`.
    fn remove_tag(&self, exec: &CommandExecutor, request: &TagRequest) -> Result<()>;
}

/// The backend bound to a release run.
pub enum Backend {
    Git(GitBackend),
    Svn(SvnBackend),
    Cvs(CvsBackend),
}

impl Backend {
    /// Bind the backend whose metadata is present in `dir`.
    ///
    /// # Returns
    /// * `Ok(Some(backend))` - `dir` is a Git, Subversion or CVS checkout
    /// * `Ok(None)` - No version-control metadata found
    pub fn discover(exec: &CommandExecutor, site: &SiteConfig, dir: &Path) -> Result<Option<Self>> {
        let toplevel = optional_query(
            exec,
            &Cmd::new("git")
                .args(["rev-parse", "--show-toplevel"])
                .current_dir(dir),
        )?;
        if let Some(toplevel) = toplevel {
            let remote = optional_query(
                exec,
                &Cmd::new("git")
                    .args(["config", "--get", "remote.origin.url"])
                    .current_dir(dir),
            )?;
            let url = remote.unwrap_or(toplevel).trim().to_string();
            log::debug!("{} is a git checkout of {}", dir.display(), url);
            return Ok(Some(Backend::Git(GitBackend::new(url, &site.git))));
        }

        if optional_query(exec, &Cmd::new("svn").arg("info").current_dir(dir))?.is_some() {
            log::debug!("{} is a subversion working copy", dir.display());
            return Ok(Some(Backend::Svn(SvnBackend::new(&site.svn))));
        }

        if let Some(root) = cvs::read_sandbox_root(dir) {
            log::debug!("{} is a cvs sandbox of {}", dir.display(), root);
            return Ok(Some(Backend::Cvs(CvsBackend::new(root))));
        }

        Ok(None)
    }

    /// Find the repository holding `package` under the configured roots.
    ///
    /// Probes Git, then Subversion, then CVS.
    pub fn for_package(
        exec: &CommandExecutor,
        site: &SiteConfig,
        package: &Package,
    ) -> Result<Self> {
        let git_dir = site.git.root.join(format!("{}.git", package));
        if git_dir.exists() {
            return Ok(Backend::Git(GitBackend::new(
                git_dir.to_string_lossy().into_owned(),
                &site.git,
            )));
        }

        let svn = SvnBackend::new(&site.svn);
        let svn_branch = svn.default_branch(package);
        if optional_query(exec, &Cmd::new("svn").args(["ls", svn_branch.as_str()]))?.is_some() {
            return Ok(Backend::Svn(svn));
        }

        if let Some(root) = &site.cvs.root {
            if Path::new(root).join(package.as_str()).is_dir() {
                return Ok(Backend::Cvs(CvsBackend::new(root.clone())));
            }
        }

        Err(ReleaseError::validation(format!(
            "no git, svn or cvs repository found for package '{}'",
            package
        )))
    }

    fn inner(&self) -> &dyn RepositoryBackend {
        match self {
            Backend::Git(git) => git,
            Backend::Svn(svn) => svn,
            Backend::Cvs(cvs) => cvs,
        }
    }
}

impl RepositoryBackend for Backend {
    fn kind(&self) -> VcsKind {
        self.inner().kind()
    }

    fn working_context(&self, exec: &CommandExecutor, dir: &Path) -> Result<WorkingContext> {
        self.inner().working_context(exec, dir)
    }

    fn package_candidates(&self, context: &WorkingContext) -> Vec<String> {
        self.inner().package_candidates(context)
    }

    fn default_branch(&self, package: &Package) -> String {
        self.inner().default_branch(package)
    }

    fn tag_location(&self, package: &Package, version: &ReleaseVersion) -> String {
        self.inner().tag_location(package, version)
    }

    fn tag_exists(
        &self,
        exec: &CommandExecutor,
        package: &Package,
        version: &ReleaseVersion,
    ) -> Result<bool> {
        self.inner().tag_exists(exec, package, version)
    }

    fn checkout_release(
        &self,
        exec: &CommandExecutor,
        target_dir: &Path,
        revision: &Revision,
    ) -> Result<Vec<ReleaseWarning>> {
        self.inner().checkout_release(exec, target_dir, revision)
    }

    fn tag_release(&self, exec: &CommandExecutor, request: &TagRequest) -> Result<()> {
        self.inner().tag_release(exec, request)
    }

    fn remove_tag(&self, exec: &CommandExecutor, request: &TagRequest) -> Result<()> {
        self.inner().remove_tag(exec, request)
    }
}

/// Like [`CommandExecutor::query`], but a client that cannot be started
/// (not installed) also counts as "no answer".
pub(crate) fn optional_query(exec: &CommandExecutor, cmd: &Cmd) -> Result<Option<String>> {
    match exec.query(cmd) {
        Ok(answer) => Ok(answer),
        Err(ReleaseError::Interrupted) => Err(ReleaseError::Interrupted),
        Err(err) => {
            log::debug!("{} unavailable: {}", cmd.program(), err);
            Ok(None)
        }
    }
}
