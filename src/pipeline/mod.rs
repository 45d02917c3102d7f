//! The release pipeline
//!
//! A [`Releaser`] drives one run through
//! `Created -> Validated -> TestBuilt -> Tagged -> Installed -> CleanedUp`,
//! or through the removal states for `--rm-build`, `--rm-tag` and
//! `--nuke-release`. Cleanup runs on every exit path.

pub mod state;
pub mod workspace;

pub use state::{PipelineState, StateMachine};
pub use workspace::Workspace;

use std::fs;
use std::path::{Path, PathBuf};

use crate::build::{BuildContext, BuildStep};
use crate::config::SiteConfig;
use crate::domain::{PipelineOutcome, ReleaseRequest, ResolvedRelease};
use crate::error::{ReleaseError, Result};
use crate::exec::CommandExecutor;
use crate::install::{self, InstallFinalizer};
use crate::repo::{RepositoryBackend, Revision, TagRequest};
use crate::ui::{self, Prompter};
use crate::validate::{default_message, ReleaseValidator};
use crate::warning::ReleaseWarning;

/// What a run did, handed to the reporting layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub outcome: PipelineOutcome,
    pub install_dir: Option<PathBuf>,
    /// Resolved release tag
    pub tag: Option<String>,
    /// One-line reason for a failed outcome
    pub diagnostic: Option<String>,
    pub kept_workspace: Option<PathBuf>,
    pub plan: Option<String>,
    pub states: Vec<PipelineState>,
    pub warnings: Vec<ReleaseWarning>,
}

impl PipelineReport {
    fn new() -> Self {
        PipelineReport {
            outcome: PipelineOutcome::Success,
            install_dir: None,
            tag: None,
            diagnostic: None,
            kept_workspace: None,
            plan: None,
            states: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Report for a run that failed before a pipeline could be set up.
    pub fn failed(error: &ReleaseError) -> Self {
        PipelineReport {
            outcome: error.outcome(),
            diagnostic: Some(error.to_string()),
            ..Self::new()
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

/// Drives a single release run. Owns the run's workspace.
pub struct Releaser<'a> {
    backend: &'a dyn RepositoryBackend,
    exec: &'a CommandExecutor,
    site: &'a SiteConfig,
    prompter: &'a dyn Prompter,
    build: BuildStep,
    machine: StateMachine,
    workspace: Workspace,
    warnings: Vec<ReleaseWarning>,
    quiet: bool,
}

impl<'a> Releaser<'a> {
    /// Set up a run; creates the workspace.
    pub fn new(
        backend: &'a dyn RepositoryBackend,
        exec: &'a CommandExecutor,
        site: &'a SiteConfig,
        prompter: &'a dyn Prompter,
        keep_temp: bool,
    ) -> Result<Self> {
        Ok(Releaser {
            backend,
            exec,
            site,
            prompter,
            build: BuildStep::new(&site.build),
            machine: StateMachine::new(),
            workspace: Workspace::create(keep_temp)?,
            warnings: Vec::new(),
            quiet: exec.mode().quiet,
        })
    }

    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    pub fn state(&self) -> PipelineState {
        self.machine.current()
    }

    /// Validate `request` and run it to completion, then clean up.
    ///
    /// Never fails: every error becomes the report's outcome and diagnostic.
    pub fn run(&mut self, request: &ReleaseRequest, cwd: &Path) -> PipelineReport {
        let mut report = PipelineReport::new();
        let result = self.drive(request, cwd, &mut report);
        let reached = self.machine.current();

        match self.cleanup() {
            Ok(kept) => report.kept_workspace = kept,
            Err(e) => log::warn!("workspace cleanup failed: {}", e),
        }
        if let Some(path) = &report.kept_workspace {
            self.warnings
                .push(ReleaseWarning::WorkspaceKept { path: path.clone() });
        }

        if let Err(e) = result {
            log::error!("release failed after reaching {}: {}", reached, e);
            report.outcome = e.outcome();
            report.diagnostic = Some(e.to_string());
        }
        report.states = self.machine.history().to_vec();
        report.warnings = std::mem::take(&mut self.warnings);
        report
    }

    fn drive(
        &mut self,
        request: &ReleaseRequest,
        cwd: &Path,
        report: &mut PipelineReport,
    ) -> Result<()> {
        let release = ReleaseValidator::new(self.backend, self.exec, self.site, self.prompter)
            .validate(request, cwd)?;
        self.machine.advance(PipelineState::Validated)?;

        report.tag = Some(release.version.to_string());
        report.install_dir = Some(release.install_dir.clone());

        let plan = ui::format_plan(&release, self.backend.kind());
        if !self.quiet || release.flags.dry_run {
            ui::display_plan(&plan);
        }
        report.plan = Some(plan);

        let flags = release.flags;
        if !flags.batch && !flags.dry_run {
            let question = if flags.is_removal() {
                format!("Remove release {} {}?", release.package, release.version)
            } else {
                format!("Release {} {}?", release.package, release.version)
            };
            if !self.prompter.confirm(&question)? {
                return Err(ReleaseError::Aborted("release plan declined".to_string()));
            }
        }

        if flags.is_removal() {
            if flags.removes_build() {
                self.machine.advance(PipelineState::RemovingBuild)?;
                self.remove_build(&release)?;
            }
            if flags.removes_tag() {
                self.machine.advance(PipelineState::RemovingTag)?;
                self.remove_tag(&release)?;
            }
            return Ok(());
        }

        if !flags.no_test_build {
            self.do_test_build(&release)?;
            self.machine.advance(PipelineState::TestBuilt)?;
        }
        if flags.creates_tag() {
            self.tag_release(&release)?;
            self.machine.advance(PipelineState::Tagged)?;
        }
        self.install_package(&release)?;
        self.machine.advance(PipelineState::Installed)?;
        Ok(())
    }

    /// Check out and build the release in the workspace, then discard it.
    pub fn do_test_build(&mut self, release: &ResolvedRelease) -> Result<()> {
        self.status(&format!("Test build of {} {}", release.package, release.version));
        let target = self.workspace.path().join("build").join(release.package.leaf());
        let revision = if !release.flags.creates_tag()
            && self.backend.tag_exists(self.exec, &release.package, &release.version)?
        {
            Revision::tag(&release.package, &release.version)
        } else {
            Revision::branch(&release.package, &release.branch)
        };

        let result = self.checkout_and_build(
            &target,
            &revision,
            &BuildContext::test_build(&release.package, &release.version),
        );
        if let Err(e) = install::remove_tree(&target) {
            log::warn!("cannot remove test build {}: {}", target.display(), e);
        }
        result?;
        self.success(&format!("{} builds", revision.label()));
        Ok(())
    }

    /// Create the release tag.
    pub fn tag_release(&mut self, release: &ResolvedRelease) -> Result<()> {
        self.status(&format!("Tagging {}", release.tag_location));
        let request = TagRequest {
            package: release.package.clone(),
            version: release.version.clone(),
            branch: release.branch.clone(),
            message: release
                .message
                .clone()
                .unwrap_or_else(|| default_message(&release.package, &release.version)),
            sandbox: self.workspace.path().join("tag"),
        };
        self.backend.tag_release(self.exec, &request)?;

        if self.exec.is_dry_run() {
            self.warnings.push(ReleaseWarning::TagAssumed {
                tag: release.version.to_string(),
            });
        } else {
            self.success(&format!("Tagged {}", release.tag_location));
        }
        Ok(())
    }

    /// Build the release directly into its install directory and finalize it.
    pub fn install_package(&mut self, release: &ResolvedRelease) -> Result<()> {
        let dir = &release.install_dir;
        self.status(&format!("Installing into {}", dir.display()));

        let tagged = release.flags.creates_tag()
            || self.backend.tag_exists(self.exec, &release.package, &release.version)?;
        let revision = if tagged {
            Revision::tag(&release.package, &release.version)
        } else {
            log::warn!(
                "{} is not tagged, installing from branch {}",
                release.version,
                release.branch
            );
            Revision::branch(&release.package, &release.branch)
        };

        if !self.exec.is_dry_run() {
            if dir.exists() {
                // A previous attempt left a read-only tree behind.
                install::make_writable(dir).map_err(|e| {
                    ReleaseError::build(format!("cannot reopen {}: {}", dir.display(), e), "")
                })?;
            } else if let Some(parent) = dir.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    ReleaseError::build(
                        format!("cannot create install location {}: {}", parent.display(), e),
                        "",
                    )
                })?;
            }
        }

        self.checkout_and_build(
            dir,
            &revision,
            &BuildContext::install(&release.package, &release.version, dir.clone()),
        )?;

        let warnings = InstallFinalizer::new(&self.site.site, self.exec).finalize(dir)?;
        self.warnings.extend(warnings);
        if !self.exec.is_dry_run() {
            self.success(&format!("Installed {} {}", release.package, release.version));
        }
        Ok(())
    }

    /// Delete an installed release.
    pub fn remove_build(&mut self, release: &ResolvedRelease) -> Result<()> {
        let dir = &release.install_dir;
        if !dir.exists() {
            return Err(ReleaseError::build(
                format!("install directory {} does not exist", dir.display()),
                "",
            ));
        }
        if self.exec.is_dry_run() {
            ui::display_command(&format!("rm -rf {}", dir.display()), true);
            return Ok(());
        }

        self.status(&format!("Removing {}", dir.display()));
        install::remove_tree(dir).map_err(|e| {
            ReleaseError::build(format!("cannot remove {}: {}", dir.display(), e), "")
        })?;
        self.success(&format!("Removed {}", dir.display()));
        Ok(())
    }

    /// Delete the release tag.
    pub fn remove_tag(&mut self, release: &ResolvedRelease) -> Result<()> {
        self.status(&format!("Removing tag {}", release.tag_location));
        let request = TagRequest {
            package: release.package.clone(),
            version: release.version.clone(),
            branch: release.branch.clone(),
            message: format!("Removing release {} {}", release.package, release.version),
            sandbox: self.workspace.path().join("untag"),
        };
        self.backend.remove_tag(self.exec, &request)?;
        if !self.exec.is_dry_run() {
            self.success(&format!("Removed tag {}", release.tag_location));
        }
        Ok(())
    }

    /// Tear down the workspace. Safe to call any number of times.
    ///
    /// # Returns
    /// * `Ok(Some(path))` - The workspace was kept (`--keep-temp`)
    /// * `Ok(None)` - The workspace no longer exists
    pub fn cleanup(&mut self) -> Result<Option<PathBuf>> {
        self.machine.finish();
        self.workspace.teardown()
    }

    fn checkout_and_build(
        &mut self,
        target: &Path,
        revision: &Revision,
        context: &BuildContext,
    ) -> Result<()> {
        let warnings = self.backend.checkout_release(self.exec, target, revision)?;
        for warning in &warnings {
            log::warn!("{}", warning);
        }
        self.warnings.extend(warnings);
        self.build.run(self.exec, target, context)
    }

    fn status(&self, message: &str) {
        if !self.quiet {
            ui::display_status(message);
        }
    }

    fn success(&self, message: &str) {
        if !self.quiet {
            ui::display_success(message);
        }
    }
}
