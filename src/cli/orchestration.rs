//! Main workflow orchestration logic
//!
//! Binds a repository backend, sets up a [`Releaser`] and runs it. It sits
//! between CLI argument parsing in `main.rs` and the pipeline, so the
//! workflow can be called programmatically without depending on clap.

use std::path::{Path, PathBuf};

use crate::config::SiteConfig;
use crate::domain::{Package, ReleaseFlags, ReleaseRequest};
use crate::error::{ReleaseError, Result};
use crate::exec::{CommandExecutor, ExecMode};
use crate::pipeline::{PipelineReport, Releaser};
use crate::repo::{Backend, RepositoryBackend};
use crate::ui::Prompter;

/// Arguments for the release workflow
///
/// Mirrors the CLI Args but in a format suitable for orchestration logic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseWorkflowArgs {
    /// Package to release; derived from the working directory when absent
    pub package: Option<String>,

    /// Release version, e.g. R1.2.3-0.1.0
    pub release: Option<String>,

    /// Branch to release from
    pub branch: Option<String>,

    /// Release (tag) message
    pub message: Option<String>,

    /// Install directory override
    pub install_dir: Option<PathBuf>,

    pub flags: ReleaseFlags,
}

impl ReleaseWorkflowArgs {
    pub fn to_request(&self) -> ReleaseRequest {
        ReleaseRequest {
            package: self.package.clone(),
            version: self.release.clone(),
            branch: self.branch.clone(),
            message: self.message.clone(),
            install_dir: self.install_dir.clone(),
            flags: self.flags,
        }
    }

    pub fn exec_mode(&self) -> ExecMode {
        ExecMode {
            dry_run: self.flags.dry_run,
            verbose: self.flags.verbose,
            quiet: self.flags.quiet,
        }
    }
}

/// Main release workflow, running real commands.
///
/// # Arguments
///
/// * `args` - Workflow arguments (package, release, overrides, flags)
/// * `site` - Site configuration
/// * `cwd` - Directory whose checkout supplies defaults
/// * `prompter` - Answers interactive questions
///
/// # Returns
///
/// The run's report; failures are carried in its outcome
pub fn run_release_workflow(
    args: &ReleaseWorkflowArgs,
    site: &SiteConfig,
    cwd: &Path,
    prompter: &dyn Prompter,
) -> PipelineReport {
    let exec = CommandExecutor::system(args.exec_mode());
    run_with_executor(args, site, cwd, prompter, &exec)
}

/// Like [`run_release_workflow`], with the executor supplied by the caller.
pub fn run_with_executor(
    args: &ReleaseWorkflowArgs,
    site: &SiteConfig,
    cwd: &Path,
    prompter: &dyn Prompter,
    exec: &CommandExecutor,
) -> PipelineReport {
    match resolve_backend(exec, site, cwd, args.package.as_deref()) {
        Ok(backend) => run_with_backend(args, site, cwd, prompter, exec, &backend),
        Err(e) => PipelineReport::failed(&e),
    }
}

/// Run the pipeline against an already bound backend.
pub fn run_with_backend(
    args: &ReleaseWorkflowArgs,
    site: &SiteConfig,
    cwd: &Path,
    prompter: &dyn Prompter,
    exec: &CommandExecutor,
    backend: &dyn RepositoryBackend,
) -> PipelineReport {
    let mut releaser = match Releaser::new(backend, exec, site, prompter, args.flags.keep_temp) {
        Ok(releaser) => releaser,
        Err(e) => return PipelineReport::failed(&e),
    };
    releaser.run(&args.to_request(), cwd)
}

/// Pick the backend for this run.
///
/// The checkout in `cwd` wins when it belongs to `package` (or when no
/// package was named); otherwise the configured repository roots are searched.
pub fn resolve_backend(
    exec: &CommandExecutor,
    site: &SiteConfig,
    cwd: &Path,
    package: Option<&str>,
) -> Result<Backend> {
    let discovered = Backend::discover(exec, site, cwd)?;

    let Some(name) = package else {
        return discovered.ok_or_else(|| {
            ReleaseError::validation(format!(
                "{} is not a git, svn or cvs checkout; pass --package",
                cwd.display()
            ))
        });
    };
    let package = Package::parse(name)?;

    if let Some(backend) = discovered {
        let context = backend.working_context(exec, cwd)?;
        if backend
            .package_candidates(&context)
            .iter()
            .any(|candidate| candidate == package.as_str())
        {
            log::debug!("using the {} checkout in {}", backend.kind(), cwd.display());
            return Ok(backend);
        }
    }

    Backend::for_package(exec, site, &package)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_request_carries_everything() {
        let args = ReleaseWorkflowArgs {
            package: Some("modules/asyn".to_string()),
            release: Some("R4.31-0.1.0".to_string()),
            branch: Some("master".to_string()),
            message: Some("msg".to_string()),
            install_dir: Some(PathBuf::from("/tmp/asyn")),
            flags: ReleaseFlags {
                dry_run: true,
                verbose: true,
                ..Default::default()
            },
        };

        let request = args.to_request();
        assert_eq!(request.package.as_deref(), Some("modules/asyn"));
        assert_eq!(request.version.as_deref(), Some("R4.31-0.1.0"));
        assert_eq!(request.install_dir, Some(PathBuf::from("/tmp/asyn")));
        assert!(request.flags.dry_run);

        let mode = args.exec_mode();
        assert!(mode.dry_run && mode.verbose && !mode.quiet);
    }
}
