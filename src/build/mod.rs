//! The opaque build step
//!
//! A release is built by running the site's configured build command inside
//! the checkout directory. Only its exit status matters:
//! - exit code 0: the build succeeded
//! - anything else: [`ReleaseError::Build`] carrying the captured output

pub mod context;

pub use context::{BuildContext, BuildPhase};

use std::path::Path;

use crate::config::BuildSettings;
use crate::error::{ReleaseError, Result};
use crate::exec::{Cmd, CommandExecutor};

/// Runs the configured build command
pub struct BuildStep {
    command: Vec<String>,
}

impl BuildStep {
    pub fn new(settings: &BuildSettings) -> Self {
        BuildStep {
            command: settings.command.clone(),
        }
    }

    /// Run the build in `dir` with environment variables set from the context.
    ///
    /// # Arguments
    /// * `exec` - Executor the build command is run through
    /// * `dir` - Checkout directory to build in
    /// * `context` - Build context exported to the command's environment
    ///
    /// # Returns
    /// * `Ok(())` if the build exits with code 0 (or is skipped by dry-run)
    /// * `Err(ReleaseError::Build)` for any other exit, or if it cannot start
    pub fn run(&self, exec: &CommandExecutor, dir: &Path, context: &BuildContext) -> Result<()> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| ReleaseError::config("build command is empty"))?;

        let mut cmd = Cmd::new(program).args(args).current_dir(dir);
        let mut env: Vec<_> = context.to_env_vars().into_iter().collect();
        env.sort();
        for (key, value) in env {
            cmd = cmd.env(key, value);
        }

        match exec.run(&cmd, true) {
            Ok(output) => {
                if !output.trim().is_empty() {
                    log::debug!("build output:\n{}", output.trim_end());
                }
                Ok(())
            }
            Err(ReleaseError::CommandFailed {
                command,
                stdout,
                stderr,
                exit_code,
            }) => {
                let status = exit_code
                    .map(|code| format!("exit code {}", code))
                    .unwrap_or_else(|| stderr.clone());
                let output = [stdout.trim_end(), stderr.trim_end()]
                    .iter()
                    .filter(|part| !part.is_empty())
                    .copied()
                    .collect::<Vec<_>>()
                    .join("\n");
                Err(ReleaseError::build(
                    format!(
                        "{} of {} failed: `{}` in {} ({})",
                        context.phase.name(),
                        context.package,
                        command,
                        dir.display(),
                        status
                    ),
                    output,
                ))
            }
            Err(other) => Err(other),
        }
    }
}
