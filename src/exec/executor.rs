use crate::error::{ReleaseError, Result};
use crate::exec::{Cmd, CmdOutput, CommandRunner, SystemRunner};
use crate::interrupt;
use crate::ui;

/// Returned by [`CommandExecutor::run`] in place of the output of a skipped command.
pub const DRY_RUN_OUTPUT: &str = "";

/// How commands are reported and whether mutating ones run at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecMode {
    pub dry_run: bool,
    pub verbose: bool,
    pub quiet: bool,
}

/// Runs external commands with uniform dry-run, logging and failure handling.
pub struct CommandExecutor {
    runner: Box<dyn CommandRunner>,
    mode: ExecMode,
}

impl CommandExecutor {
    /// Executor backed by real processes.
    pub fn system(mode: ExecMode) -> Self {
        Self::with_runner(Box::new(SystemRunner), mode)
    }

    pub fn with_runner(runner: Box<dyn CommandRunner>, mode: ExecMode) -> Self {
        CommandExecutor { runner, mode }
    }

    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    pub fn is_dry_run(&self) -> bool {
        self.mode.dry_run
    }

    /// Run a command and return its stdout.
    ///
    /// In dry-run mode mutating commands are only reported, and
    /// [`DRY_RUN_OUTPUT`] is returned. Read-only commands always run.
    ///
    /// # Arguments
    /// * `cmd` - The command to run
    /// * `capture` - Capture stdout/stderr instead of passing them through
    ///
    /// # Returns
    /// * `Ok(String)` - Captured stdout (empty when not captured)
    /// * `Err(ReleaseError::CommandFailed)` - Spawn failure or non-zero exit
    /// * `Err(ReleaseError::Interrupted)` - The operator interrupted the command
    pub fn run(&self, cmd: &Cmd, capture: bool) -> Result<String> {
        if self.skips(cmd) {
            return Ok(DRY_RUN_OUTPUT.to_string());
        }

        let output = self.spawn(cmd, capture)?;
        if !output.success() {
            return Err(command_failed(cmd, output));
        }
        Ok(output.stdout)
    }

    /// Run a read-only command, mapping a non-zero exit to `None`.
    pub fn query(&self, cmd: &Cmd) -> Result<Option<String>> {
        let cmd = cmd.clone().read_only();
        if self.skips(&cmd) {
            return Ok(None);
        }
        let output = self.spawn(&cmd, true)?;
        Ok(output.success().then_some(output.stdout))
    }

    /// Run a read-only command and report whether it succeeded.
    pub fn probe(&self, cmd: &Cmd) -> Result<bool> {
        Ok(self.query(cmd)?.is_some())
    }

    /// Decide whether `cmd` is skipped, reporting it either way.
    fn skips(&self, cmd: &Cmd) -> bool {
        if !self.mode.dry_run {
            if self.mode.verbose {
                ui::display_command(&cmd.to_string(), false);
            }
            log::debug!("running: {}", cmd);
            return false;
        }

        // A missing working directory can only come from a skipped mutation.
        let missing_dir = cmd.working_dir().is_some_and(|dir| !dir.exists());
        if cmd.is_mutating() || missing_dir {
            ui::display_command(&cmd.to_string(), true);
            log::info!("dry-run, skipping: {}", cmd);
            return true;
        }

        if self.mode.verbose {
            ui::display_command(&cmd.to_string(), false);
        }
        log::debug!("dry-run, running read-only: {}", cmd);
        false
    }

    fn spawn(&self, cmd: &Cmd, capture: bool) -> Result<CmdOutput> {
        let result = self.runner.execute(cmd, capture);
        if interrupt::is_interrupted() {
            return Err(ReleaseError::Interrupted);
        }
        let output = result.map_err(|e| ReleaseError::CommandFailed {
            command: cmd.command_line(),
            stdout: String::new(),
            stderr: format!("failed to start: {}", e),
            exit_code: None,
        })?;
        if output.interrupted() {
            log::warn!("{} was interrupted", cmd);
            return Err(ReleaseError::Interrupted);
        }

        if self.mode.verbose && !self.mode.quiet && capture {
            if !output.stdout.trim().is_empty() {
                log::debug!("stdout: {}", output.stdout.trim_end());
            }
            if !output.stderr.trim().is_empty() {
                log::debug!("stderr: {}", output.stderr.trim_end());
            }
        }
        Ok(output)
    }
}

fn command_failed(cmd: &Cmd, output: CmdOutput) -> ReleaseError {
    ReleaseError::CommandFailed {
        command: cmd.command_line(),
        stdout: output.stdout,
        stderr: output.stderr,
        exit_code: output.code,
    }
}
