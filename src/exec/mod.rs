//! External command execution
//!
//! Every external program (VCS clients, the build step, `chgrp`, `id`) is run
//! through a [`CommandExecutor`], so dry-run, verbose and quiet behave the same
//! everywhere. The executor delegates the actual process handling to a
//! [`CommandRunner`]:
//!
//! - [`SystemRunner`]: spawns real processes with `std::process`
//! - [`mock::MockRunner`]: records commands and returns scripted results

pub mod executor;
pub mod mock;

pub use executor::{CommandExecutor, ExecMode, DRY_RUN_OUTPUT};
pub use mock::MockRunner;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use crate::interrupt::ChildGuard;

/// A single external command invocation.
///
/// Commands are treated as mutating unless marked with [`Cmd::read_only`];
/// dry-run only ever skips mutating commands.
#[derive(Debug, Clone, PartialEq)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    mutating: bool,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Cmd {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            mutating: true,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn path_arg(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    /// Run the command inside `dir` instead of the process working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Mark the command as pure inspection; it runs even in dry-run mode.
    pub fn read_only(mut self) -> Self {
        self.mutating = false;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn environment(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn is_mutating(&self) -> bool {
        self.mutating
    }

    /// Shell-like rendering for logs and error messages.
    pub fn command_line(&self) -> String {
        let mut line = quote(&self.program);
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote(arg));
        }
        line
    }
}

fn quote(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@+,%^{}".contains(c))
    {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())?;
        if let Some(dir) = &self.cwd {
            write!(f, " (in {})", dir.display())?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CmdOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Signal that killed the process, if any.
    pub signal: Option<i32>,
}

/// SIGINT, delivered to children along with this process on Ctrl-C.
const SIGINT: i32 = 2;

impl CmdOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        CmdOutput {
            stdout: stdout.into(),
            stderr: String::new(),
            code: Some(0),
            signal: None,
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        CmdOutput {
            stdout: String::new(),
            stderr: stderr.into(),
            code: Some(code),
            signal: None,
        }
    }

    /// Output of a process killed by `signal`.
    pub fn killed(signal: i32) -> Self {
        CmdOutput {
            signal: Some(signal),
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Whether the process died from an operator interrupt.
    pub fn interrupted(&self) -> bool {
        self.signal == Some(SIGINT)
    }
}

/// Spawns a command and waits for it.
pub trait CommandRunner: Send + Sync {
    /// Run `cmd` to completion.
    ///
    /// When `capture` is false, stdout and stderr are inherited from this
    /// process and the returned output strings are empty.
    fn execute(&self, cmd: &Cmd, capture: bool) -> io::Result<CmdOutput>;
}

/// Runs real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn execute(&self, cmd: &Cmd, capture: bool) -> io::Result<CmdOutput> {
        let mut command = Command::new(cmd.program());
        command.args(cmd.arguments()).stdin(Stdio::null());
        if let Some(dir) = cmd.working_dir() {
            command.current_dir(dir);
        }
        for (key, value) in cmd.environment() {
            command.env(key, value);
        }

        let _running = ChildGuard::enter();
        if capture {
            let output = command.output()?;
            Ok(CmdOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                code: output.status.code(),
                signal: exit_signal(&output.status),
            })
        } else {
            let status = command.status()?;
            Ok(CmdOutput {
                code: status.code(),
                signal: exit_signal(&status),
                ..CmdOutput::default()
            })
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_quoting() {
        let cmd = Cmd::new("git")
            .args(["tag", "-a", "R1.0.0", "-m"])
            .arg("first release's notes");
        assert_eq!(
            cmd.command_line(),
            r"git tag -a R1.0.0 -m 'first release'\''s notes'"
        );
    }

    #[test]
    fn test_commands_mutate_by_default() {
        assert!(Cmd::new("svn").arg("cp").is_mutating());
        assert!(!Cmd::new("svn").arg("info").read_only().is_mutating());
    }

    #[test]
    fn test_display_includes_working_dir() {
        let cmd = Cmd::new("make").current_dir("/tmp/build");
        assert_eq!(cmd.to_string(), "make (in /tmp/build)");
    }

    #[test]
    fn test_system_runner_captures_output() {
        let output = SystemRunner
            .execute(&Cmd::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]), true)
            .unwrap();
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert_eq!(output.code, Some(3));
        assert!(!output.success());
    }

    #[test]
    fn test_system_runner_missing_program() {
        let result = SystemRunner.execute(&Cmd::new("/nonexistent/pkg-release-tool"), true);
        assert!(result.is_err());
    }
}
