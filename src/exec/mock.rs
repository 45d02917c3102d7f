use std::io;
use std::sync::{Arc, Mutex};

use crate::exec::{Cmd, CmdOutput, CommandRunner};

#[derive(Default)]
struct MockState {
    responses: Vec<(String, CmdOutput)>,
    executed: Vec<Cmd>,
}

/// Command runner for tests: records every command it is asked to run and
/// answers from a list of prefix rules.
///
/// Clones share state, so a test can keep one handle while the executor owns
/// another. Commands without a matching rule succeed with empty output.
#[derive(Clone, Default)]
pub struct MockRunner {
    state: Arc<Mutex<MockState>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands whose command line starts with `prefix`.
    ///
    /// Later rules take precedence over earlier ones.
    pub fn respond(&self, prefix: impl Into<String>, output: CmdOutput) {
        if let Ok(mut state) = self.state.lock() {
            state.responses.push((prefix.into(), output));
        }
    }

    /// Command lines of everything executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed_commands()
            .iter()
            .map(|cmd| cmd.command_line())
            .collect()
    }

    pub fn executed_commands(&self) -> Vec<Cmd> {
        self.state
            .lock()
            .map(|state| state.executed.clone())
            .unwrap_or_default()
    }
}

impl CommandRunner for MockRunner {
    fn execute(&self, cmd: &Cmd, _capture: bool) -> io::Result<CmdOutput> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "mock runner poisoned"))?;
        state.executed.push(cmd.clone());

        let line = cmd.command_line();
        let output = state
            .responses
            .iter()
            .rev()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CmdOutput::ok(""));
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_runner_records_commands() {
        let runner = MockRunner::new();
        runner
            .execute(&Cmd::new("git").args(["fetch", "origin"]), true)
            .unwrap();
        assert_eq!(runner.executed(), vec!["git fetch origin".to_string()]);
    }

    #[test]
    fn test_mock_runner_latest_rule_wins() {
        let runner = MockRunner::new();
        runner.respond("svn", CmdOutput::ok("first"));
        runner.respond("svn ls", CmdOutput::failed(1, "missing"));

        let ls = runner.execute(&Cmd::new("svn").arg("ls"), true).unwrap();
        assert!(!ls.success());

        let info = runner.execute(&Cmd::new("svn").arg("info"), true).unwrap();
        assert_eq!(info.stdout, "first");
    }

    #[test]
    fn test_mock_runner_default_success() {
        let runner = MockRunner::default();
        let output = runner.execute(&Cmd::new("make"), false).unwrap();
        assert!(output.success());
        assert!(output.stdout.is_empty());
    }
}
