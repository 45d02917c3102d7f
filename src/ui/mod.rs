//! User interface module - interaction (prompts) and formatting.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - The [`Prompter`] capability and its implementations
//!
//! Validation and the pipeline never read stdin directly; they ask a
//! `Prompter`, so they can run in batch mode and under test.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use crate::error::{ReleaseError, Result};

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_command, display_error, display_plan, display_report, display_status,
    display_success, display_warning, format_plan,
};

/// Interactive questions asked during validation and before running the pipeline.
pub trait Prompter {
    /// Ask a yes/no question.
    fn confirm(&self, question: &str) -> Result<bool>;

    /// Read a possibly multi-line message, terminated by end of input.
    fn read_message(&self, prompt: &str) -> Result<String>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    /// Accepts "y" or "yes" (case-insensitive); anything else, including Enter, is "no".
    fn confirm(&self, question: &str) -> Result<bool> {
        print!("\n{} (y/N): ", question);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        let response = input.trim().to_lowercase();
        Ok(response == "y" || response == "yes")
    }

    fn read_message(&self, prompt: &str) -> Result<String> {
        println!("\n{} (finish with Ctrl-D on an empty line):", prompt);
        io::stdout().flush()?;

        let mut lines = Vec::new();
        for line in io::stdin().lock().lines() {
            lines.push(line?);
        }
        Ok(lines.join("\n"))
    }
}

/// Non-interactive answers for `--batch` runs.
///
/// Confirmations are accepted; a message cannot be invented, so asking for
/// one fails immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchPrompter;

impl Prompter for BatchPrompter {
    fn confirm(&self, question: &str) -> Result<bool> {
        log::info!("batch mode, assuming yes: {}", question);
        Ok(true)
    }

    fn read_message(&self, _prompt: &str) -> Result<String> {
        Err(ReleaseError::validation(
            "a release message is required in batch mode; pass --message or --no-msg",
        ))
    }
}

/// Prompter with scripted answers, for tests and embedding.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<bool>>,
    message: Option<String>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue answers for successive `confirm` calls. Unanswered questions get "no".
    pub fn with_answers(mut self, answers: &[bool]) -> Self {
        self.answers = Mutex::new(answers.iter().copied().collect());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Every question and message prompt seen so far.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }

    fn record(&self, prompt: &str) {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(prompt.to_string());
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, question: &str) -> Result<bool> {
        self.record(question);
        Ok(self
            .answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .unwrap_or(false))
    }

    fn read_message(&self, prompt: &str) -> Result<String> {
        self.record(prompt);
        Ok(self.message.clone().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_prompter_confirms() {
        assert!(BatchPrompter.confirm("Proceed?").unwrap());
    }

    #[test]
    fn test_batch_prompter_fails_fast_on_message() {
        let err = BatchPrompter.read_message("Release message").unwrap_err();
        assert!(matches!(err, ReleaseError::Validation { .. }));
        assert!(err.to_string().contains("--message"));
    }

    #[test]
    fn test_scripted_prompter_answers_in_order() {
        let prompter = ScriptedPrompter::new().with_answers(&[true, false]);
        assert!(prompter.confirm("first").unwrap());
        assert!(!prompter.confirm("second").unwrap());
        assert!(!prompter.confirm("unscripted").unwrap());
        assert_eq!(prompter.asked(), vec!["first", "second", "unscripted"]);
    }

    #[test]
    fn test_scripted_prompter_message() {
        let prompter = ScriptedPrompter::new().with_message("Fix IOC startup");
        assert_eq!(prompter.read_message("msg").unwrap(), "Fix IOC startup");
        assert_eq!(prompter.asked().len(), 1);
    }
}
