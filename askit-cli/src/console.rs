//! Terminal rendering of agent events and interactive prompts.

use askit_core::agent::{AgentCallback, AgentPhase, MessageLevel};
use askit_core::error::AgentError;
use askit_core::types::{Confidence, Step, Suggestion};
use dialoguer::{Confirm, Input};
use std::io::{self, Write};
use tracing::debug;

pub(crate) const RESET: &str = "\x1b[0m";
pub(crate) const BOLD: &str = "\x1b[1m";
pub(crate) const DIM: &str = "\x1b[90m";
pub(crate) const RED: &str = "\x1b[31m";
pub(crate) const GREEN: &str = "\x1b[32m";
pub(crate) const YELLOW: &str = "\x1b[33m";
pub(crate) const CYAN: &str = "\x1b[36m";

/// Prefix and colour for one message level.
fn decoration(level: MessageLevel) -> (&'static str, &'static str) {
    match level {
        MessageLevel::Info => (CYAN, "▶ "),
        MessageLevel::Detail => (DIM, "  "),
        MessageLevel::Success => (GREEN, "✓ "),
        MessageLevel::Warning => (YELLOW, "⚠ "),
        MessageLevel::Error => (RED, "✗ "),
    }
}

pub(crate) fn render_message(level: MessageLevel, message: &str) -> String {
    let (colour, prefix) = decoration(level);
    format!("{colour}{prefix}{message}{RESET}")
}

fn confidence_colour(confidence: Confidence) -> &'static str {
    match confidence {
        Confidence::High => GREEN,
        Confidence::Medium | Confidence::Agent => YELLOW,
        Confidence::Low | Confidence::None => RED,
    }
}

/// The plain display of a suggestion.
pub(crate) fn render_suggestion(suggestion: &Suggestion) -> String {
    let mut out = format!(
        "\n{BOLD}Confidence:{RESET} {}{}{RESET}\n",
        confidence_colour(suggestion.confidence),
        suggestion.confidence
    );
    if !suggestion.command.is_empty() {
        out.push_str(&format!("{BOLD}Command:{RESET}    {CYAN}{}{RESET}\n", suggestion.command));
    }
    if !suggestion.explanation.is_empty() {
        out.push_str(&format!("{BOLD}Explanation:{RESET}\n{}\n", suggestion.explanation));
    }
    out
}

/// Console implementation of the agent callback.
pub(crate) struct ConsoleCallback {
    quiet: bool,
}

impl ConsoleCallback {
    pub(crate) fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

#[async_trait::async_trait]
impl AgentCallback for ConsoleCallback {
    async fn on_message(&self, level: MessageLevel, message: &str) {
        if self.quiet && level == MessageLevel::Detail {
            return;
        }
        match level {
            MessageLevel::Error | MessageLevel::Warning => {
                eprintln!("{}", render_message(level, message))
            }
            _ => println!("{}", render_message(level, message)),
        }
    }

    async fn on_output_line(&self, line: &str) {
        println!("  {line}");
        let _ = io::stdout().flush();
    }

    async fn ask_input(&self, question: &str) -> Result<String, AgentError> {
        let question = question.to_string();
        tokio::task::spawn_blocking(move || {
            Input::<String>::new()
                .with_prompt(question)
                .allow_empty(true)
                .interact_text()
        })
        .await
        .map_err(|_| AgentError::Cancelled)?
        .map_err(|e| {
            debug!(error = %e, "Input prompt aborted");
            AgentError::Cancelled
        })
    }

    async fn confirm(&self, question: &str, default: bool) -> Result<bool, AgentError> {
        let question = question.to_string();
        tokio::task::spawn_blocking(move || {
            Confirm::new()
                .with_prompt(question)
                .default(default)
                .interact()
        })
        .await
        .map_err(|_| AgentError::Cancelled)?
        .map_err(|e| {
            debug!(error = %e, "Confirmation prompt aborted");
            AgentError::Cancelled
        })
    }

    async fn on_phase_change(&self, phase: AgentPhase) {
        debug!(%phase, "Agent phase");
    }

    async fn on_step_start(&self, step: &Step) {
        // Shell steps are already announced by the executor.
        if !self.quiet && matches!(step, Step::File { .. }) {
            println!("{DIM}  {step}{RESET}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_message_prefixes() {
        assert_eq!(
            render_message(MessageLevel::Success, "done"),
            format!("{GREEN}✓ done{RESET}")
        );
        assert!(render_message(MessageLevel::Error, "boom").contains("✗ boom"));
    }

    #[test]
    fn test_render_suggestion_skips_empty_fields() {
        let text = render_suggestion(&Suggestion::new(Confidence::None, "", "Nothing to run."));
        assert!(text.contains("NONE"));
        assert!(!text.contains("Command:"));
        assert!(text.contains("Nothing to run."));
    }

    #[test]
    fn test_render_suggestion_shows_command() {
        let text = render_suggestion(&Suggestion::new(Confidence::High, "df -h", ""));
        assert!(text.contains("df -h"));
        assert!(!text.contains("Explanation:"));
    }
}
