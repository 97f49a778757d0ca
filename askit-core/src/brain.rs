//! Brain — the seam between askit and the language model.
//!
//! Providers only move text: [`LlmProvider::query`] sends one user prompt
//! (with the fixed [`SYSTEM_PROMPT`] attached) and returns the raw reply.
//! [`get_suggestion`] wraps that call with prompt composition and response
//! parsing, and never fails: provider errors come back as `LOW` suggestions.

use crate::error::ProviderError;
use crate::response::parse_response;
use crate::types::{Confidence, Suggestion};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, warn};

/// The model contract. `response` and `plan` parse exactly this grammar.
pub const SYSTEM_PROMPT: &str = r#"You are AskIT, a command-line assistant. The user describes a task in natural language and you answer with a shell command.

Always respond with exactly three labeled fields, each starting at the beginning of a line:

CONFIDENCE: <HIGH|MEDIUM|LOW|NONE|AGENT>
COMMAND: <a single shell command, or empty>
EXPLANATION: <a short explanation; may span several lines>

Use HIGH when the command certainly does what was asked, MEDIUM when it probably does, LOW when you are guessing, and NONE when no command applies.

Use AGENT when the task needs several steps. Leave COMMAND empty and describe the plan in EXPLANATION:
- put shell commands in fenced ```bash blocks, one command per line;
- to create a file, write a line `FILE: <path>` immediately followed by a fenced code block holding the complete file content;
- when you need a value from the user, write {{USER_INPUT:<question>}} wherever that value is used."#;

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one prompt and return the raw model text.
    async fn query(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Return the model name.
    fn model_name(&self) -> &str;
}

/// Compose the user prompt sent to the model.
pub fn prepare_prompt(prompt: &str, context: &str) -> String {
    format!("Context:\n{context}\n\nUser Prompt: {prompt}")
}

/// Ask the provider for a suggestion.
///
/// Errors are folded into `(LOW, "", "Error: <message>")`.
pub async fn get_suggestion(provider: &dyn LlmProvider, prompt: &str, context: &str) -> Suggestion {
    let full_prompt = prepare_prompt(prompt, context);
    debug!(
        model = provider.model_name(),
        prompt_len = full_prompt.len(),
        "Requesting suggestion"
    );

    match provider.query(&full_prompt).await {
        Ok(raw) => {
            let parsed = parse_response(&raw);
            if !parsed.is_labeled() {
                debug!(reply_len = raw.len(), "Model reply had no labeled fields");
            }
            parsed.into_suggestion()
        }
        Err(e) => {
            warn!(error = %e, "Provider request failed");
            Suggestion::new(Confidence::Low, "", format!("Error: {e}"))
        }
    }
}

/// A mock LLM provider for testing and development.
///
/// Returns queued raw replies in order and records every prompt it receives.
/// An empty queue answers with a transport error.
pub struct MockLlmProvider {
    model: String,
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider whose first reply is `text`.
    pub fn with_response(text: &str) -> Self {
        let provider = Self::new();
        provider.queue_response(text);
        provider
    }

    /// Queue a raw reply for the next `query` call.
    pub fn queue_response(&self, text: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
    }

    /// Queue a canonical labeled reply.
    pub fn queue_suggestion(&self, suggestion: &Suggestion) {
        self.queue_response(&crate::response::format_suggestion(suggestion));
    }

    /// Queue an error for the next `query` call.
    pub fn queue_error(&self, error: ProviderError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockLlmProvider {
    async fn query(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProviderError::Connection {
                    message: "no mock response queued".to_string(),
                })
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prepare_prompt_layout() {
        assert_eq!(
            prepare_prompt("list files", " 1. git status"),
            "Context:\n 1. git status\n\nUser Prompt: list files"
        );
    }

    #[test]
    fn test_system_prompt_names_every_marker() {
        for marker in [
            "CONFIDENCE:",
            "COMMAND:",
            "EXPLANATION:",
            "```bash",
            "FILE: <path>",
            "{{USER_INPUT:<question>}}",
        ] {
            assert!(SYSTEM_PROMPT.contains(marker), "missing {marker}");
        }
    }

    #[tokio::test]
    async fn test_get_suggestion_parses_reply() {
        let provider =
            MockLlmProvider::with_response("CONFIDENCE: HIGH\nCOMMAND: df -h\nEXPLANATION: Disk usage.");
        let s = get_suggestion(&provider, "disk space", "ctx").await;
        assert_eq!(s, Suggestion::new(Confidence::High, "df -h", "Disk usage."));
        assert_eq!(
            provider.prompts(),
            vec!["Context:\nctx\n\nUser Prompt: disk space".to_string()]
        );
    }

    #[tokio::test]
    async fn test_get_suggestion_folds_errors_into_low() {
        let provider = MockLlmProvider::new();
        provider.queue_error(ProviderError::Timeout { timeout_secs: 30 });
        let s = get_suggestion(&provider, "anything", "").await;
        assert_eq!(s.confidence, Confidence::Low);
        assert_eq!(s.command, "");
        assert_eq!(s.explanation, "Error: Request timed out after 30s");
    }

    #[tokio::test]
    async fn test_mock_without_responses_errors() {
        let provider = MockLlmProvider::new();
        assert!(provider.query("hi").await.is_err());
    }
}
