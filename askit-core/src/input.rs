//! Interactive input collection for agent plans.
//!
//! Finds every `{{USER_INPUT:<question>}}` token in an explanation, asks the
//! user each unique question once (in first-seen order), and substitutes
//! the answer at every occurrence.

use crate::agent::{AgentCallback, MessageLevel};
use crate::error::AgentError;
use crate::types::Placeholder;
use tracing::debug;

const PLACEHOLDER_OPEN: &str = "{{USER_INPUT:";
const PLACEHOLDER_CLOSE: &str = "}}";

/// Scan `text` for placeholder tokens, deduplicated by question in first-seen order.
///
/// A token must open and close on the same line.
pub fn find_placeholders(text: &str) -> Vec<Placeholder> {
    let mut found: Vec<Placeholder> = Vec::new();
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find(PLACEHOLDER_OPEN) {
        let start = cursor + rel;
        let question_start = start + PLACEHOLDER_OPEN.len();
        let rest = &text[question_start..];
        let line_end = rest.find('\n').unwrap_or(rest.len());

        match rest[..line_end].find(PLACEHOLDER_CLOSE) {
            Some(close) => {
                let question = &rest[..close];
                match found.iter_mut().find(|p| p.question == question) {
                    Some(existing) => existing.occurrences.push(start),
                    None => found.push(Placeholder {
                        question: question.to_string(),
                        occurrences: vec![start],
                    }),
                }
                cursor = question_start + close + PLACEHOLDER_CLOSE.len();
            }
            None => cursor = question_start,
        }
    }

    found
}

/// Replace every occurrence of each answered placeholder token.
pub fn substitute(text: &str, answers: &[(Placeholder, String)]) -> String {
    answers
        .iter()
        .fold(text.to_string(), |acc, (placeholder, answer)| {
            acc.replace(&placeholder.token(), answer)
        })
}

/// Resolve all placeholders in `text` by prompting through the callback.
///
/// Returns the fully substituted text. An interrupted prompt aborts with
/// [`AgentError::Cancelled`] before any substitution is returned.
pub async fn collect_inputs(
    text: &str,
    callback: &dyn AgentCallback,
) -> Result<String, AgentError> {
    let placeholders = find_placeholders(text);

    if placeholders.is_empty() {
        callback
            .on_message(MessageLevel::Detail, "No user input required.")
            .await;
        return Ok(text.to_string());
    }

    callback
        .on_message(
            MessageLevel::Info,
            "The agent needs more information to proceed...",
        )
        .await;

    let mut answers = Vec::with_capacity(placeholders.len());
    for placeholder in placeholders {
        debug!(
            question = placeholder.question.as_str(),
            occurrences = placeholder.occurrences.len(),
            "Prompting for placeholder"
        );
        let answer = callback.ask_input(&placeholder.question).await?;
        answers.push((placeholder, answer));
    }

    Ok(substitute(text, &answers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::RecordingCallback;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_find_placeholders_dedupes_in_first_seen_order() {
        let text = "{{USER_INPUT:B?}} then {{USER_INPUT:A?}} and {{USER_INPUT:B?}}";
        let found = find_placeholders(text);
        let questions: Vec<&str> = found.iter().map(|p| p.question.as_str()).collect();
        assert_eq!(questions, vec!["B?", "A?"]);
        assert_eq!(found[0].occurrences, vec![0, 45]);
        assert_eq!(found[1].occurrences, vec![23]);
    }

    #[test]
    fn test_find_placeholders_ignores_unclosed_tokens() {
        let text = "{{USER_INPUT:broken\n}} and {{USER_INPUT:ok}}";
        let found = find_placeholders(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].question, "ok");
    }

    #[test]
    fn test_find_placeholders_empty_question() {
        let found = find_placeholders("x {{USER_INPUT:}} y");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].question, "");
    }

    #[test]
    fn test_substitute_replaces_every_occurrence() {
        let text = "mkdir {{USER_INPUT:Name?}}\ncd {{USER_INPUT:Name?}}";
        let placeholders = find_placeholders(text);
        let answers = vec![(placeholders[0].clone(), "demo".to_string())];
        assert_eq!(substitute(text, &answers), "mkdir demo\ncd demo");
    }

    #[tokio::test]
    async fn test_collect_prompts_once_per_unique_question() {
        let text = "{{USER_INPUT:X}} {{USER_INPUT:Y}} {{USER_INPUT:X}} {{USER_INPUT:X}} {{USER_INPUT:Y}}";
        let callback = RecordingCallback::new().with_answers(["x-val", "y-val"]);

        let result = collect_inputs(text, &callback).await.unwrap();

        assert_eq!(callback.questions(), vec!["X".to_string(), "Y".to_string()]);
        assert_eq!(result, "x-val y-val x-val x-val y-val");
        assert!(find_placeholders(&result).is_empty());
    }

    #[tokio::test]
    async fn test_collect_without_placeholders_asks_nothing() {
        let callback = RecordingCallback::new();
        let result = collect_inputs("```bash\nls\n```", &callback).await.unwrap();
        assert_eq!(result, "```bash\nls\n```");
        assert!(callback.questions().is_empty());
    }

    #[tokio::test]
    async fn test_collect_cancelled_prompt_aborts() {
        let text = "{{USER_INPUT:First}} {{USER_INPUT:Second}}";
        // No scripted answers: the recording callback reports a cancellation.
        let callback = RecordingCallback::new();
        let err = collect_inputs(text, &callback).await.unwrap_err();
        assert!(err.is_cancellation());
        assert_eq!(callback.questions(), vec!["First".to_string()]);
    }
}
