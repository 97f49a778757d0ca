//! Model response parsing.
//!
//! Turns the raw text of one model reply into a [`Suggestion`]. The model is
//! instructed to answer with three labeled fields:
//!
//! ```text
//! CONFIDENCE: HIGH
//! COMMAND: ls -la
//! EXPLANATION: Lists every file, including hidden ones.
//! ```
//!
//! The explanation runs from its label to the end of the text, so multi-line
//! explanations (and agent plans embedded in them) survive intact.

use crate::types::{Confidence, Suggestion};

const CONFIDENCE_LABEL: &str = "CONFIDENCE:";
const COMMAND_LABEL: &str = "COMMAND:";
const EXPLANATION_LABEL: &str = "EXPLANATION:";

/// Result of parsing a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    /// At least one labeled field was found. Missing fields take their defaults:
    /// empty strings, and `LOW` confidence.
    Labeled(Suggestion),
    /// No labeled field was found. Every field takes its default, giving a
    /// `LOW` suggestion with empty command and explanation.
    Unlabeled(Suggestion),
}

impl ParsedResponse {
    pub fn suggestion(&self) -> &Suggestion {
        match self {
            ParsedResponse::Labeled(s) | ParsedResponse::Unlabeled(s) => s,
        }
    }

    pub fn into_suggestion(self) -> Suggestion {
        match self {
            ParsedResponse::Labeled(s) | ParsedResponse::Unlabeled(s) => s,
        }
    }

    pub fn is_labeled(&self) -> bool {
        matches!(self, ParsedResponse::Labeled(_))
    }
}

/// Scan a raw reply line by line for the three labeled fields.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let mut confidence: Option<Confidence> = None;
    let mut command: Option<String> = None;
    let mut explanation: Option<String> = None;

    let mut lines = raw.lines();
    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        if let Some(value) = trimmed.strip_prefix(CONFIDENCE_LABEL) {
            confidence = Some(Confidence::from_label(value));
        } else if let Some(value) = trimmed.strip_prefix(COMMAND_LABEL) {
            command = Some(value.trim().to_string());
        } else if let Some(value) = trimmed.strip_prefix(EXPLANATION_LABEL) {
            // Later lines are kept verbatim; a bare label starts on the next line.
            let first = value.trim_start();
            let mut body: Vec<&str> = Vec::new();
            if !first.is_empty() {
                body.push(first);
            }
            body.extend(lines.by_ref());
            explanation = Some(body.join("\n"));
            break;
        }
    }

    if confidence.is_none() && command.is_none() && explanation.is_none() {
        return ParsedResponse::Unlabeled(Suggestion::low(""));
    }

    ParsedResponse::Labeled(Suggestion {
        confidence: confidence.unwrap_or(Confidence::Low),
        command: command.unwrap_or_default(),
        explanation: explanation.unwrap_or_default(),
    })
}

/// Convenience wrapper returning only the suggestion.
pub fn parse_suggestion(raw: &str) -> Suggestion {
    parse_response(raw).into_suggestion()
}

/// Encode a suggestion in the canonical labeled form the parser reads.
pub fn format_suggestion(suggestion: &Suggestion) -> String {
    format!(
        "{CONFIDENCE_LABEL} {}\n{COMMAND_LABEL} {}\n{EXPLANATION_LABEL} {}",
        suggestion.confidence, suggestion.command, suggestion.explanation
    )
}
