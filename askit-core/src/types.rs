//! Fundamental types shared across the askit core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Model-reported certainty tier. Drives what the CLI does with a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
    None,
    Agent,
}

impl Confidence {
    /// All tiers, in the order the model contract lists them.
    pub const ALL: [Confidence; 5] = [
        Confidence::High,
        Confidence::Medium,
        Confidence::Low,
        Confidence::None,
        Confidence::Agent,
    ];

    /// Parse a raw confidence label. Case-insensitive; anything else is `Low`.
    pub fn from_label(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "HIGH" => Confidence::High,
            "MEDIUM" => Confidence::Medium,
            "LOW" => Confidence::Low,
            "NONE" => Confidence::None,
            "AGENT" => Confidence::Agent,
            _ => Confidence::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
            Confidence::None => "NONE",
            Confidence::Agent => "AGENT",
        }
    }

    /// Whether a suggestion at this tier is trusted enough to act on directly.
    pub fn is_actionable(&self) -> bool {
        matches!(self, Confidence::High | Confidence::Medium)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed model response: `(confidence, command, explanation)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub confidence: Confidence,
    pub command: String,
    pub explanation: String,
}

impl Suggestion {
    pub fn new(
        confidence: Confidence,
        command: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            confidence,
            command: command.into(),
            explanation: explanation.into(),
        }
    }

    /// A low-confidence suggestion carrying only an explanation.
    pub fn low(explanation: impl Into<String>) -> Self {
        Self::new(Confidence::Low, "", explanation)
    }

    pub fn is_agent(&self) -> bool {
        self.confidence == Confidence::Agent
    }
}

impl Default for Suggestion {
    fn default() -> Self {
        Self::low("")
    }
}

/// A single action of an agent plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    Shell { command: String },
    File { path: String, content: String },
}

impl Step {
    pub fn shell(command: impl Into<String>) -> Self {
        Step::Shell {
            command: command.into(),
        }
    }

    pub fn file(path: impl Into<String>, content: impl Into<String>) -> Self {
        Step::File {
            path: path.into(),
            content: content.into(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Shell { command } => write!(f, "$ {command}"),
            Step::File { path, content } => write!(f, "write {path} ({} bytes)", content.len()),
        }
    }
}

/// An ordered agent plan extracted from an explanation.
///
/// Steps keep the order in which they appear in the text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<Step>,
    /// Paths of `FILE:` markers that had no fenced block after them.
    pub orphan_file_markers: Vec<String>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Shell commands in plan order.
    pub fn shell_commands(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                Step::Shell { command } => Some(command.as_str()),
                Step::File { .. } => None,
            })
            .collect()
    }

    /// `(path, content)` pairs in plan order.
    pub fn files(&self) -> Vec<(&str, &str)> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                Step::File { path, content } => Some((path.as_str(), content.as_str())),
                Step::Shell { .. } => None,
            })
            .collect()
    }
}

/// A value the plan needs from the user, keyed by its question text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub question: String,
    /// Byte offsets of every occurrence of the token in the scanned text.
    pub occurrences: Vec<usize>,
}

impl Placeholder {
    /// The exact token as it appears in the text.
    pub fn token(&self) -> String {
        placeholder_token(&self.question)
    }
}

/// Build the `{{USER_INPUT:<question>}}` token for a question.
pub fn placeholder_token(question: &str) -> String {
    format!("{{{{USER_INPUT:{question}}}}}")
}

/// An external executable a plan depends on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToolRequirement {
    pub name: String,
}

impl ToolRequirement {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for ToolRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Operating-system family used to tailor install instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsFamily {
    MacOs,
    Linux,
    Windows,
    Other(String),
}

impl OsFamily {
    /// Map a platform identifier (`std::env::consts::OS` style) to a family.
    pub fn from_platform(platform: &str) -> Self {
        match platform {
            "macos" | "darwin" => OsFamily::MacOs,
            p if p.starts_with("linux") => OsFamily::Linux,
            "windows" | "win32" => OsFamily::Windows,
            other => OsFamily::Other(other.to_string()),
        }
    }

    pub fn current() -> Self {
        Self::from_platform(std::env::consts::OS)
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsFamily::MacOs => f.write_str("macOS"),
            OsFamily::Linux => f.write_str("Linux"),
            OsFamily::Windows => f.write_str("Windows"),
            OsFamily::Other(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_confidence_from_label() {
        assert_eq!(Confidence::from_label("high"), Confidence::High);
        assert_eq!(Confidence::from_label(" Medium "), Confidence::Medium);
        assert_eq!(Confidence::from_label("AGENT"), Confidence::Agent);
        assert_eq!(Confidence::from_label("none"), Confidence::None);
        assert_eq!(Confidence::from_label("certain"), Confidence::Low);
        assert_eq!(Confidence::from_label(""), Confidence::Low);
    }

    #[test]
    fn test_confidence_labels_roundtrip() {
        for confidence in Confidence::ALL {
            assert_eq!(Confidence::from_label(confidence.as_str()), confidence);
        }
    }

    #[test]
    fn test_plan_partitions_steps() {
        let plan = Plan {
            steps: vec![
                Step::file("a.txt", "a"),
                Step::shell("git init"),
                Step::shell("npm install"),
            ],
            orphan_file_markers: Vec::new(),
        };
        assert_eq!(plan.shell_commands(), vec!["git init", "npm install"]);
        assert_eq!(plan.files(), vec![("a.txt", "a")]);
    }

    #[test]
    fn test_placeholder_token() {
        assert_eq!(
            placeholder_token("Project name?"),
            "{{USER_INPUT:Project name?}}"
        );
    }

    #[test]
    fn test_os_family_from_platform() {
        assert_eq!(OsFamily::from_platform("macos"), OsFamily::MacOs);
        assert_eq!(OsFamily::from_platform("darwin"), OsFamily::MacOs);
        assert_eq!(OsFamily::from_platform("linux"), OsFamily::Linux);
        assert_eq!(OsFamily::from_platform("windows"), OsFamily::Windows);
        assert_eq!(OsFamily::from_platform("freebsd").to_string(), "freebsd");
        assert_eq!(OsFamily::MacOs.to_string(), "macOS");
    }

    #[test]
    fn test_step_display() {
        assert_eq!(Step::shell("ls -la").to_string(), "$ ls -la");
        assert_eq!(
            Step::file("out/app.txt", "hello").to_string(),
            "write out/app.txt (5 bytes)"
        );
    }
}
