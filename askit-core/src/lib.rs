//! # AskIT Core
//!
//! Core library for the askit command-line assistant.
//! Provides response parsing, agent plan extraction and execution, the LLM
//! provider seam, configuration, credentials and shell-history context.

pub mod agent;
pub mod brain;
pub mod config;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod history;
pub mod input;
pub mod paths;
pub mod plan;
pub mod preflight;
pub mod project;
pub mod providers;
pub mod response;
pub mod staging;
pub mod types;

// Re-export commonly used types at the crate root.
pub use agent::{
    Agent, AgentCallback, AgentOutcome, AgentPhase, AgentReport, MessageLevel, NoOpCallback,
    RecordingCallback,
};
pub use brain::{LlmProvider, MockLlmProvider, SYSTEM_PROMPT, get_suggestion};
pub use config::{AskitConfig, ExecutionMode, LlmConfig, load_config};
pub use credentials::{CredentialStore, InMemoryCredentialStore, KeyringCredentialStore};
pub use error::{AgentError, AskitError, ConfigError, ProjectError, ProviderError, Result};
pub use executor::{MockShellRunner, ShellRunner, SystemShellRunner};
pub use paths::AppPaths;
pub use preflight::{PathToolLocator, StaticToolLocator, ToolLocator};
pub use response::{ParsedResponse, format_suggestion, parse_response};
pub use staging::ConfigSession;
pub use types::{Confidence, OsFamily, Plan, Step, Suggestion};
