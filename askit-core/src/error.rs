//! Error types for the askit core.
//!
//! Uses `thiserror` for public API error types. Provider and parse failures are
//! recovered locally into low-confidence suggestions; agent errors are fatal to
//! the run that raised them.

use std::path::PathBuf;

/// Top-level error type for the askit core library.
#[derive(Debug, thiserror::Error)]
pub enum AskitError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential error: {0}")]
    Credential(#[from] crate::credentials::CredentialError),

    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from LLM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },

    #[error("Unsupported provider: {name}")]
    Unsupported { name: String },
}

/// Errors that end an agent run.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Could not find installation instructions for '{tool}'. Please install it manually.")]
    ToolMissing { tool: String },

    #[error("Required tool '{tool}' not installed.")]
    InstallDeclined { tool: String },

    #[error("Could not install '{tool}'. Please install it manually and try again.")]
    InstallFailed { tool: String },

    #[error("Command '{command}' failed with exit code {exit_code}")]
    CommandFailed { command: String, exit_code: i32 },

    #[error("Failed to execute command '{command}': {message}")]
    SpawnFailed { command: String, message: String },

    #[error("Operation cancelled by user")]
    Cancelled,
}

impl AgentError {
    /// Whether this error came from a user interrupt rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, AgentError::Cancelled)
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration parse error: {message}")]
    ParseError { message: String },

    #[error("Invalid configuration value for '{key}': {value}")]
    InvalidValue { key: String, value: String },

    #[error("Failed to write configuration file {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },

    #[error("Could not determine the home directory")]
    NoHomeDirectory,
}

/// Errors from project discovery and initialization.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("Not in an AskIT project. Run `askit-cli init` first.")]
    NotFound,

    #[error("The AskIT project has already been initialized in {path}")]
    AlreadyInitialized { path: PathBuf },
}

/// A type alias for results using the top-level `AskitError`.
pub type Result<T> = std::result::Result<T, AskitError>;
