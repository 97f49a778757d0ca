//! Configuration system for askit.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! project config file -> environment. The user file lives at
//! `<config_dir>/config.yaml` (see [`AppPaths`]); the project file at
//! `<project>/.askit/config.yaml`. Environment variables use the `ASKIT_`
//! prefix with `__` between levels, e.g. `ASKIT_LLM__MODEL`.

use crate::error::ConfigError;
use crate::paths::{AppPaths, PROJECT_DIR};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub const ENV_PREFIX: &str = "ASKIT_";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AskitConfig {
    pub mode: ExecutionMode,
    pub llm: LlmConfig,
    pub history: HistoryConfig,
}

/// How confident suggestions are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Suggestions are displayed, never executed.
    #[default]
    Normal,
    /// HIGH-confidence commands run immediately.
    Strike,
}

impl ExecutionMode {
    pub const ALL: [ExecutionMode; 2] = [ExecutionMode::Normal, ExecutionMode::Strike];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Normal => "normal",
            ExecutionMode::Strike => "strike",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(ExecutionMode::Normal),
            "strike" => Ok(ExecutionMode::Strike),
            _ => Err(ConfigError::InvalidValue {
                key: "mode".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name. Only "anthropic" is supported.
    pub provider: String,
    /// Model identifier (e.g., "claude-sonnet-4-20250514").
    pub model: String,
    /// Optional base URL override for the API endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Maximum tokens to generate in a response.
    pub max_tokens: usize,
    pub temperature: f32,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Environment variable consulted when the keychain has no key.
    pub api_key_env: String,
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: None,
            max_tokens: 1024,
            temperature: 0.0,
            timeout_secs: 60,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry policy for transient provider failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Shell history context settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of recent commands sent as context.
    pub lines: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { lines: 10 }
    }
}

/// Project-level config file path.
pub fn project_config_file(project_root: &Path) -> std::path::PathBuf {
    project_root.join(PROJECT_DIR).join("config.yaml")
}

fn has_content(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Build the file layers without the environment.
fn file_layers(paths: &AppPaths, project_root: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(AskitConfig::default()));

    let user_config = paths.config_file();
    if has_content(&user_config) {
        debug!(path = %user_config.display(), "Merging user config");
        figment = figment.merge(Yaml::file(&user_config));
    }

    if let Some(root) = project_root {
        let project_config = project_config_file(root);
        if has_content(&project_config) {
            debug!(path = %project_config.display(), "Merging project config");
            figment = figment.merge(Yaml::file(&project_config));
        }
    }

    figment
}

fn extract(figment: Figment) -> Result<AskitConfig, ConfigError> {
    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}

/// Load the layered configuration.
pub fn load_config(
    paths: &AppPaths,
    project_root: Option<&Path>,
) -> Result<AskitConfig, ConfigError> {
    extract(file_layers(paths, project_root).merge(Env::prefixed(ENV_PREFIX).split("__")))
}

/// Read a single YAML config file, defaulting missing fields.
///
/// A missing or empty file yields the defaults.
pub fn load_config_file(path: &Path) -> Result<AskitConfig, ConfigError> {
    if !has_content(path) {
        return Ok(AskitConfig::default());
    }
    extract(Figment::from(Serialized::defaults(AskitConfig::default())).merge(Yaml::file(path)))
}

/// Read `path` layered over `base`; fields absent from the file keep `base` values.
pub fn load_config_file_over(base: &AskitConfig, path: &Path) -> Result<AskitConfig, ConfigError> {
    if !has_content(path) {
        return Ok(base.clone());
    }
    extract(Figment::from(Serialized::defaults(base)).merge(Yaml::file(path)))
}

/// Write a config file as YAML, creating parent directories.
pub fn save_config_file(path: &Path, config: &AskitConfig) -> Result<(), ConfigError> {
    let write_err = |message: String| ConfigError::WriteFailed {
        path: path.to_path_buf(),
        message,
    };
    let yaml = serde_yaml::to_string(config).map_err(|e| write_err(e.to_string()))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
    }
    std::fs::write(path, yaml).map_err(|e| write_err(e.to_string()))
}

/// Whether a user or project config file exists.
pub fn config_exists(paths: &AppPaths, project_root: Option<&Path>) -> bool {
    paths.config_file().exists() || project_root.is_some_and(|r| project_config_file(r).exists())
}
