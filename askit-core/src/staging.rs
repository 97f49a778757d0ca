//! Staged configuration changes.
//!
//! The configuration shell edits a staged copy of the user config. The
//! staged YAML lives in `config.yaml.tmp` and the presence of `.config.lock`
//! marks uncommitted changes; both sit in the data directory. A staged API
//! key is held in memory only and goes to the keychain on commit.

use crate::config::{
    AskitConfig, ExecutionMode, load_config_file, load_config_file_over, save_config_file,
};
use crate::credentials::{API_KEY_ACCOUNT, CredentialError, CredentialStore};
use crate::error::ConfigError;
use crate::paths::AppPaths;
use tracing::{debug, info};

/// Result of [`ConfigSession::set_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    pub old: ExecutionMode,
    pub new: ExecutionMode,
}

impl ModeChange {
    pub fn changed(&self) -> bool {
        self.old != self.new
    }
}

/// Result of [`ConfigSession::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    NothingToCommit,
    Committed { api_key_stored: bool },
}

/// Why a commit did not complete.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// The keychain rejected the staged key. Staged changes are kept.
    #[error("Failed to store API key in system keychain: {0}")]
    Keychain(#[from] CredentialError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// One configuration-shell session.
#[derive(Debug)]
pub struct ConfigSession {
    paths: AppPaths,
    running: AskitConfig,
    staged: AskitConfig,
    staged_api_key: Option<String>,
    restored: bool,
}

impl ConfigSession {
    /// Open a session, restoring changes left by an interrupted session.
    pub fn open(paths: AppPaths) -> Result<Self, ConfigError> {
        paths.ensure()?;
        let running = load_config_file(&paths.config_file())?;
        let restored = paths.lock_file().exists();
        let staged = if restored {
            info!("Restoring uncommitted configuration changes");
            load_config_file_over(&running, &paths.staged_config_file())?
        } else {
            running.clone()
        };

        Ok(Self {
            paths,
            running,
            staged,
            staged_api_key: None,
            restored,
        })
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn running(&self) -> &AskitConfig {
        &self.running
    }

    pub fn staged(&self) -> &AskitConfig {
        &self.staged
    }

    /// Whether staged changes from an earlier session were restored.
    pub fn was_restored(&self) -> bool {
        self.restored
    }

    pub fn has_pending_changes(&self) -> bool {
        self.paths.lock_file().exists()
    }

    pub fn has_staged_api_key(&self) -> bool {
        self.staged_api_key.is_some()
    }

    /// Names of the settings that differ from the running config.
    pub fn pending_changes(&self) -> Vec<&'static str> {
        let mut changes = Vec::new();
        if self.staged.mode != self.running.mode {
            changes.push("mode");
        }
        if self.staged_api_key.is_some() {
            changes.push("api_key");
        }
        changes
    }

    pub fn set_mode(&mut self, mode: ExecutionMode) -> Result<ModeChange, ConfigError> {
        let change = ModeChange {
            old: self.staged.mode,
            new: mode,
        };
        self.staged.mode = mode;
        self.write_staged()?;
        debug!(old = %change.old, new = %change.new, "Staged mode");
        Ok(change)
    }

    /// Stage a new API key. Blank keys are rejected.
    pub fn stage_api_key(&mut self, key: &str) -> Result<(), ConfigError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "api_key".to_string(),
                value: String::new(),
            });
        }
        self.staged_api_key = Some(key.to_string());
        self.write_staged()
    }

    /// Apply staged changes.
    ///
    /// A staged API key is stored first; if that fails nothing else is
    /// written and the staged state is kept.
    pub fn commit(&mut self, store: &dyn CredentialStore) -> Result<CommitOutcome, CommitError> {
        if !self.has_pending_changes() {
            return Ok(CommitOutcome::NothingToCommit);
        }

        let api_key_stored = match &self.staged_api_key {
            Some(key) => {
                store.store_key(API_KEY_ACCOUNT, key)?;
                true
            }
            None => false,
        };
        self.staged_api_key = None;

        save_config_file(&self.paths.config_file(), &self.staged)?;
        self.clear_staging_files()?;
        self.running = self.staged.clone();
        info!(api_key_stored, "Configuration committed");
        Ok(CommitOutcome::Committed { api_key_stored })
    }

    /// Drop staged changes. Returns `None` when nothing was pending.
    pub fn discard(&mut self) -> Result<Option<Vec<&'static str>>, ConfigError> {
        if !self.has_pending_changes() {
            return Ok(None);
        }
        let discarded = self.pending_changes();
        self.clear_staging_files()?;
        self.staged = self.running.clone();
        self.staged_api_key = None;
        Ok(Some(discarded))
    }

    /// Remove the staging files without touching the in-memory state.
    pub fn clear_staging_files(&self) -> Result<(), ConfigError> {
        for path in [self.paths.staged_config_file(), self.paths.lock_file()] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ConfigError::WriteFailed {
                        path,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn write_staged(&self) -> Result<(), ConfigError> {
        save_config_file(&self.paths.staged_config_file(), &self.staged)?;
        let lock = self.paths.lock_file();
        std::fs::write(&lock, b"").map_err(|e| ConfigError::WriteFailed {
            path: lock,
            message: e.to_string(),
        })
    }
}
