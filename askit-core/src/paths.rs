//! OS-specific locations for configuration, cache, data and logs.

use crate::error::ConfigError;
use directories::{BaseDirs, ProjectDirs};
use std::path::{Path, PathBuf};
use tracing::info;

pub const APP_NAME: &str = "askit-cli";

/// Name of the per-project marker directory.
pub const PROJECT_DIR: &str = ".askit";

/// Resolved application directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub data_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl AppPaths {
    /// Resolve the platform directories for the current user.
    pub fn resolve() -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from("", "", APP_NAME).ok_or(ConfigError::NoHomeDirectory)?;
        let logs_dir = if cfg!(target_os = "macos") {
            BaseDirs::new()
                .ok_or(ConfigError::NoHomeDirectory)?
                .home_dir()
                .join("Library")
                .join("Logs")
                .join(APP_NAME)
        } else if cfg!(target_os = "linux") {
            dirs.cache_dir().join("logs")
        } else {
            dirs.data_local_dir().join("logs")
        };

        Ok(Self {
            config_dir: dirs.config_dir().to_path_buf(),
            cache_dir: dirs.cache_dir().to_path_buf(),
            data_dir: dirs.data_dir().to_path_buf(),
            logs_dir,
        })
    }

    /// The same layout under an arbitrary root.
    pub fn rooted(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_dir: root.join("config"),
            cache_dir: root.join("cache"),
            data_dir: root.join("data"),
            logs_dir: root.join("logs"),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.yaml")
    }

    /// Staged, not yet committed configuration.
    pub fn staged_config_file(&self) -> PathBuf {
        self.data_dir.join("config.yaml.tmp")
    }

    /// Present while there are uncommitted configuration changes.
    pub fn lock_file(&self) -> PathBuf {
        self.data_dir.join(".config.lock")
    }

    /// Line-editor history of the configuration shell.
    pub fn shell_history_file(&self) -> PathBuf {
        self.data_dir.join(".config_history")
    }

    /// Create every directory.
    pub fn ensure(&self) -> Result<(), ConfigError> {
        for dir in [
            &self.config_dir,
            &self.cache_dir,
            &self.data_dir,
            &self.logs_dir,
        ] {
            std::fs::create_dir_all(dir).map_err(|e| ConfigError::WriteFailed {
                path: dir.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Move a legacy project-level config to the user config file.
    ///
    /// Only runs when `<project>/.askit/config.yaml` is non-empty and no user
    /// config exists yet. Returns the new location when a copy was made.
    pub fn migrate_legacy_config(
        &self,
        project_root: &Path,
    ) -> Result<Option<PathBuf>, ConfigError> {
        let legacy = project_root.join(PROJECT_DIR).join("config.yaml");
        let target = self.config_file();
        let has_content = std::fs::metadata(&legacy)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);
        if !has_content || target.exists() {
            return Ok(None);
        }

        let write_err = |path: &Path, e: std::io::Error| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        std::fs::create_dir_all(&self.config_dir).map_err(|e| write_err(&self.config_dir, e))?;
        std::fs::copy(&legacy, &target).map_err(|e| write_err(&target, e))?;

        let note = project_root.join(PROJECT_DIR).join("config_migrated.txt");
        std::fs::write(
            &note,
            format!(
                "Configuration has been migrated to: {}\n\
                 This is the new standard location for askit-cli configuration.\n",
                target.display()
            ),
        )
        .map_err(|e| write_err(&note, e))?;

        info!(from = %legacy.display(), to = %target.display(), "Migrated legacy config");
        Ok(Some(target))
    }
}
