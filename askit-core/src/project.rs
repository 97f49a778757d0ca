//! Project discovery and initialization.
//!
//! A project is any directory holding a `.askit/` directory.

use crate::error::ProjectError;
use crate::paths::PROJECT_DIR;
use std::path::{Path, PathBuf};
use tracing::info;

/// Walk up from `start` to the first directory containing `.askit/`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Like [`find_project_root`], failing with [`ProjectError::NotFound`].
pub fn require_project_root(start: &Path) -> Result<PathBuf, ProjectError> {
    find_project_root(start).ok_or(ProjectError::NotFound)
}

/// Create `.askit/`, `.askit/logs/` and an empty `.askit/config.yaml` in `dir`.
///
/// Returns the created `.askit` directory.
pub fn init_project(dir: &Path) -> Result<PathBuf, crate::error::AskitError> {
    let askit_dir = dir.join(PROJECT_DIR);
    if askit_dir.is_dir() {
        return Err(ProjectError::AlreadyInitialized {
            path: dir.to_path_buf(),
        }
        .into());
    }

    std::fs::create_dir(&askit_dir)?;
    std::fs::create_dir(askit_dir.join("logs"))?;
    std::fs::write(askit_dir.join("config.yaml"), "")?;
    info!(path = %askit_dir.display(), "Project initialized");
    Ok(askit_dir)
}
