//! Cross-Platform Path Utilities
//!
//! Resolves the user-level `~/.agent-context/` directory and the per-project
//! rule storage directory.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Default rule storage directory, relative to the project root
pub const DEFAULT_CONTEXT_DIR: &str = ".agent-context/context";

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Agent Context directory (~/.agent-context/)
pub fn agent_context_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".agent-context"))
}

/// Get the config file path (~/.agent-context/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(agent_context_dir()?.join("config.json"))
}

/// Resolve the rule storage directory for a project.
///
/// Relative `context_dir` values are joined onto `project_root`; absolute
/// ones are used as they are.
pub fn context_dir_for(project_root: &Path, context_dir: &str) -> PathBuf {
    let dir = Path::new(context_dir);
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        project_root.join(dir)
    }
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
