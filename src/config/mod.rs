pub mod settings;

pub use settings::{GitHubConfig, GitSettings, Settings, UpdateSettings};

use crate::errors::{Result, TrellisError};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the Trellis configuration directory for a specific repository
pub fn get_repo_config_dir(repo_path: &Path) -> PathBuf {
    repo_path.join(".trellis")
}

/// Path of the repository's settings file
pub fn get_settings_path(repo_path: &Path) -> PathBuf {
    get_repo_config_dir(repo_path).join("config.json")
}

/// Ensure the configuration directory exists
pub fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        fs::create_dir_all(config_dir).map_err(|e| {
            TrellisError::config(format!("Failed to create config directory: {e}"))
        })?;
    }
    Ok(())
}

/// Check if a repository is initialized for Trellis
pub fn is_repo_initialized(repo_path: &Path) -> bool {
    get_settings_path(repo_path).exists()
}

/// Initialize a repository for Trellis
pub fn initialize_repo(repo_path: &Path, settings: &Settings) -> Result<()> {
    settings.validate()?;

    let config_dir = get_repo_config_dir(repo_path);
    ensure_config_dir(&config_dir)?;
    settings.save_to_file(&get_settings_path(repo_path))?;

    tracing::info!("Initialized Trellis repository at {}", repo_path.display());
    Ok(())
}

/// Load the repository's settings, defaults when not initialized
pub fn load_settings(repo_path: &Path) -> Result<Settings> {
    Settings::load_from_file(&get_settings_path(repo_path))
}
