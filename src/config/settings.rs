use crate::errors::{Result, TrellisError};
use crate::utils::atomic_file;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub github: GitHubConfig,
    pub git: GitSettings,
    pub update: UpdateSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    /// Environment variable the API token is read from
    pub token_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitSettings {
    pub remote: String,
    pub default_source_branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSettings {
    /// Conflict detector poll interval, milliseconds
    pub poll_interval_ms: u64,
    /// Give up waiting for conflict resolution after this many seconds;
    /// absent means wait indefinitely
    pub conflict_timeout_secs: Option<u64>,
    /// How many branches go into one push operation
    pub max_push_batch_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            github: GitHubConfig::default(),
            git: GitSettings::default(),
            update: UpdateSettings::default(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            owner: String::new(),
            repo: String::new(),
            token_env: "GITHUB_TOKEN".to_string(),
        }
    }
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            default_source_branch: "main".to_string(),
        }
    }
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            conflict_timeout_secs: None,
            max_push_batch_size: 4,
        }
    }
}

impl GitHubConfig {
    /// Resolve the API token from the configured environment variable
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok().filter(|t| !t.is_empty())
    }

    pub fn is_configured(&self) -> bool {
        !self.owner.is_empty() && !self.repo.is_empty()
    }
}

impl Settings {
    /// Load settings from a file, defaults if it does not exist yet
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| TrellisError::config(format!("Failed to read config file: {e}")))?;

        let settings: Settings = serde_json::from_str(&content)
            .map_err(|e| TrellisError::config(format!("Failed to parse config file: {e}")))?;

        Ok(settings)
    }

    /// Save settings to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        atomic_file::write_json(path, self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.github.api_url.starts_with("http://") && !self.github.api_url.starts_with("https://")
        {
            return Err(TrellisError::config(
                "GitHub API URL must start with http:// or https://",
            ));
        }

        if self.update.poll_interval_ms == 0 {
            return Err(TrellisError::config("Poll interval must be non-zero"));
        }

        if self.update.max_push_batch_size == 0 {
            return Err(TrellisError::config("Push batch size must be non-zero"));
        }

        Ok(())
    }
}
