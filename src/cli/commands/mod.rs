pub mod init;
pub mod stack;
pub mod status;
pub mod sync;
pub mod update;

use crate::cli::output::Output;
use crate::config::{self, Settings};
use crate::errors::{Result, TrellisError};
use crate::git::{self, WorkingTreeResolver};
use crate::github::GitHubClient;
use crate::stack::{compute_status, StackConfig, StackConfigStore, StackStatus};
use std::path::PathBuf;

/// Repository-scoped state every command starts from
pub struct CommandContext {
    pub repo_root: PathBuf,
    pub settings: Settings,
    pub store: StackConfigStore,
}

impl CommandContext {
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir()
            .map_err(|e| TrellisError::config(format!("Could not get current directory: {e}")))?;
        let repo_root = git::find_repository_root(&current_dir)?;

        if !config::is_repo_initialized(&repo_root) {
            return Err(TrellisError::config(
                "Repository is not initialized for Trellis. Run 'trellis init' first.",
            ));
        }

        let settings = config::load_settings(&repo_root)?;
        let store = StackConfigStore::load(&repo_root)?;

        Ok(Self {
            repo_root,
            settings,
            store,
        })
    }

    /// Open the main working directory and every linked worktree
    pub fn resolver(&self) -> Result<WorkingTreeResolver> {
        WorkingTreeResolver::discover(&self.repo_root, &self.settings.git.remote)
    }

    /// The stack commands operate on, failing when none is active
    pub fn active_stack(&self) -> Result<&StackConfig> {
        self.store.active_stack().ok_or_else(|| {
            TrellisError::config("No active stack. Run 'trellis init' to create one.")
        })
    }

    /// GitHub client when the repository and a token are configured
    pub fn github_client(&self) -> Option<GitHubClient> {
        if !self.settings.github.is_configured() {
            Output::warning("GitHub repository not configured; skipping pull request lookups");
            return None;
        }
        let Some(token) = self.settings.github.token() else {
            Output::warning(format!(
                "No token in ${}; skipping pull request lookups",
                self.settings.github.token_env
            ));
            return None;
        };
        match GitHubClient::new(&self.settings.github, &token) {
            Ok(client) => Some(client),
            Err(e) => {
                Output::warning(format!("Could not create GitHub client: {e}"));
                None
            }
        }
    }

    /// Compute the active stack's status snapshot against the given
    /// working trees
    pub async fn compute_stack_status(
        &self,
        resolver: &WorkingTreeResolver,
        include_pull_requests: bool,
    ) -> Result<StackStatus> {
        let stack = self.active_stack()?;
        let provider = if include_pull_requests {
            self.github_client()
        } else {
            None
        };
        compute_status(resolver.main(), provider.as_ref(), stack, include_pull_requests).await
    }
}
