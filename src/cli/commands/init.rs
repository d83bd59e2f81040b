use crate::cli::output::Output;
use crate::config::{self, Settings};
use crate::errors::{Result, TrellisError};
use crate::git::{self, GitOps, GitRepository};
use crate::github;
use crate::stack::StackConfigStore;
use tracing::debug;

/// Initialize the repository for Trellis and create the first stack
pub fn run(source_branch: Option<String>, name: Option<String>, force: bool) -> Result<()> {
    let current_dir = std::env::current_dir()
        .map_err(|e| TrellisError::config(format!("Could not get current directory: {e}")))?;
    let repo_root = git::find_repository_root(&current_dir)?;

    if config::is_repo_initialized(&repo_root) && !force {
        return Err(TrellisError::config(
            "Repository is already initialized. Use --force to reconfigure.",
        ));
    }

    let repo = GitRepository::open(&repo_root)?;
    let mut settings = Settings::default();

    // Infer owner/repo from the remote so pull request lookups work out
    // of the box.
    let remote_key = format!("remote.{}.url", settings.git.remote);
    match repo.config_value(&remote_key)? {
        Some(remote_url) => match github::parse_remote_url(&remote_url) {
            Ok((owner, repo_name)) => {
                debug!("Detected GitHub repository {}/{}", owner, repo_name);
                settings.github.owner = owner;
                settings.github.repo = repo_name;
            }
            Err(e) => Output::warning(format!("Could not parse remote URL: {e}")),
        },
        None => Output::warning(format!(
            "No '{}' remote configured; pull request lookups disabled",
            settings.git.remote
        )),
    }

    let source_branch = match source_branch {
        Some(branch) => branch,
        None => repo.current_branch()?,
    };
    settings.git.default_source_branch = source_branch.clone();

    config::initialize_repo(&repo_root, &settings)?;

    let stack_name = name.unwrap_or_else(|| "default".to_string());
    let mut store = StackConfigStore::load(&repo_root)?;
    if store.get_by_name(&stack_name).is_none() {
        store.create_stack(stack_name.clone(), source_branch.clone())?;
        store.save()?;
    }

    Output::success(format!("Initialized Trellis in {}", repo_root.display()));
    Output::sub_item(format!("Stack: {stack_name}"));
    Output::sub_item(format!("Source branch: {source_branch}"));
    if settings.github.is_configured() {
        Output::sub_item(format!(
            "GitHub: {}/{}",
            settings.github.owner, settings.github.repo
        ));
    }
    Output::tip("Track branches with 'trellis track <branch> [--parent <branch>]'");

    Ok(())
}
