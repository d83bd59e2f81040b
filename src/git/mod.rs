pub mod branch_status;
pub mod ops;
pub mod repository;
pub mod worktree;

pub use branch_status::{
    parse_verbose_branch_line, Commit, GitBranchStatus, RemoteTrackingBranchStatus,
};
pub use ops::GitOps;
pub use repository::GitRepository;
pub use worktree::WorkingTreeResolver;

use crate::errors::{Result, TrellisError};
use std::path::Path;

/// Check if a directory is a Git repository
pub fn is_git_repository(path: &Path) -> bool {
    path.join(".git").exists() || git2::Repository::discover(path).is_ok()
}

/// Find the root of the Git repository
pub fn find_repository_root(start_path: &Path) -> Result<std::path::PathBuf> {
    let repo = git2::Repository::discover(start_path).map_err(TrellisError::Git)?;

    let workdir = repo
        .workdir()
        .ok_or_else(|| TrellisError::config("Repository has no working directory (bare repo?)"))?;

    Ok(workdir.to_path_buf())
}

/// Get the current working directory as a Git repository
pub fn get_current_repository() -> Result<GitRepository> {
    let current_dir = std::env::current_dir()
        .map_err(|e| TrellisError::config(format!("Could not get current directory: {e}")))?;

    let repo_root = find_repository_root(&current_dir)?;
    GitRepository::open(&repo_root)
}
