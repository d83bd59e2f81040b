use crate::errors::{ConflictOperation, Result, TrellisError};
use crate::git::branch_status::{parse_verbose_branch_line, GitBranchStatus};
use crate::git::ops::GitOps;
use git2::Repository;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Production [`GitOps`] implementation for one working directory.
///
/// Read-side queries (HEAD, merge bases, ahead/behind graphs, config,
/// repository state) go through `git2`; working-tree mutations (checkout,
/// merge, rebase, push, pull, fetch) shell out to the `git` porcelain so
/// that an interrupted merge or rebase is left in exactly the state a user
/// resolves with their own git commands.
pub struct GitRepository {
    repo: Repository,
    path: PathBuf,
    remote_name: String,
}

impl GitRepository {
    /// Open the repository whose working directory contains `path`
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_remote(path, "origin")
    }

    pub fn open_with_remote(path: &Path, remote_name: &str) -> Result<Self> {
        let repo = Repository::discover(path)
            .map_err(|e| TrellisError::config(format!("Not a git repository: {e}")))?;

        let workdir = repo
            .workdir()
            .ok_or_else(|| TrellisError::config("Repository has no working directory"))?
            .to_path_buf();

        Ok(Self {
            repo,
            path: workdir,
            remote_name: remote_name.to_string(),
        })
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    /// Run a git porcelain command in this working directory and capture stdout
    fn run_git(&self, args: &[&str]) -> Result<String> {
        debug!("git {} (in {})", args.join(" "), self.path.display());

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TrellisError::branch(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or(""),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a mutating git command that may legitimately stop on textual
    /// conflicts, surfacing those as a conflict-kind error instead of a
    /// fatal one.
    fn run_git_conflictable(&self, args: &[&str], kind: ConflictOperation) -> Result<()> {
        debug!("git {} (in {})", args.join(" "), self.path.display());

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()?;

        if output.status.success() {
            return Ok(());
        }

        let stopped = match kind {
            ConflictOperation::Merge => self.is_merge_in_progress()?,
            ConflictOperation::Rebase => self.is_rebase_in_progress()?,
        };
        if stopped {
            return Err(TrellisError::Conflict(kind));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(TrellisError::branch(format!(
            "git {} failed: {}",
            args.first().copied().unwrap_or(""),
            stderr.trim()
        )))
    }

    /// Map branch name to the linked worktree it is checked out in, if any.
    /// The main working directory does not count as a linked worktree.
    fn worktree_branches(&self) -> Result<HashMap<String, PathBuf>> {
        let mut branches = HashMap::new();

        for name in self.repo.worktrees()?.iter().flatten() {
            let worktree = match self.repo.find_worktree(name) {
                Ok(wt) => wt,
                Err(e) => {
                    debug!("Skipping worktree '{}': {}", name, e);
                    continue;
                }
            };
            let wt_path = worktree.path().to_path_buf();
            let head_branch = Repository::open(&wt_path)
                .and_then(|repo| repo.head().map(|h| h.shorthand().map(str::to_string)));
            match head_branch {
                Ok(Some(branch)) => {
                    branches.insert(branch, wt_path);
                }
                Ok(None) => {}
                Err(e) => debug!("Skipping worktree at {}: {}", wt_path.display(), e),
            }
        }

        Ok(branches)
    }

    fn resolve_commit(&self, refname: &str) -> Result<git2::Oid> {
        let obj = self
            .repo
            .revparse_single(refname)
            .map_err(|e| TrellisError::branch(format!("Could not resolve '{refname}': {e}")))?;
        let commit = obj
            .peel_to_commit()
            .map_err(|e| TrellisError::branch(format!("'{refname}' is not a commit: {e}")))?;
        Ok(commit.id())
    }
}

impl GitOps for GitRepository {
    fn work_dir(&self) -> &Path {
        &self.path
    }

    fn current_branch(&self) -> Result<String> {
        let head = self
            .repo
            .head()
            .map_err(|e| TrellisError::branch(format!("Could not get HEAD: {e}")))?;

        match head.shorthand() {
            Some(name) if head.is_branch() => Ok(name.to_string()),
            _ => {
                let commit = head
                    .peel_to_commit()
                    .map_err(|e| TrellisError::branch(format!("Could not get HEAD commit: {e}")))?;
                Ok(format!("HEAD@{}", commit.id()))
            }
        }
    }

    fn change_branch(&self, name: &str) -> Result<()> {
        self.run_git(&["checkout", "--quiet", name])?;
        Ok(())
    }

    fn branch_statuses(&self, names: &[String]) -> Result<HashMap<String, GitBranchStatus>> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }

        let mut args = vec!["branch", "--list", "--verbose", "--verbose"];
        args.extend(names.iter().map(String::as_str));
        let listing = self.run_git(&args)?;

        let worktrees = self.worktree_branches()?;

        let mut statuses = HashMap::new();
        for line in listing.lines() {
            if let Some(mut status) = parse_verbose_branch_line(line) {
                status.worktree_path = worktrees.get(&status.branch_name).cloned();
                statuses.insert(status.branch_name.clone(), status);
            }
        }

        Ok(statuses)
    }

    fn merge_from_local_branch(&self, name: &str) -> Result<()> {
        self.run_git_conflictable(&["merge", "--no-edit", name], ConflictOperation::Merge)
    }

    fn rebase_onto_local_branch(&self, name: &str) -> Result<()> {
        // --update-refs carries every dependent branch ref between the old
        // and new positions along with the replayed commits; this is what
        // lets the engine rebase only the lowest active branch per line.
        self.run_git_conflictable(&["rebase", "--update-refs", name], ConflictOperation::Rebase)
    }

    fn rebase_onto_new_parent(&self, new_parent: &str, old_base: &str) -> Result<()> {
        self.run_git_conflictable(
            &["rebase", "--update-refs", "--onto", new_parent, old_base],
            ConflictOperation::Rebase,
        )
    }

    fn abort_merge(&self) -> Result<()> {
        self.run_git(&["merge", "--abort"])?;
        Ok(())
    }

    fn abort_rebase(&self) -> Result<()> {
        self.run_git(&["rebase", "--abort"])?;
        Ok(())
    }

    fn is_merge_in_progress(&self) -> Result<bool> {
        Ok(self.repo.state() == git2::RepositoryState::Merge)
    }

    fn is_rebase_in_progress(&self) -> Result<bool> {
        Ok(matches!(
            self.repo.state(),
            git2::RepositoryState::Rebase
                | git2::RepositoryState::RebaseInteractive
                | git2::RepositoryState::RebaseMerge
        ))
    }

    fn head_commit_sha(&self) -> Result<String> {
        let head = self
            .repo
            .head()
            .map_err(|e| TrellisError::branch(format!("Could not get HEAD: {e}")))?;
        let commit = head
            .peel_to_commit()
            .map_err(|e| TrellisError::branch(format!("Could not get HEAD commit: {e}")))?;
        Ok(commit.id().to_string())
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        let oid_a = self.resolve_commit(a)?;
        let oid_b = self.resolve_commit(b)?;

        match self.repo.merge_base(oid_a, oid_b) {
            Ok(base) => Ok(Some(base.to_string())),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(TrellisError::Git(e)),
        }
    }

    fn is_commit_reachable_from_branch(&self, sha: &str, branch: &str) -> Result<bool> {
        let commit = self.resolve_commit(sha)?;
        let tip = self.resolve_commit(branch)?;

        if commit == tip {
            return Ok(true);
        }
        Ok(self.repo.graph_descendant_of(tip, commit)?)
    }

    fn compare_branches(&self, a: &str, b: &str) -> Result<(usize, usize)> {
        let oid_a = self.resolve_commit(a)?;
        let oid_b = self.resolve_commit(b)?;
        Ok(self.repo.graph_ahead_behind(oid_a, oid_b)?)
    }

    fn pull_branch(&self, name: &str) -> Result<()> {
        self.run_git(&["pull", "--ff-only", &self.remote_name, name])?;
        Ok(())
    }

    fn push_new_branch(&self, name: &str) -> Result<()> {
        self.run_git(&["push", "--set-upstream", &self.remote_name, name])?;
        Ok(())
    }

    fn push_branches(&self, names: &[String], force_with_lease: bool) -> Result<()> {
        let mut args = vec!["push"];
        if force_with_lease {
            args.push("--force-with-lease");
        }
        args.push(&self.remote_name);
        args.extend(names.iter().map(String::as_str));
        self.run_git(&args)?;
        Ok(())
    }

    fn fetch_branch_refspecs(&self, names: &[String]) -> Result<()> {
        let refspecs: Vec<String> = names.iter().map(|n| format!("{n}:{n}")).collect();
        let mut args = vec!["fetch", self.remote_name.as_str()];
        args.extend(refspecs.iter().map(String::as_str));
        self.run_git(&args)?;
        Ok(())
    }

    fn config_value(&self, key: &str) -> Result<Option<String>> {
        let config = self.repo.config()?;
        match config.get_string(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(TrellisError::Git(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, GitRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo_path = temp_dir.path();

        let repo = Repository::init(repo_path).unwrap();
        let signature = Signature::now("Test User", "test@example.com").unwrap();
        let tree_id = {
            let mut index = repo.index().unwrap();
            index.write_tree().unwrap()
        };
        let tree = repo.find_tree(tree_id).unwrap();
        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            "Initial commit",
            &tree,
            &[],
        )
        .unwrap();

        let git_repo = GitRepository::open(repo_path).unwrap();
        git_repo.run_git(&["config", "user.name", "Test User"]).unwrap();
        git_repo
            .run_git(&["config", "user.email", "test@example.com"])
            .unwrap();
        (temp_dir, git_repo)
    }

    fn commit_file(repo: &GitRepository, file: &str, content: &str, message: &str) {
        std::fs::write(repo.work_dir().join(file), content).unwrap();
        repo.run_git(&["add", file]).unwrap();
        repo.run_git(&["commit", "--quiet", "-m", message]).unwrap();
    }

    #[test]
    fn test_open_and_current_branch() {
        let (_tmp, repo) = create_test_repo();
        let branch = repo.current_branch().unwrap();
        assert!(branch == "main" || branch == "master");
    }

    #[test]
    fn test_change_branch_and_head_sha() {
        let (_tmp, repo) = create_test_repo();
        let base = repo.current_branch().unwrap();
        let base_sha = repo.head_commit_sha().unwrap();

        repo.run_git(&["checkout", "--quiet", "-b", "feature-a"])
            .unwrap();
        commit_file(&repo, "a.txt", "a", "Add a");
        assert_ne!(repo.head_commit_sha().unwrap(), base_sha);

        repo.change_branch(&base).unwrap();
        assert_eq!(repo.current_branch().unwrap(), base);
        assert_eq!(repo.head_commit_sha().unwrap(), base_sha);
    }

    #[test]
    fn test_branch_statuses_untracked() {
        let (_tmp, repo) = create_test_repo();
        let base = repo.current_branch().unwrap();
        repo.run_git(&["branch", "feature-b"]).unwrap();

        let statuses = repo
            .branch_statuses(&[base.clone(), "feature-b".to_string(), "missing".to_string()])
            .unwrap();

        assert_eq!(statuses.len(), 2);
        let current = statuses.get(&base).unwrap();
        assert!(current.is_current_branch);
        assert!(current.remote_tracking_branch_name.is_none());
        assert!(!statuses.get("feature-b").unwrap().is_current_branch);
        assert!(!statuses.contains_key("missing"));
    }

    #[test]
    fn test_merge_base_and_reachability() {
        let (_tmp, repo) = create_test_repo();
        let base = repo.current_branch().unwrap();
        let base_sha = repo.head_commit_sha().unwrap();

        repo.run_git(&["checkout", "--quiet", "-b", "feature-c"])
            .unwrap();
        commit_file(&repo, "c.txt", "c", "Add c");
        let feature_sha = repo.head_commit_sha().unwrap();

        let merge_base = repo.merge_base("feature-c", &base).unwrap().unwrap();
        assert_eq!(merge_base, base_sha);

        assert!(repo
            .is_commit_reachable_from_branch(&base_sha, "feature-c")
            .unwrap());
        assert!(!repo
            .is_commit_reachable_from_branch(&feature_sha, &base)
            .unwrap());
    }

    #[test]
    fn test_compare_branches() {
        let (_tmp, repo) = create_test_repo();
        let base = repo.current_branch().unwrap();

        repo.run_git(&["checkout", "--quiet", "-b", "feature-d"])
            .unwrap();
        commit_file(&repo, "d1.txt", "1", "one");
        commit_file(&repo, "d2.txt", "2", "two");

        let (ahead, behind) = repo.compare_branches("feature-d", &base).unwrap();
        assert_eq!((ahead, behind), (2, 0));

        let (ahead, behind) = repo.compare_branches(&base, "feature-d").unwrap();
        assert_eq!((ahead, behind), (0, 2));
    }

    #[test]
    fn test_merge_conflict_is_conflict_kind() {
        let (_tmp, repo) = create_test_repo();
        let base = repo.current_branch().unwrap();
        commit_file(&repo, "f.txt", "base\n", "Base f");

        repo.run_git(&["checkout", "--quiet", "-b", "feature-e"])
            .unwrap();
        commit_file(&repo, "f.txt", "feature\n", "Feature f");

        repo.change_branch(&base).unwrap();
        commit_file(&repo, "f.txt", "mainline\n", "Mainline f");

        repo.change_branch("feature-e").unwrap();
        let err = repo.merge_from_local_branch(&base).unwrap_err();
        assert_eq!(err.conflict_kind(), Some(ConflictOperation::Merge));
        assert!(repo.is_merge_in_progress().unwrap());

        repo.abort_merge().unwrap();
        assert!(!repo.is_merge_in_progress().unwrap());
    }

    #[test]
    fn test_config_value() {
        let (_tmp, repo) = create_test_repo();
        assert_eq!(
            repo.config_value("user.name").unwrap().as_deref(),
            Some("Test User")
        );
        assert_eq!(repo.config_value("trellis.unset").unwrap(), None);
    }
}
