use crate::errors::Result;
use crate::git::branch_status::GitBranchStatus;
use std::collections::HashMap;
use std::path::Path;

/// Capability interface over one working directory of a git repository.
///
/// Each linked worktree gets its own instance; operations that touch the
/// working tree (checkout, merge, rebase, pull) run against the directory
/// this instance was opened on. The update engine and push/pull orchestrator
/// are written against this trait so they can be driven by a recorded fake
/// in tests.
///
/// `merge_from_local_branch` and the two rebase forms surface textual
/// conflicts as [`TrellisError::Conflict`]; every other failure is fatal.
///
/// [`TrellisError::Conflict`]: crate::errors::TrellisError::Conflict
pub trait GitOps {
    /// Directory this capability operates on
    fn work_dir(&self) -> &Path;

    fn current_branch(&self) -> Result<String>;

    fn change_branch(&self, name: &str) -> Result<()>;

    /// Batched status query: one call covering every requested branch.
    /// Branches that do not exist locally are simply absent from the map.
    fn branch_statuses(&self, names: &[String]) -> Result<HashMap<String, GitBranchStatus>>;

    /// Merge a local branch into the currently checked-out branch
    fn merge_from_local_branch(&self, name: &str) -> Result<()>;

    /// Rebase the currently checked-out branch onto a local branch,
    /// carrying dependent branch refs along with the replayed commits
    fn rebase_onto_local_branch(&self, name: &str) -> Result<()>;

    /// Rebase the currently checked-out branch onto `new_parent`, replaying
    /// only the commits after `old_base` (squash-merge re-parenting)
    fn rebase_onto_new_parent(&self, new_parent: &str, old_base: &str) -> Result<()>;

    fn abort_merge(&self) -> Result<()>;

    fn abort_rebase(&self) -> Result<()>;

    fn is_merge_in_progress(&self) -> Result<bool>;

    fn is_rebase_in_progress(&self) -> Result<bool>;

    fn head_commit_sha(&self) -> Result<String>;

    /// Best common ancestor of two refs, `None` when histories are unrelated
    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>>;

    fn is_commit_reachable_from_branch(&self, sha: &str, branch: &str) -> Result<bool>;

    /// `(ahead, behind)` of `a` relative to `b`
    fn compare_branches(&self, a: &str, b: &str) -> Result<(usize, usize)>;

    /// Fast-forward pull of a branch checked out in this working directory
    fn pull_branch(&self, name: &str) -> Result<()>;

    /// Push a branch that has no remote counterpart yet and set up tracking
    fn push_new_branch(&self, name: &str) -> Result<()>;

    /// Push several existing branches in one operation
    fn push_branches(&self, names: &[String], force_with_lease: bool) -> Result<()>;

    /// Update local refs for branches that are not checked out anywhere,
    /// in one fetch (no working tree involvement)
    fn fetch_branch_refspecs(&self, names: &[String]) -> Result<()>;

    fn config_value(&self, key: &str) -> Result<Option<String>>;
}
