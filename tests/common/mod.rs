#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use trellis_cli::errors::{ConflictOperation, Result, TrellisError};
use trellis_cli::git::{Commit, GitBranchStatus, GitOps, RemoteTrackingBranchStatus};
use trellis_cli::github::{PullRequest, PullRequestProvider, PullRequestState};
use trellis_cli::stack::{BranchActivity, BranchDetail, SourceBranchDetail, StackStatus};

/// One observed call against a [`MockGit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCall {
    BranchStatuses(Vec<String>),
    ChangeBranch(String),
    MergeFrom(String),
    RebaseOnto(String),
    RebaseOntoNewParent { new_parent: String, old_base: String },
    CompareBranches(String, String),
    PullBranch(String),
    PushNewBranch(String),
    PushBranches {
        names: Vec<String>,
        force_with_lease: bool,
    },
    FetchRefSpecs(Vec<String>),
}

/// Scripted state and call log backing a [`MockGit`]
#[derive(Default)]
pub struct MockGitState {
    pub calls: Vec<GitCall>,
    pub current_branch: String,
    pub head_sha: String,
    pub statuses: HashMap<String, GitBranchStatus>,
    /// Keyed by (a, b) as passed to `merge_base`
    pub merge_bases: HashMap<(String, String), Option<String>>,
    /// Keyed by (sha, branch)
    pub reachable: HashMap<(String, String), bool>,
    /// Keyed by (a, b); absent pairs compare as (0, 0)
    pub compare: HashMap<(String, String), (usize, usize)>,
    /// Branch names whose merge raises a conflict the first time
    pub merge_conflicts: Vec<String>,
    /// Rebase targets whose rebase raises a conflict the first time
    pub rebase_conflicts: Vec<String>,
    /// How many in-progress checks report true before the marker clears
    pub in_progress_polls: u32,
    /// Head value once the marker clears; `None` leaves the head alone
    /// (an abort restores the original head)
    pub head_after_resolution: Option<String>,
}

impl MockGitState {
    pub fn shared() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            head_sha: "initial-head".to_string(),
            ..Self::default()
        }))
    }

    fn consume_in_progress(&mut self) -> bool {
        if self.in_progress_polls > 0 {
            self.in_progress_polls -= 1;
            if self.in_progress_polls == 0 {
                if let Some(head) = self.head_after_resolution.take() {
                    self.head_sha = head;
                }
            }
            true
        } else {
            false
        }
    }
}

/// Recorded fake of the git capability interface
pub struct MockGit {
    state: Arc<Mutex<MockGitState>>,
    work_dir: PathBuf,
}

impl MockGit {
    pub fn new(state: Arc<Mutex<MockGitState>>) -> Self {
        Self::at(state, "/repo")
    }

    pub fn at(state: Arc<Mutex<MockGitState>>, work_dir: &str) -> Self {
        Self {
            state,
            work_dir: PathBuf::from(work_dir),
        }
    }
}

impl GitOps for MockGit {
    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn current_branch(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().current_branch.clone())
    }

    fn change_branch(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(GitCall::ChangeBranch(name.to_string()));
        state.current_branch = name.to_string();
        Ok(())
    }

    fn branch_statuses(&self, names: &[String]) -> Result<HashMap<String, GitBranchStatus>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(GitCall::BranchStatuses(names.to_vec()));
        Ok(names
            .iter()
            .filter_map(|name| state.statuses.get(name).map(|s| (name.clone(), s.clone())))
            .collect())
    }

    fn merge_from_local_branch(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(GitCall::MergeFrom(name.to_string()));
        if let Some(pos) = state.merge_conflicts.iter().position(|b| b == name) {
            state.merge_conflicts.remove(pos);
            return Err(TrellisError::Conflict(ConflictOperation::Merge));
        }
        Ok(())
    }

    fn rebase_onto_local_branch(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(GitCall::RebaseOnto(name.to_string()));
        if let Some(pos) = state.rebase_conflicts.iter().position(|b| b == name) {
            state.rebase_conflicts.remove(pos);
            return Err(TrellisError::Conflict(ConflictOperation::Rebase));
        }
        Ok(())
    }

    fn rebase_onto_new_parent(&self, new_parent: &str, old_base: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(GitCall::RebaseOntoNewParent {
            new_parent: new_parent.to_string(),
            old_base: old_base.to_string(),
        });
        if let Some(pos) = state.rebase_conflicts.iter().position(|b| b == new_parent) {
            state.rebase_conflicts.remove(pos);
            return Err(TrellisError::Conflict(ConflictOperation::Rebase));
        }
        Ok(())
    }

    fn abort_merge(&self) -> Result<()> {
        Ok(())
    }

    fn abort_rebase(&self) -> Result<()> {
        Ok(())
    }

    fn is_merge_in_progress(&self) -> Result<bool> {
        Ok(self.state.lock().unwrap().consume_in_progress())
    }

    fn is_rebase_in_progress(&self) -> Result<bool> {
        Ok(self.state.lock().unwrap().consume_in_progress())
    }

    fn head_commit_sha(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().head_sha.clone())
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .merge_bases
            .get(&(a.to_string(), b.to_string()))
            .cloned()
            .unwrap_or(None))
    }

    fn is_commit_reachable_from_branch(&self, sha: &str, branch: &str) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state
            .reachable
            .get(&(sha.to_string(), branch.to_string()))
            .copied()
            .unwrap_or(false))
    }

    fn compare_branches(&self, a: &str, b: &str) -> Result<(usize, usize)> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(GitCall::CompareBranches(a.to_string(), b.to_string()));
        Ok(state
            .compare
            .get(&(a.to_string(), b.to_string()))
            .copied()
            .unwrap_or((0, 0)))
    }

    fn pull_branch(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(GitCall::PullBranch(name.to_string()));
        Ok(())
    }

    fn push_new_branch(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(GitCall::PushNewBranch(name.to_string()));
        Ok(())
    }

    fn push_branches(&self, names: &[String], force_with_lease: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(GitCall::PushBranches {
            names: names.to_vec(),
            force_with_lease,
        });
        Ok(())
    }

    fn fetch_branch_refspecs(&self, names: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(GitCall::FetchRefSpecs(names.to_vec()));
        Ok(())
    }

    fn config_value(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Pull request provider backed by a fixed map, recording lookups
pub struct MockPullRequests {
    pub by_branch: HashMap<String, PullRequest>,
    pub lookups: Arc<Mutex<Vec<String>>>,
}

impl MockPullRequests {
    pub fn empty() -> Self {
        Self {
            by_branch: HashMap::new(),
            lookups: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with(branch: &str, pr: PullRequest) -> Self {
        let mut provider = Self::empty();
        provider.by_branch.insert(branch.to_string(), pr);
        provider
    }
}

impl PullRequestProvider for MockPullRequests {
    fn get_pull_request(
        &self,
        branch: &str,
    ) -> impl std::future::Future<Output = Result<Option<PullRequest>>> + Send {
        self.lookups.lock().unwrap().push(branch.to_string());
        let result = self.by_branch.get(branch).cloned();
        async move { Ok(result) }
    }
}

pub fn pull_request(number: u64, branch: &str, state: PullRequestState) -> PullRequest {
    PullRequest {
        number,
        title: format!("PR for {branch}"),
        body: None,
        state,
        url: format!("https://github.com/octocat/hello-world/pull/{number}"),
        is_draft: false,
        head_ref_name: branch.to_string(),
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

fn tip(name: &str) -> Commit {
    Commit {
        short_sha: "1234567".to_string(),
        message: format!("tip of {name}"),
    }
}

/// Raw status for a branch tracked on the remote
pub fn raw_tracked(name: &str, ahead: usize, behind: usize) -> GitBranchStatus {
    GitBranchStatus {
        branch_name: name.to_string(),
        remote_tracking_branch_name: Some(format!("origin/{name}")),
        remote_branch_exists: true,
        is_current_branch: false,
        ahead,
        behind,
        tip: tip(name),
        worktree_path: None,
    }
}

/// Raw status for a branch whose remote was deleted
pub fn raw_gone(name: &str) -> GitBranchStatus {
    GitBranchStatus {
        remote_branch_exists: false,
        ahead: 0,
        behind: 0,
        ..raw_tracked(name, 0, 0)
    }
}

/// Raw status for a branch that was never pushed
pub fn raw_untracked(name: &str) -> GitBranchStatus {
    GitBranchStatus {
        remote_tracking_branch_name: None,
        remote_branch_exists: false,
        ..raw_tracked(name, 0, 0)
    }
}

fn remote_tracking(name: &str, exists: bool, ahead: usize, behind: usize) -> RemoteTrackingBranchStatus {
    RemoteTrackingBranchStatus {
        name: format!("origin/{name}"),
        exists,
        ahead,
        behind,
    }
}

/// Status-tree fixture: a branch detail with the given activity
pub fn branch_detail(name: &str, activity: BranchActivity) -> BranchDetail {
    let exists = activity != BranchActivity::Missing;
    let remote = match activity {
        BranchActivity::Missing | BranchActivity::NeverPushed => None,
        BranchActivity::RemoteGone => Some(remote_tracking(name, false, 0, 0)),
        _ => Some(remote_tracking(name, true, 0, 0)),
    };
    BranchDetail {
        name: name.to_string(),
        exists,
        tip: exists.then(|| tip(name)),
        remote_tracking: remote,
        is_current: false,
        worktree_path: None,
        activity,
        pull_request: None,
        parent: None,
        children: Vec::new(),
    }
}

pub fn active(name: &str) -> BranchDetail {
    branch_detail(name, BranchActivity::Active)
}

pub fn with_children(mut detail: BranchDetail, children: Vec<BranchDetail>) -> BranchDetail {
    detail.children = children;
    detail
}

pub fn with_remote_counts(mut detail: BranchDetail, ahead: usize, behind: usize) -> BranchDetail {
    let name = detail.name.clone();
    detail.remote_tracking = Some(remote_tracking(&name, true, ahead, behind));
    detail
}

pub fn with_worktree(mut detail: BranchDetail, path: &str) -> BranchDetail {
    detail.worktree_path = Some(PathBuf::from(path));
    detail
}

pub fn as_current(mut detail: BranchDetail) -> BranchDetail {
    detail.is_current = true;
    detail
}

pub fn source_detail(name: &str) -> SourceBranchDetail {
    SourceBranchDetail {
        name: name.to_string(),
        exists: true,
        tip: Some(tip(name)),
        remote_tracking: Some(remote_tracking(name, true, 0, 0)),
        is_current: false,
        worktree_path: None,
    }
}

pub fn source_with_counts(name: &str, ahead: usize, behind: usize) -> SourceBranchDetail {
    SourceBranchDetail {
        remote_tracking: Some(remote_tracking(name, true, ahead, behind)),
        ..source_detail(name)
    }
}

pub fn stack_status(source: SourceBranchDetail, roots: Vec<BranchDetail>) -> StackStatus {
    StackStatus {
        name: "test-stack".to_string(),
        source_branch: source,
        root_branches: roots,
    }
}
