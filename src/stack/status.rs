use crate::errors::Result;
use crate::git::branch_status::{Commit, GitBranchStatus, RemoteTrackingBranchStatus};
use crate::git::ops::GitOps;
use crate::github::types::{PullRequest, PullRequestProvider};
use crate::stack::config::{BranchNode, StackConfig};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Why a branch does or does not take part in an update.
///
/// Computed once during tree construction; `is_active` and
/// `could_be_cleaned_up` are predicates over this tag, never re-derived
/// from scattered booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchActivity {
    /// Exists, tracked, remote branch present, pull request (if any) open
    Active,
    /// Tracked but the remote branch was deleted
    RemoteGone,
    /// The branch's pull request has been merged
    PullRequestMerged,
    /// Exists locally but has never been pushed
    NeverPushed,
    /// Declared in the stack but no local branch by that name
    Missing,
}

/// A branch's position relative to its effective parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentBranchStatus {
    pub name: String,
    pub ahead: usize,
    pub behind: usize,
}

/// Status of the shared source branch at the root of a stack
#[derive(Debug, Clone)]
pub struct SourceBranchDetail {
    pub name: String,
    pub exists: bool,
    pub tip: Option<Commit>,
    pub remote_tracking: Option<RemoteTrackingBranchStatus>,
    pub is_current: bool,
    pub worktree_path: Option<PathBuf>,
}

impl SourceBranchDetail {
    pub fn is_active(&self) -> bool {
        self.exists && self.remote_tracking.as_ref().is_some_and(|rt| rt.exists)
    }
}

/// Computed status of one stacked branch, including its subtree
#[derive(Debug, Clone)]
pub struct BranchDetail {
    pub name: String,
    pub exists: bool,
    pub tip: Option<Commit>,
    pub remote_tracking: Option<RemoteTrackingBranchStatus>,
    pub is_current: bool,
    pub worktree_path: Option<PathBuf>,
    pub activity: BranchActivity,
    pub pull_request: Option<PullRequest>,
    /// Position relative to the effective parent; `None` when the branch
    /// does not exist locally
    pub parent: Option<ParentBranchStatus>,
    /// Child branches in configuration order
    pub children: Vec<BranchDetail>,
}

impl BranchDetail {
    /// An active branch participates in updates; its changes are not yet
    /// incorporated upstream.
    pub fn is_active(&self) -> bool {
        self.activity == BranchActivity::Active
    }

    /// The branch's work has landed (remote deleted or pull request
    /// merged) and the local branch could be deleted.
    pub fn could_be_cleaned_up(&self) -> bool {
        matches!(
            self.activity,
            BranchActivity::RemoteGone | BranchActivity::PullRequestMerged
        )
    }
}

/// Immutable status snapshot of a whole stack.
///
/// Constructed fresh for every high-level command from the declared
/// configuration plus one batched raw-status query; any status-affecting
/// operation (merge, rebase, push) invalidates it.
#[derive(Debug, Clone)]
pub struct StackStatus {
    pub name: String,
    pub source_branch: SourceBranchDetail,
    /// Independent top-level branches off the source branch
    pub root_branches: Vec<BranchDetail>,
}

impl StackStatus {
    /// Root-to-leaf paths through the status tree, in document order
    pub fn branch_lines(&self) -> Vec<Vec<&BranchDetail>> {
        fn walk<'a>(
            branch: &'a BranchDetail,
            prefix: &mut Vec<&'a BranchDetail>,
            out: &mut Vec<Vec<&'a BranchDetail>>,
        ) {
            prefix.push(branch);
            if branch.children.is_empty() {
                out.push(prefix.clone());
            } else {
                for child in &branch.children {
                    walk(child, prefix, out);
                }
            }
            prefix.pop();
        }

        let mut lines = Vec::new();
        let mut prefix = Vec::new();
        for root in &self.root_branches {
            walk(root, &mut prefix, &mut lines);
        }
        lines
    }

    /// Every branch detail in the tree, preorder
    pub fn all_branches(&self) -> Vec<&BranchDetail> {
        fn walk<'a>(branch: &'a BranchDetail, out: &mut Vec<&'a BranchDetail>) {
            out.push(branch);
            for child in &branch.children {
                walk(child, out);
            }
        }
        let mut all = Vec::new();
        for root in &self.root_branches {
            walk(root, &mut all);
        }
        all
    }

    pub fn find_branch(&self, name: &str) -> Option<&BranchDetail> {
        self.all_branches().into_iter().find(|b| b.name == name)
    }
}

/// Build the status snapshot for a stack.
///
/// Issues one batched raw-status query covering the source branch and
/// every declared branch, plus (when `include_pull_requests` is set and a
/// provider is available) one pull-request lookup per declared branch —
/// branches missing locally included, since they can still have
/// historical pull requests.
pub async fn compute_status<P: PullRequestProvider>(
    git: &dyn GitOps,
    provider: Option<&P>,
    stack: &StackConfig,
    include_pull_requests: bool,
) -> Result<StackStatus> {
    let branch_names = stack.all_branch_names();

    let mut query = Vec::with_capacity(branch_names.len() + 1);
    query.push(stack.source_branch.clone());
    query.extend(branch_names.iter().cloned());
    let raw = git.branch_statuses(&query)?;

    let mut pull_requests = HashMap::new();
    if include_pull_requests {
        if let Some(provider) = provider {
            for name in &branch_names {
                if let Some(pr) = provider.get_pull_request(name).await? {
                    pull_requests.insert(name.clone(), pr);
                }
            }
        } else {
            debug!("Pull request status requested but no provider is configured");
        }
    }

    let source_branch = build_source(&stack.source_branch, raw.get(&stack.source_branch));

    let root_branches = stack
        .branches
        .iter()
        .map(|node| build_branch(git, node, &stack.source_branch, &raw, &pull_requests))
        .collect::<Result<Vec<_>>>()?;

    Ok(StackStatus {
        name: stack.name.clone(),
        source_branch,
        root_branches,
    })
}

fn build_source(name: &str, raw: Option<&GitBranchStatus>) -> SourceBranchDetail {
    match raw {
        Some(rs) => SourceBranchDetail {
            name: name.to_string(),
            exists: true,
            tip: Some(rs.tip.clone()),
            remote_tracking: rs.remote_tracking(),
            is_current: rs.is_current_branch,
            worktree_path: rs.worktree_path.clone(),
        },
        None => SourceBranchDetail {
            name: name.to_string(),
            exists: false,
            tip: None,
            remote_tracking: None,
            is_current: false,
            worktree_path: None,
        },
    }
}

fn build_branch(
    git: &dyn GitOps,
    node: &BranchNode,
    effective_parent: &str,
    raw: &HashMap<String, GitBranchStatus>,
    pull_requests: &HashMap<String, PullRequest>,
) -> Result<BranchDetail> {
    let pull_request = pull_requests.get(&node.name).cloned();

    let Some(rs) = raw.get(&node.name) else {
        // Not present locally: no parent relation to measure, and its
        // descendants keep measuring against the parent this branch
        // would have used.
        let children = node
            .children
            .iter()
            .map(|child| build_branch(git, child, effective_parent, raw, pull_requests))
            .collect::<Result<Vec<_>>>()?;

        return Ok(BranchDetail {
            name: node.name.clone(),
            exists: false,
            tip: None,
            remote_tracking: None,
            is_current: false,
            worktree_path: None,
            activity: BranchActivity::Missing,
            pull_request,
            parent: None,
            children,
        });
    };

    let remote_tracking = rs.remote_tracking();
    let activity = classify(rs, pull_request.as_ref());

    // Ahead/behind the effective parent is only meaningful for branches
    // whose remote tracking branch exists; everything else reads as (0, 0).
    let (ahead, behind) = if remote_tracking.as_ref().is_some_and(|rt| rt.exists) {
        git.compare_branches(&node.name, effective_parent)?
    } else {
        (0, 0)
    };

    // An inactive branch is transparent to its descendants: its changes
    // are presumed already incorporated upstream, so children keep the
    // parent this branch received.
    let next_parent = if activity == BranchActivity::Active {
        node.name.as_str()
    } else {
        effective_parent
    };

    let children = node
        .children
        .iter()
        .map(|child| build_branch(git, child, next_parent, raw, pull_requests))
        .collect::<Result<Vec<_>>>()?;

    Ok(BranchDetail {
        name: node.name.clone(),
        exists: true,
        tip: Some(rs.tip.clone()),
        remote_tracking,
        is_current: rs.is_current_branch,
        worktree_path: rs.worktree_path.clone(),
        activity,
        pull_request,
        parent: Some(ParentBranchStatus {
            name: effective_parent.to_string(),
            ahead,
            behind,
        }),
        children,
    })
}

fn classify(rs: &GitBranchStatus, pull_request: Option<&PullRequest>) -> BranchActivity {
    if rs.remote_tracking_branch_name.is_some() && !rs.remote_branch_exists {
        BranchActivity::RemoteGone
    } else if pull_request.is_some_and(|pr| pr.is_merged()) {
        BranchActivity::PullRequestMerged
    } else if rs.remote_tracking_branch_name.is_none() {
        BranchActivity::NeverPushed
    } else {
        BranchActivity::Active
    }
}
