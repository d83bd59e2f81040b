use crate::errors::Result;
use crate::git::branch_status::RemoteTrackingBranchStatus;
use crate::git::worktree::WorkingTreeResolver;
use crate::stack::status::StackStatus;
use std::path::PathBuf;
use tracing::{debug, info};

/// Bring every behind branch of the stack up to date with its remote.
///
/// The current branch and branches checked out in linked worktrees are
/// pulled directly (fast-forward) in their own working directory; all
/// remaining behind branches are updated through a single batched
/// fetch into their local refs, since no working tree needs to change.
pub fn pull(trees: &WorkingTreeResolver, status: &StackStatus) -> Result<()> {
    let mut fetch_batch: Vec<String> = Vec::new();

    for candidate in pull_candidates(status) {
        let Some(remote) = candidate.remote_tracking else {
            continue;
        };
        if !remote.exists || remote.behind == 0 {
            continue;
        }

        if candidate.is_current {
            info!("Pulling current branch '{}'", candidate.name);
            trees.main().pull_branch(&candidate.name)?;
        } else if candidate.worktree_path.is_some() {
            info!("Pulling '{}' in its worktree", candidate.name);
            trees.for_branch(&candidate.name).pull_branch(&candidate.name)?;
        } else {
            fetch_batch.push(candidate.name);
        }
    }

    if !fetch_batch.is_empty() {
        info!("Fetching {} branches into local refs", fetch_batch.len());
        trees.main().fetch_branch_refspecs(&fetch_batch)?;
    }

    Ok(())
}

/// Push every stack branch that is ahead of (or missing from) the remote.
///
/// Brand-new branches are pushed one by one so tracking gets set up;
/// branches ahead of an existing remote go out in fixed-size batches
/// preserving their tree order. `force_with_lease` is required after a
/// rebase has rewritten history.
pub fn push(
    trees: &WorkingTreeResolver,
    status: &StackStatus,
    max_batch_size: usize,
    force_with_lease: bool,
) -> Result<()> {
    let mut new_branches = Vec::new();
    let mut ahead_branches = Vec::new();

    for branch in status.all_branches() {
        if !branch.exists {
            continue;
        }
        match &branch.remote_tracking {
            None => new_branches.push(branch.name.clone()),
            Some(remote) if remote.exists && remote.ahead > 0 => {
                ahead_branches.push(branch.name.clone());
            }
            Some(_) => {
                debug!("'{}' needs no push", branch.name);
            }
        }
    }

    for name in &new_branches {
        info!("Pushing new branch '{}'", name);
        trees.main().push_new_branch(name)?;
    }

    for batch in ahead_branches.chunks(max_batch_size.max(1)) {
        info!("Pushing {} branches: {}", batch.len(), batch.join(", "));
        trees.main().push_branches(batch, force_with_lease)?;
    }

    Ok(())
}

struct PullCandidate {
    name: String,
    remote_tracking: Option<RemoteTrackingBranchStatus>,
    is_current: bool,
    worktree_path: Option<PathBuf>,
}

fn pull_candidates(status: &StackStatus) -> Vec<PullCandidate> {
    let source = &status.source_branch;
    let mut candidates = vec![PullCandidate {
        name: source.name.clone(),
        remote_tracking: source.remote_tracking.clone(),
        is_current: source.is_current,
        worktree_path: source.worktree_path.clone(),
    }];

    for branch in status.all_branches() {
        candidates.push(PullCandidate {
            name: branch.name.clone(),
            remote_tracking: branch.remote_tracking.clone(),
            is_current: branch.is_current,
            worktree_path: branch.worktree_path.clone(),
        });
    }

    candidates
}
