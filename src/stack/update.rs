use crate::errors::{ConflictOperation, Result, TrellisError};
use crate::git::ops::GitOps;
use crate::git::worktree::WorkingTreeResolver;
use crate::stack::conflict::{wait_for_conflict_resolution, ConflictResolution};
use crate::stack::status::{BranchDetail, StackStatus};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Options for stack update operations
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// How often the conflict detector re-checks repository state
    pub poll_interval: Duration,
    /// Give up waiting for conflict resolution after this long;
    /// `None` waits indefinitely
    pub conflict_timeout: Option<Duration>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            conflict_timeout: None,
        }
    }
}

/// Replays source-branch changes down every branch line of a stack.
///
/// Operations within a line run strictly root-to-leaf, and lines run in
/// document order; a branch shared by several lines is revisited once per
/// sibling path. The engine is the sole writer to the working tree(s)
/// while an update runs; concurrent external git activity against the
/// same trees is a precondition violation.
pub struct UpdateEngine<'a> {
    trees: &'a WorkingTreeResolver,
    options: UpdateOptions,
}

impl<'a> UpdateEngine<'a> {
    pub fn new(trees: &'a WorkingTreeResolver, options: UpdateOptions) -> Self {
        Self { trees, options }
    }

    /// Merge the stack's source changes down every branch line.
    ///
    /// Each active branch is checked out (in whichever working tree it
    /// lives) and the current parent merged into it; inactive branches
    /// are skipped without advancing the parent cursor, so the next
    /// branch in the line merges from the same parent. A branch with
    /// several children is deliberately re-merged once per child path —
    /// redundant but idempotent, and the call order is observable.
    pub async fn update_using_merge(
        &self,
        status: &StackStatus,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for line in status.branch_lines() {
            self.merge_branch_line(&status.source_branch.name, &line, cancel)
                .await?;
        }
        Ok(())
    }

    async fn merge_branch_line(
        &self,
        source: &str,
        line: &[&BranchDetail],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut current_parent = source.to_string();

        for branch in line {
            ensure_not_cancelled(cancel)?;

            if !branch.is_active() {
                debug!(
                    "Skipping inactive branch '{}' ({:?})",
                    branch.name, branch.activity
                );
                continue;
            }

            let git = self.trees.for_branch(&branch.name);
            git.change_branch(&branch.name)?;

            debug!("Merging '{}' into '{}'", current_parent, branch.name);
            match git.merge_from_local_branch(&current_parent) {
                Ok(()) => {}
                Err(err) => match err.conflict_kind() {
                    Some(kind) => self.await_resolution(git, kind, cancel).await?,
                    None => return Err(err),
                },
            }

            current_parent = branch.name.clone();
        }

        Ok(())
    }

    /// Rebase every branch line onto the stack's source changes.
    ///
    /// Only the lowest active branch of a line is rebased, onto each of
    /// its ancestors in turn (leaf-to-root, ending at the source branch);
    /// the rebase carries the dependent branch refs between its old and
    /// new positions along, so the single call updates the whole line.
    /// An inactive ancestor is never rebased onto directly — its ref may
    /// not even resolve — but is remembered: when its commits turn out to
    /// have been squash-merged upstream (the merge-base with the lowest
    /// active branch is not reachable from the rebase target), the rebase
    /// replays only the commits after that old base.
    pub async fn update_using_rebase(
        &self,
        status: &StackStatus,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for line in status.branch_lines() {
            self.rebase_branch_line(&status.source_branch.name, &line, cancel)
                .await?;
        }
        Ok(())
    }

    async fn rebase_branch_line(
        &self,
        source: &str,
        line: &[&BranchDetail],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let Some(lowest_idx) = line.iter().rposition(|b| b.is_active()) else {
            debug!(
                "No active branch in line ending at '{}'; nothing to rebase",
                line.last().map(|b| b.name.as_str()).unwrap_or("<empty>")
            );
            return Ok(());
        };
        let lowest = line[lowest_idx];

        let git = self.trees.for_branch(&lowest.name);
        git.change_branch(&lowest.name)?;

        let ancestors = line[..lowest_idx]
            .iter()
            .rev()
            .copied()
            .map(RebaseAncestor::Branch)
            .chain(std::iter::once(RebaseAncestor::Source));

        let mut reparent_from: Option<&BranchDetail> = None;

        for ancestor in ancestors {
            ensure_not_cancelled(cancel)?;

            let ancestor_name = match ancestor {
                RebaseAncestor::Branch(branch) if !branch.is_active() => {
                    if reparent_from.is_none() {
                        debug!(
                            "Ancestor '{}' is inactive ({:?}); will re-parent '{}' past it",
                            branch.name, branch.activity, lowest.name
                        );
                        reparent_from = Some(branch);
                    }
                    continue;
                }
                RebaseAncestor::Branch(branch) => branch.name.as_str(),
                RebaseAncestor::Source => source,
            };

            let result = match reparent_from.take().filter(|b| b.exists) {
                Some(inactive) => {
                    self.rebase_past_inactive(git, lowest, inactive, ancestor_name)
                }
                None => {
                    debug!("Rebasing '{}' onto '{}'", lowest.name, ancestor_name);
                    git.rebase_onto_local_branch(ancestor_name)
                }
            };

            match result {
                Ok(()) => {}
                Err(err) => match err.conflict_kind() {
                    Some(kind) => self.await_resolution(git, kind, cancel).await?,
                    None => return Err(err),
                },
            }
        }

        Ok(())
    }

    /// Rebase `lowest` onto `ancestor`, deciding whether the pending
    /// inactive branch was squash-merged (its original commits are not in
    /// the ancestor's history, only an equivalent squashed commit is) or
    /// merged verbatim.
    fn rebase_past_inactive(
        &self,
        git: &dyn GitOps,
        lowest: &BranchDetail,
        inactive: &BranchDetail,
        ancestor_name: &str,
    ) -> Result<()> {
        match git.merge_base(&lowest.name, &inactive.name)? {
            Some(merge_base)
                if !git.is_commit_reachable_from_branch(&merge_base, ancestor_name)? =>
            {
                debug!(
                    "'{}' was squash-merged; rebasing '{}' onto '{}' from old base {}",
                    inactive.name, lowest.name, ancestor_name, merge_base
                );
                git.rebase_onto_new_parent(ancestor_name, &merge_base)
            }
            _ => {
                // Merged verbatim (or unrelated histories): the already
                // integrated commits drop out of an ordinary rebase on
                // their own.
                debug!(
                    "'{}' was merged verbatim; rebasing '{}' onto '{}'",
                    inactive.name, lowest.name, ancestor_name
                );
                git.rebase_onto_local_branch(ancestor_name)
            }
        }
    }

    async fn await_resolution(
        &self,
        git: &dyn GitOps,
        kind: ConflictOperation,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let resolution = wait_for_conflict_resolution(
            git,
            kind,
            self.options.poll_interval,
            self.options.conflict_timeout,
            cancel,
        )
        .await?;

        match resolution {
            ConflictResolution::Completed => Ok(()),
            ConflictResolution::NotStarted => {
                // The command reported conflicts but the marker is gone;
                // inconsistent, not fatal.
                warn!("{kind} reported conflicts but none is in progress; continuing");
                Ok(())
            }
            ConflictResolution::Aborted => Err(TrellisError::OperationAborted(kind)),
            ConflictResolution::TimedOut => Err(TrellisError::ConflictResolutionTimeout(kind)),
        }
    }
}

enum RebaseAncestor<'a> {
    Branch(&'a BranchDetail),
    Source,
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(TrellisError::Cancelled)
    } else {
        Ok(())
    }
}
