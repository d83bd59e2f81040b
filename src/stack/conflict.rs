use crate::errors::{ConflictOperation, Result, TrellisError};
use crate::git::ops::GitOps;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Outcome of waiting for a human to deal with a conflicted merge/rebase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// The in-progress marker was already absent when the wait began
    NotStarted,
    /// The user committed a resolution (head moved)
    Completed,
    /// The user aborted the operation (head restored)
    Aborted,
    /// The marker was still present when the deadline expired
    TimedOut,
}

/// Wait for an in-progress merge or rebase to be resolved or abandoned.
///
/// Polls the repository every `poll_interval`: while the in-progress
/// marker for `operation` is present the conflict is still being worked
/// on; once it disappears, a head commit different from the one captured
/// on entry means the user committed a resolution, an identical head
/// means they aborted. `timeout = None` polls indefinitely.
///
/// Cancellation is checked at every poll boundary and propagates as
/// [`TrellisError::Cancelled`] instead of returning a resolution. The
/// poll suspends cooperatively; it never blocks a thread.
pub async fn wait_for_conflict_resolution(
    git: &dyn GitOps,
    operation: ConflictOperation,
    poll_interval: Duration,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<ConflictResolution> {
    let initial_head = git.head_commit_sha()?;

    if !operation_in_progress(git, operation)? {
        debug!("No {} in progress; nothing to wait for", operation);
        return Ok(ConflictResolution::NotStarted);
    }

    debug!(
        "Waiting for {} conflict resolution (head was {})",
        operation, initial_head
    );
    let started = Instant::now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("{} conflict wait cancelled", operation);
                return Err(TrellisError::Cancelled);
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }

        if operation_in_progress(git, operation)? {
            if let Some(timeout) = timeout {
                if started.elapsed() >= timeout {
                    debug!("{} conflict wait timed out", operation);
                    return Ok(ConflictResolution::TimedOut);
                }
            }
            trace!("{} still in progress", operation);
            continue;
        }

        let head = git.head_commit_sha()?;
        return Ok(if head != initial_head {
            debug!("{} conflict resolved (head now {})", operation, head);
            ConflictResolution::Completed
        } else {
            debug!("{} aborted (head unchanged)", operation);
            ConflictResolution::Aborted
        });
    }
}

fn operation_in_progress(git: &dyn GitOps, operation: ConflictOperation) -> Result<bool> {
    match operation {
        ConflictOperation::Merge => git.is_merge_in_progress(),
        ConflictOperation::Rebase => git.is_rebase_in_progress(),
    }
}
