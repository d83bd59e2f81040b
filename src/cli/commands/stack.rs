use crate::cli::commands::CommandContext;
use crate::cli::output::Output;
use crate::errors::Result;

/// Add a branch to the active stack's tree
pub fn run_track(branch: String, parent: Option<String>) -> Result<()> {
    let mut ctx = CommandContext::load()?;

    let resolver = ctx.resolver()?;
    let known = resolver.main().branch_statuses(&[branch.clone()])?;
    if !known.contains_key(&branch) {
        Output::warning(format!(
            "Branch '{branch}' does not exist locally yet; tracking it anyway"
        ));
    }

    let stack = ctx
        .store
        .active_stack_mut()
        .ok_or_else(|| crate::errors::TrellisError::config("No active stack"))?;
    stack.track_branch(&branch, parent.as_deref())?;
    let stack_name = stack.name.clone();
    ctx.store.save()?;

    match parent {
        Some(parent) => Output::success(format!(
            "Tracking '{branch}' under '{parent}' in stack '{stack_name}'"
        )),
        None => Output::success(format!(
            "Tracking '{branch}' as a root branch in stack '{stack_name}'"
        )),
    }
    Ok(())
}

/// Remove a branch from the active stack's tree; its children are
/// re-attached where it was.
pub fn run_untrack(branch: String) -> Result<()> {
    let mut ctx = CommandContext::load()?;

    let stack = ctx
        .store
        .active_stack_mut()
        .ok_or_else(|| crate::errors::TrellisError::config("No active stack"))?;
    stack.untrack_branch(&branch)?;
    let stack_name = stack.name.clone();
    ctx.store.save()?;

    Output::success(format!("Stopped tracking '{branch}' in stack '{stack_name}'"));
    Ok(())
}
