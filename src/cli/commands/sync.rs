use crate::cli::commands::CommandContext;
use crate::cli::output::Output;
use crate::errors::Result;
use crate::stack::sync;

/// Push stack branches that are new or ahead of their remote
pub async fn run_push(batch_size: Option<usize>, force_with_lease: bool) -> Result<()> {
    let ctx = CommandContext::load()?;
    let resolver = ctx.resolver()?;
    let status = ctx.compute_stack_status(&resolver, false).await?;

    let batch_size = batch_size.unwrap_or(ctx.settings.update.max_push_batch_size);
    sync::push(&resolver, &status, batch_size, force_with_lease)?;

    Output::success(format!("Stack '{}' pushed", status.name));
    Ok(())
}

/// Pull every stack branch that is behind its remote
pub async fn run_pull() -> Result<()> {
    let ctx = CommandContext::load()?;
    let resolver = ctx.resolver()?;
    let status = ctx.compute_stack_status(&resolver, false).await?;

    sync::pull(&resolver, &status)?;

    Output::success(format!("Stack '{}' is up to date with its remotes", status.name));
    Ok(())
}
