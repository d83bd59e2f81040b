use crate::cli::commands::CommandContext;
use crate::cli::output::Output;
use crate::errors::Result;
use crate::stack::{UpdateEngine, UpdateOptions};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Replay source-branch changes down the active stack
pub async fn run(rebase: bool) -> Result<()> {
    let ctx = CommandContext::load()?;
    let resolver = ctx.resolver()?;
    let status = ctx.compute_stack_status(&resolver, true).await?;

    let options = UpdateOptions {
        poll_interval: Duration::from_millis(ctx.settings.update.poll_interval_ms),
        conflict_timeout: ctx
            .settings
            .update
            .conflict_timeout_secs
            .map(Duration::from_secs),
    };
    let engine = UpdateEngine::new(&resolver, options);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received; cancelling update");
            signal_cancel.cancel();
        }
    });

    let strategy = if rebase { "rebase" } else { "merge" };
    Output::info(format!(
        "Updating stack '{}' using {} (resolve conflicts in another terminal if prompted)",
        status.name, strategy
    ));

    if rebase {
        engine.update_using_rebase(&status, &cancel).await?;
        Output::success(format!("Stack '{}' rebased onto its source", status.name));
        Output::tip("Rebased branches need 'trellis push --force-with-lease'");
    } else {
        engine.update_using_merge(&status, &cancel).await?;
        Output::success(format!("Stack '{}' merged from its source", status.name));
    }

    Ok(())
}
