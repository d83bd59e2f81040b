use crate::cli::commands::CommandContext;
use crate::cli::output::Output;
use crate::errors::Result;
use crate::stack::{BranchActivity, BranchDetail, StackStatus};
use console::style;

/// Show the status tree for the active stack
pub async fn run(show_pull_requests: bool) -> Result<()> {
    let ctx = CommandContext::load()?;
    let resolver = ctx.resolver()?;
    let status = ctx
        .compute_stack_status(&resolver, show_pull_requests)
        .await?;

    render(&status);
    Ok(())
}

fn render(status: &StackStatus) {
    Output::section(format!("Stack: {}", status.name));

    let source = &status.source_branch;
    let marker = if source.is_current { "* " } else { "  " };
    let mut line = format!("{marker}{}", style(&source.name).cyan().bold());
    if !source.exists {
        line.push_str(&format!(" {}", style("(missing)").red()));
    } else if let Some(remote) = &source.remote_tracking {
        line.push_str(&remote_summary(remote.ahead, remote.behind, remote.exists));
    }
    println!("{line}");

    for (index, branch) in status.root_branches.iter().enumerate() {
        let last = index + 1 == status.root_branches.len();
        render_branch(branch, "", last);
    }

    if status.root_branches.is_empty() {
        Output::sub_item("No branches tracked yet");
    }
}

fn render_branch(branch: &BranchDetail, prefix: &str, last: bool) {
    let connector = if last { "└─" } else { "├─" };

    let name = match branch.activity {
        BranchActivity::Active => style(&branch.name).green(),
        BranchActivity::Missing => style(&branch.name).red(),
        _ => style(&branch.name).dim(),
    };

    let mut line = format!("{prefix}{connector} {name}");
    if branch.is_current {
        line.push_str(&format!(" {}", style("*").bold()));
    }

    if let Some(label) = activity_label(branch.activity) {
        line.push_str(&format!(" {}", style(label).yellow()));
    }

    if let Some(parent) = &branch.parent {
        if parent.ahead > 0 || parent.behind > 0 {
            line.push_str(&format!(
                " {}",
                style(format!(
                    "[{}: +{} -{}]",
                    parent.name, parent.ahead, parent.behind
                ))
                .dim()
            ));
        }
    }

    if let Some(remote) = &branch.remote_tracking {
        line.push_str(&remote_summary(remote.ahead, remote.behind, remote.exists));
    }

    if let Some(pr) = &branch.pull_request {
        let pr_label = format!("#{} ({})", pr.number, pr.state);
        line.push_str(&format!(" {}", style(pr_label).magenta()));
    }

    println!("{line}");

    let child_prefix = format!("{prefix}{}", if last { "   " } else { "│  " });
    for (index, child) in branch.children.iter().enumerate() {
        let child_last = index + 1 == branch.children.len();
        render_branch(child, &child_prefix, child_last);
    }
}

fn activity_label(activity: BranchActivity) -> Option<&'static str> {
    match activity {
        BranchActivity::Active => None,
        BranchActivity::RemoteGone => Some("(remote gone)"),
        BranchActivity::PullRequestMerged => Some("(merged)"),
        BranchActivity::NeverPushed => Some("(not pushed)"),
        BranchActivity::Missing => Some("(missing)"),
    }
}

fn remote_summary(ahead: usize, behind: usize, exists: bool) -> String {
    if !exists {
        return String::new();
    }
    match (ahead, behind) {
        (0, 0) => String::new(),
        (a, 0) => format!(" {}", style(format!("↑{a}")).green()),
        (0, b) => format!(" {}", style(format!("↓{b}")).red()),
        (a, b) => format!(" {}", style(format!("↑{a} ↓{b}")).yellow()),
    }
}
