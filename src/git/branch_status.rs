use std::path::PathBuf;

/// Immutable snapshot of a branch tip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub short_sha: String,
    pub message: String,
}

/// Position of a local branch relative to its remote tracking branch.
///
/// `exists == false` means the tracking reference is configured but the
/// remote branch itself is gone (deleted after a merge, typically).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrackingBranchStatus {
    pub name: String,
    pub exists: bool,
    pub ahead: usize,
    pub behind: usize,
}

/// Raw per-branch record produced by the verbose branch listing.
///
/// This is the input to the status tree builder; ahead/behind here are
/// measured against the remote tracking branch, never against a parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitBranchStatus {
    pub branch_name: String,
    pub remote_tracking_branch_name: Option<String>,
    pub remote_branch_exists: bool,
    pub is_current_branch: bool,
    pub ahead: usize,
    pub behind: usize,
    pub tip: Commit,
    /// Set when the branch is checked out in a linked worktree
    pub worktree_path: Option<PathBuf>,
}

impl GitBranchStatus {
    pub fn remote_tracking(&self) -> Option<RemoteTrackingBranchStatus> {
        self.remote_tracking_branch_name
            .as_ref()
            .map(|name| RemoteTrackingBranchStatus {
                name: name.clone(),
                exists: self.remote_branch_exists,
                ahead: self.ahead,
                behind: self.behind,
            })
    }
}

/// Parse one line of `git branch --verbose --verbose` output.
///
/// Grammar, one line per branch:
///
/// ```text
/// ["* "|"  "] <name> <sha> ["[" <remote> [": ahead <n>[, behind <n>]" | ": behind <n>" | ": gone"] "]"] <message>
/// ```
///
/// No bracketed section means the branch has no remote tracking branch;
/// `: gone` means it is tracked but the remote branch was deleted. Ahead and
/// behind default to 0 whenever the bracket does not spell them out.
///
/// Returns `None` for lines that do not describe a named local branch
/// (blank lines, detached HEAD entries).
pub fn parse_verbose_branch_line(line: &str) -> Option<GitBranchStatus> {
    let (is_current, rest) = match line.strip_prefix("* ") {
        Some(rest) => (true, rest),
        // '+' marks a branch checked out in a linked worktree
        None => (false, line.strip_prefix("+ ").unwrap_or(line)),
    };
    let rest = rest.trim_start();
    if rest.is_empty() || rest.starts_with('(') {
        return None;
    }

    let (name, rest) = split_token(rest)?;
    let (sha, rest) = split_token(rest)?;

    let mut remote_tracking_branch_name = None;
    let mut remote_branch_exists = false;
    let mut ahead = 0;
    let mut behind = 0;

    let message = if let Some(inner_start) = rest.strip_prefix('[') {
        let close = inner_start.find(']')?;
        let inner = &inner_start[..close];
        let message = inner_start[close + 1..].trim_start();

        let (remote, tracking) = match inner.split_once(": ") {
            Some((remote, tracking)) => (remote, Some(tracking)),
            None => (inner, None),
        };
        remote_tracking_branch_name = Some(remote.to_string());
        remote_branch_exists = true;

        match tracking {
            None => {}
            Some("gone") => remote_branch_exists = false,
            Some(counts) => {
                for part in counts.split(", ") {
                    if let Some(n) = part.strip_prefix("ahead ") {
                        ahead = n.trim().parse().ok()?;
                    } else if let Some(n) = part.strip_prefix("behind ") {
                        behind = n.trim().parse().ok()?;
                    }
                }
            }
        }
        message
    } else {
        rest
    };

    Some(GitBranchStatus {
        branch_name: name.to_string(),
        remote_tracking_branch_name,
        remote_branch_exists,
        is_current_branch: is_current,
        ahead,
        behind,
        tip: Commit {
            short_sha: sha.to_string(),
            message: message.to_string(),
        },
        worktree_path: None,
    })
}

fn split_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    let end = s.find(char::is_whitespace)?;
    Some((&s[..end], s[end..].trim_start()))
}
