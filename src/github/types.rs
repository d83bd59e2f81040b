use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pull request state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

impl std::fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PullRequestState::Open => write!(f, "open"),
            PullRequestState::Closed => write!(f, "closed"),
            PullRequestState::Merged => write!(f, "merged"),
        }
    }
}

/// Pull request information
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: PullRequestState,
    pub url: String,
    pub is_draft: bool,
    pub head_ref_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.state == PullRequestState::Merged
    }
}

/// Read-side collaborator for pull-request data.
///
/// The status tree builder performs one lookup per declared branch; a
/// branch that no longer exists locally can still have a historical pull
/// request, so lookups are keyed by branch name, not by local existence.
pub trait PullRequestProvider {
    fn get_pull_request(
        &self,
        branch: &str,
    ) -> impl std::future::Future<Output = crate::errors::Result<Option<PullRequest>>> + Send;
}
