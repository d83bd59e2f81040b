pub mod client;
pub mod types;

pub use client::{parse_remote_url, GitHubClient};
pub use types::{PullRequest, PullRequestProvider, PullRequestState};
