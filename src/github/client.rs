use crate::config::GitHubConfig;
use crate::errors::{Result, TrellisError};
use crate::github::types::{PullRequest, PullRequestProvider, PullRequestState};
use chrono::{DateTime, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION},
    Client,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

/// GitHub REST API client, scoped to one repository.
///
/// Only the narrow contract the engine needs: look up the pull request for
/// a branch, and retarget an open pull request's base branch.
pub struct GitHubClient {
    client: Client,
    api_url: String,
    owner: String,
    repo: String,
}

impl GitHubClient {
    /// Create a new GitHub client
    pub fn new(config: &GitHubConfig, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| TrellisError::config(format!("Invalid auth header: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("trellis-cli/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| TrellisError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
        })
    }

    /// Get the API URL for a repository-scoped path
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url,
            self.owner,
            self.repo,
            path.trim_start_matches('/')
        )
    }

    async fn handle_response<T>(&self, response: reqwest::Response) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();

        if status.is_success() {
            let text = response
                .text()
                .await
                .map_err(|e| TrellisError::github(format!("Failed to read response body: {e}")))?;

            trace!("Response body: {}", text);

            serde_json::from_str(&text)
                .map_err(|e| TrellisError::github(format!("Failed to parse JSON response: {e}")))
        } else {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(TrellisError::github_api(status.as_u16(), text))
        }
    }

    /// Retarget an open pull request onto a new base branch
    pub async fn retarget_pull_request(&self, number: u64, new_base: &str) -> Result<()> {
        let url = self.repo_url(&format!("pulls/{number}"));
        debug!("PATCH {} (base -> {})", url, new_base);

        let body = UpdatePullRequestBody {
            base: new_base.to_string(),
        };
        let response = self
            .client
            .patch(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TrellisError::github(format!("PATCH request failed: {e}")))?;

        let _: ApiPullRequest = self.handle_response(response).await?;
        Ok(())
    }
}

impl PullRequestProvider for GitHubClient {
    async fn get_pull_request(&self, branch: &str) -> Result<Option<PullRequest>> {
        let url = self.repo_url("pulls");
        debug!("GET {} (head = {})", url, branch);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("head", format!("{}:{}", self.owner, branch)),
                ("state", "all".to_string()),
                ("per_page", "1".to_string()),
            ])
            .send()
            .await
            .map_err(|e| TrellisError::github(format!("GET request failed: {e}")))?;

        let pulls: Vec<ApiPullRequest> = self.handle_response(response).await?;
        Ok(pulls.into_iter().next().map(PullRequest::from))
    }
}

/// Parse `owner` and `repo` out of a git remote URL.
///
/// Handles `https://github.com/owner/repo(.git)` and
/// `git@github.com:owner/repo(.git)` forms.
pub fn parse_remote_url(remote_url: &str) -> Result<(String, String)> {
    let path = if let Some(scp_path) = remote_url
        .split_once('@')
        .and_then(|(_, rest)| rest.split_once(':'))
        .filter(|_| !remote_url.contains("://"))
        .map(|(_, path)| path.to_string())
    {
        scp_path
    } else {
        let url = url::Url::parse(remote_url)?;
        url.path().trim_start_matches('/').to_string()
    };

    let path = path.trim_end_matches('/').trim_end_matches(".git");
    match path.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(TrellisError::config(format!(
            "Could not determine owner/repo from remote URL '{remote_url}'"
        ))),
    }
}

#[derive(Debug, Serialize)]
struct UpdatePullRequestBody {
    base: String,
}

/// Wire shape of a pull request as GitHub returns it
#[derive(Debug, Deserialize)]
struct ApiPullRequest {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    merged_at: Option<DateTime<Utc>>,
    html_url: String,
    #[serde(default)]
    draft: bool,
    head: ApiPullRequestRef,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ApiPullRequestRef {
    #[serde(rename = "ref")]
    ref_name: String,
}

impl From<ApiPullRequest> for PullRequest {
    fn from(api: ApiPullRequest) -> Self {
        // GitHub reports merged pull requests as "closed"; merged_at is the tell
        let state = if api.merged_at.is_some() {
            PullRequestState::Merged
        } else if api.state == "open" {
            PullRequestState::Open
        } else {
            PullRequestState::Closed
        };

        PullRequest {
            number: api.number,
            title: api.title,
            body: api.body,
            state,
            url: api.html_url,
            is_draft: api.draft,
            head_ref_name: api.head.ref_name,
            created_at: api.created_at,
            updated_at: api.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(api_url: &str) -> GitHubClient {
        let config = GitHubConfig {
            api_url: api_url.to_string(),
            owner: "octocat".to_string(),
            repo: "hello-world".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
        };
        GitHubClient::new(&config, "test-token").unwrap()
    }

    #[test]
    fn test_repo_url_generation() {
        let client = test_client("https://api.github.com");
        assert_eq!(
            client.repo_url("pulls"),
            "https://api.github.com/repos/octocat/hello-world/pulls"
        );
        assert_eq!(
            client.repo_url("/pulls/42"),
            "https://api.github.com/repos/octocat/hello-world/pulls/42"
        );
    }

    #[test]
    fn test_parse_remote_url() {
        assert_eq!(
            parse_remote_url("https://github.com/octocat/hello-world.git").unwrap(),
            ("octocat".to_string(), "hello-world".to_string())
        );
        assert_eq!(
            parse_remote_url("git@github.com:octocat/hello-world.git").unwrap(),
            ("octocat".to_string(), "hello-world".to_string())
        );
        assert_eq!(
            parse_remote_url("https://github.com/octocat/hello-world").unwrap(),
            ("octocat".to_string(), "hello-world".to_string())
        );
        assert!(parse_remote_url("https://github.com/").is_err());
    }

    fn pull_request_json(state: &str, merged_at: Option<&str>) -> String {
        let merged = merged_at
            .map(|t| format!("\"{t}\""))
            .unwrap_or_else(|| "null".to_string());
        format!(
            r#"[{{
                "number": 7,
                "title": "Add parser",
                "body": "details",
                "state": "{state}",
                "merged_at": {merged},
                "html_url": "https://github.com/octocat/hello-world/pull/7",
                "draft": false,
                "head": {{ "ref": "feature-parser" }},
                "created_at": "2025-05-01T10:00:00Z",
                "updated_at": "2025-05-02T10:00:00Z"
            }}]"#
        )
    }

    #[tokio::test]
    async fn test_get_pull_request_open() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/octocat/hello-world/pulls")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("head".into(), "octocat:feature-parser".into()),
                mockito::Matcher::UrlEncoded("state".into(), "all".into()),
            ]))
            .with_status(200)
            .with_body(pull_request_json("open", None))
            .create_async()
            .await;

        let client = test_client(&server.url());
        let pr = client
            .get_pull_request("feature-parser")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(pr.number, 7);
        assert_eq!(pr.state, PullRequestState::Open);
        assert_eq!(pr.head_ref_name, "feature-parser");
        assert!(!pr.is_merged());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_pull_request_merged_detection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/octocat/hello-world/pulls")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(pull_request_json("closed", Some("2025-05-03T10:00:00Z")))
            .create_async()
            .await;

        let client = test_client(&server.url());
        let pr = client.get_pull_request("feature-parser").await.unwrap().unwrap();
        assert_eq!(pr.state, PullRequestState::Merged);
        assert!(pr.is_merged());
    }

    #[tokio::test]
    async fn test_get_pull_request_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/octocat/hello-world/pulls")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = test_client(&server.url());
        assert!(client.get_pull_request("no-pr").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retarget_pull_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/repos/octocat/hello-world/pulls/7")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"base": "main"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(pull_request_json("open", None).trim_start_matches('[').trim_end_matches(']').to_string())
            .create_async()
            .await;

        let client = test_client(&server.url());
        client.retarget_pull_request(7, "main").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_surfaces_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/octocat/hello-world/pulls")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_body("Bad credentials")
            .create_async()
            .await;

        let client = test_client(&server.url());
        let err = client.get_pull_request("feature").await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
