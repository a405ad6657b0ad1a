use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use crate::evidence::models::{RepoFile, RepoSummary};
use crate::evidence::{CodeHost, CodeHostError};

const GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "candidate-screener";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct ReadmePayload {
    #[serde(default)]
    content: String,
}

/// GitHub REST v3 client. Anonymous unless a token is configured.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    token: Option<String>,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(token, GITHUB_API_URL.to_string())
    }

    pub fn with_base_url(token: Option<String>, base_url: String) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            token: token.filter(|t| !t.is_empty()),
            base_url,
        }
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github.v3+json");
        match &self.token {
            Some(token) => request.header("Authorization", format!("token {token}")),
            None => request,
        }
    }

    /// Sends a GET. `Ok(None)` for 404.
    async fn fetch(&self, url: &str) -> Result<Option<Response>, CodeHostError> {
        let response = self.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CodeHostError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(Some(response))
    }
}

/// Decodes the base64 README body GitHub returns (wrapped at 60 columns).
pub fn decode_readme(content: &str) -> Result<String, CodeHostError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| CodeHostError::Decode(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl CodeHost for GitHubClient {
    async fn list_repos(&self, username: &str) -> Result<Vec<RepoSummary>, CodeHostError> {
        info!("Fetching GitHub repos for {username}");
        let url = format!("{}/users/{username}/repos", self.base_url);
        match self.fetch(&url).await? {
            Some(response) => Ok(response.json().await?),
            None => {
                warn!("GitHub user {username} not found");
                Ok(Vec::new())
            }
        }
    }

    async fn readme(&self, username: &str, repo: &str) -> Result<String, CodeHostError> {
        let url = format!("{}/repos/{username}/{repo}/readme", self.base_url);
        match self.fetch(&url).await? {
            Some(response) => {
                let payload: ReadmePayload = response.json().await?;
                decode_readme(&payload.content)
            }
            None => Ok(String::new()),
        }
    }

    async fn list_files(&self, username: &str, repo: &str) -> Result<Vec<RepoFile>, CodeHostError> {
        let url = format!("{}/repos/{username}/{repo}/contents", self.base_url);
        match self.fetch(&url).await? {
            Some(response) => Ok(response.json().await?),
            None => Ok(Vec::new()),
        }
    }

    async fn download(&self, url: &str) -> Result<Option<String>, CodeHostError> {
        match self.fetch(url).await? {
            Some(response) => Ok(Some(response.text().await?)),
            None => Ok(None),
        }
    }
}
