//! GitHub REST client
//!
//! Authenticates with a bearer token. Every request carries the API media
//! type and a `User-Agent`, both of which GitHub requires.

use async_trait::async_trait;
use libstatshop_core::{PullRequestDraft, RepoSlug};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::HostError;
use crate::host::RepositoryHost;
use crate::types::{AuthenticatedUser, ForkedRepo, PullRequest, RepoInfo};
use crate::USER_AGENT;

const ACCEPT: &str = "application/vnd.github+json";

#[derive(Clone)]
pub struct GitHubClient {
    base_url: String,
    token: String,
    client: Client,
}

#[derive(Serialize)]
struct CreatePullRequest<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, endpoint(&self.base_url, path))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, HostError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(status_error(status, body))
        }
    }
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url, path)
}

fn status_error(status: StatusCode, body: String) -> HostError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HostError::Unauthorized(body),
        StatusCode::NOT_FOUND => HostError::NotFound(body),
        StatusCode::UNPROCESSABLE_ENTITY => HostError::Validation(body),
        _ => HostError::Server(format!("{}: {}", status, body)),
    }
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    async fn create_fork(&self, upstream: &RepoSlug) -> Result<ForkedRepo, HostError> {
        let request = self
            .request(Method::POST, &format!("/repos/{}/forks", upstream.full_name()))
            .json(&serde_json::json!({}));
        self.send(request).await
    }

    async fn repository(&self, slug: &RepoSlug) -> Result<RepoInfo, HostError> {
        let request = self.request(Method::GET, &format!("/repos/{}", slug.full_name()));
        self.send(request).await
    }

    async fn authenticated_user(&self) -> Result<AuthenticatedUser, HostError> {
        self.send(self.request(Method::GET, "/user")).await
    }

    async fn probe_contents(&self, slug: &RepoSlug) -> Result<(), HostError> {
        let request = self.request(Method::GET, &format!("/repos/{}/contents/", slug.full_name()));
        let _: serde_json::Value = self.send(request).await?;
        Ok(())
    }

    async fn create_pull_request(
        &self,
        upstream: &RepoSlug,
        draft: &PullRequestDraft,
    ) -> Result<PullRequest, HostError> {
        let payload = CreatePullRequest {
            title: &draft.title,
            body: &draft.body,
            head: &draft.head,
            base: &draft.base,
        };
        let request = self
            .request(Method::POST, &format!("/repos/{}/pulls", upstream.full_name()))
            .json(&payload);
        self.send(request).await
    }
}
