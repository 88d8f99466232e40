use libstatshop_core::RepoSlug;
use serde::{Deserialize, Serialize};

/// Owner half of a repository payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// Repository as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    pub clone_url: String,
    pub default_branch: String,
}

impl RepoInfo {
    pub fn slug(&self) -> RepoSlug {
        RepoSlug::new(self.owner.login.clone(), self.name.clone())
    }
}

/// A fork handle; may be a fork that already existed
pub type ForkedRepo = RepoInfo;

/// The identity behind the access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl AuthenticatedUser {
    /// Display name for commits (falls back to the login)
    pub fn commit_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.login,
        }
    }

    /// Email for commits (falls back to the no-reply address)
    pub fn commit_email(&self) -> String {
        match self.email.as_deref() {
            Some(email) if !email.trim().is_empty() => email.to_string(),
            _ => format!("{}@users.noreply.github.com", self.login),
        }
    }
}

/// A created pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
}
