use async_trait::async_trait;
use libstatshop_core::{PullRequestDraft, RepoSlug};

use crate::error::HostError;
use crate::types::{AuthenticatedUser, ForkedRepo, PullRequest, RepoInfo};

/// Operations the publisher needs from a repository hosting service
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Request a fork of `upstream` for the authenticated user. Returns the
    /// existing fork if there already is one.
    async fn create_fork(&self, upstream: &RepoSlug) -> Result<ForkedRepo, HostError>;

    /// Look up a repository
    async fn repository(&self, slug: &RepoSlug) -> Result<RepoInfo, HostError>;

    /// Identity behind the access token
    async fn authenticated_user(&self) -> Result<AuthenticatedUser, HostError>;

    /// Succeeds once the repository's contents can be listed
    async fn probe_contents(&self, slug: &RepoSlug) -> Result<(), HostError>;

    /// Open a pull request against `upstream`
    async fn create_pull_request(
        &self,
        upstream: &RepoSlug,
        draft: &PullRequestDraft,
    ) -> Result<PullRequest, HostError>;
}
