//! Fork readiness coordination
//!
//! A fork request returns before the fork's contents exist. The coordinator
//! probes the fork at a fixed interval until a content listing succeeds
//! (`Ready`) or the attempt budget runs out (`GaveUp`, reported as
//! `HostError::ForkTimeout`). The fork request itself is never repeated.

use libstatshop_core::{retry::retry_fixed_observed, PollState, RepoSlug, RetryPolicy};

use crate::error::HostError;
use crate::host::RepositoryHost;
use crate::types::ForkedRepo;

pub struct ForkCoordinator<'a, H: RepositoryHost + ?Sized> {
    host: &'a H,
    policy: RetryPolicy,
}

impl<'a, H: RepositoryHost + ?Sized> ForkCoordinator<'a, H> {
    pub fn new(host: &'a H, policy: RetryPolicy) -> Self {
        Self { host, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fork `upstream` (or get the existing fork) and wait until it is usable
    pub async fn request_fork(&self, upstream: &RepoSlug) -> Result<ForkedRepo, HostError> {
        let fork = self.host.create_fork(upstream).await?;
        self.await_ready(fork).await
    }

    /// Poll `fork` until its contents can be listed
    pub async fn await_ready(&self, fork: ForkedRepo) -> Result<ForkedRepo, HostError> {
        let slug = fork.slug();

        let result = retry_fixed_observed(
            &self.policy,
            |_| self.host.probe_contents(&slug),
            |state| match state {
                PollState::Pending { attempt } => {
                    tracing::debug!(fork = %slug, attempt, "fork not ready yet")
                }
                PollState::Ready { attempts } => {
                    tracing::debug!(fork = %slug, attempts, "fork ready")
                }
                PollState::GaveUp { attempts } => {
                    tracing::debug!(fork = %slug, attempts, "gave up waiting for fork")
                }
            },
        )
        .await;

        match result {
            Ok(_) => Ok(fork),
            Err(exhausted) => Err(HostError::ForkTimeout {
                attempts: exhausted.attempts,
                last_error: exhausted.last_error.to_string(),
            }),
        }
    }
}
