//! Fork synchronization with upstream
//!
//! Makes a fork's default branch identical to upstream's before a new
//! branch is cut from it:
//! 1. Add (or reuse) the `upstream` remote and fetch its default branch
//! 2. Check out the local default branch (creating it if the clone lacks it)
//! 3. Hard-reset it to upstream's tip
//! 4. Force-push it to `origin` so the hosted fork matches
//!
//! Any failing step aborts the sync; the working copy is left as that step
//! left it.

use git2::Oid;

use crate::credentials::Credentials;
use crate::working_copy::{WorkingCopy, ORIGIN_REMOTE};
use crate::GitError;

/// Remote name used for the upstream repository
pub const UPSTREAM_REMOTE: &str = "upstream";

/// Result of a sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Local default-branch tip before the reset (None if the clone lacked it)
    pub previous_tip: Option<Oid>,
    /// Upstream default-branch tip at fetch time; the fork now points here
    pub upstream_tip: Oid,
}

impl SyncOutcome {
    /// Whether the fork's default branch moved
    pub fn changed(&self) -> bool {
        self.previous_tip != Some(self.upstream_tip)
    }
}

/// Upstream location for a fork sync
#[derive(Debug, Clone)]
pub struct ForkSync {
    pub upstream_url: String,
    pub default_branch: String,
}

impl ForkSync {
    pub fn new(upstream_url: impl Into<String>, default_branch: impl Into<String>) -> Self {
        Self {
            upstream_url: upstream_url.into(),
            default_branch: default_branch.into(),
        }
    }

    /// Reset `copy`'s default branch to upstream and force-push it to origin
    pub fn run(
        &self,
        copy: &WorkingCopy,
        creds: Option<&Credentials>,
    ) -> Result<SyncOutcome, GitError> {
        self.ensure_upstream_remote(copy)?;
        copy.fetch(UPSTREAM_REMOTE, &self.default_branch, creds)?;
        let upstream_tip = copy.remote_branch_tip(UPSTREAM_REMOTE, &self.default_branch)?;

        let previous_tip = if copy.has_branch(&self.default_branch)? {
            Some(copy.branch_tip(&self.default_branch)?)
        } else {
            copy.create_branch(&self.default_branch, upstream_tip)?;
            None
        };
        if copy.current_branch()?.as_deref() != Some(self.default_branch.as_str()) {
            copy.checkout(&self.default_branch)?;
        }

        copy.hard_reset(upstream_tip)?;
        copy.push(ORIGIN_REMOTE, &self.default_branch, true, creds)?;

        tracing::debug!(
            branch = %self.default_branch,
            upstream_tip = %upstream_tip,
            previous_tip = ?previous_tip,
            "fork synced with upstream"
        );

        Ok(SyncOutcome {
            previous_tip,
            upstream_tip,
        })
    }

    // An existing `upstream` remote is reused, repointed if its URL differs
    fn ensure_upstream_remote(&self, copy: &WorkingCopy) -> Result<(), GitError> {
        match copy.add_remote(UPSTREAM_REMOTE, &self.upstream_url) {
            Ok(()) => Ok(()),
            Err(GitError::RemoteExists(_)) => {
                if copy.remote_url(UPSTREAM_REMOTE)?.as_deref() != Some(self.upstream_url.as_str()) {
                    copy.set_remote_url(UPSTREAM_REMOTE, &self.upstream_url)?;
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
