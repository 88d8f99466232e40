use std::fmt;

use libstatshop_core::CoreError;
use libstatshop_git::GitError;
use libstatshop_github::HostError;
use serde::Serialize;
use thiserror::Error;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Prepare,
    Identity,
    Fork,
    AwaitFork,
    Clone,
    Sync,
    Branch,
    Checkout,
    MergeTable,
    Commit,
    Push,
    PullRequest,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Prepare => "prepare",
            Stage::Identity => "identity",
            Stage::Fork => "fork",
            Stage::AwaitFork => "await_fork",
            Stage::Clone => "clone",
            Stage::Sync => "sync",
            Stage::Branch => "branch",
            Stage::Checkout => "checkout",
            Stage::MergeTable => "merge_table",
            Stage::Commit => "commit",
            Stage::Push => "push",
            Stage::PullRequest => "pull_request",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying cause of a stage failure
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("background task failed: {0}")]
    Join(String),
}

/// Failure taxonomy reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ForkTimeout,
    CloneFailed,
    FetchFailed,
    PushRejected,
    BranchExists,
    CheckoutFailed,
    RemoteExists,
    MergeConflictInTable,
    PullRequestRejected,
    /// Existing table file could not be parsed
    TableUnreadable,
    /// Snapshot data that cannot be written to the table
    InvalidSnapshot,
    /// Any other remote API failure (auth, not found, server)
    RemoteApi,
    /// Configuration problems
    InvalidConfig,
    Internal,
}

impl FailureKind {
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::ForkTimeout => "fork_timeout",
            FailureKind::CloneFailed => "clone_failed",
            FailureKind::FetchFailed => "fetch_failed",
            FailureKind::PushRejected => "push_rejected",
            FailureKind::BranchExists => "branch_exists",
            FailureKind::CheckoutFailed => "checkout_failed",
            FailureKind::RemoteExists => "remote_exists",
            FailureKind::MergeConflictInTable => "merge_conflict_in_table",
            FailureKind::PullRequestRejected => "pull_request_rejected",
            FailureKind::TableUnreadable => "table_unreadable",
            FailureKind::InvalidSnapshot => "invalid_snapshot",
            FailureKind::RemoteApi => "remote_api",
            FailureKind::InvalidConfig => "invalid_config",
            FailureKind::Internal => "internal_error",
        }
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            FailureKind::InvalidConfig | FailureKind::InvalidSnapshot => 2,
            FailureKind::BranchExists | FailureKind::MergeConflictInTable => 4,
            FailureKind::ForkTimeout => 5,
            FailureKind::CloneFailed | FailureKind::FetchFailed | FailureKind::PushRejected => 6,
            FailureKind::RemoteApi | FailureKind::PullRequestRejected => 7,
            _ => 1,
        }
    }
}

/// A failed publish run: which stage failed and why.
///
/// Remote state created before the failure (the fork, a pushed branch) is
/// not rolled back beyond the compensations listed in
/// `compensation_failures` / the publisher's cleanup policy.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct PublishError {
    pub stage: Stage,
    #[source]
    pub source: StageError,
    /// Cleanup actions that failed after the stage failure
    pub compensation_failures: Vec<String>,
}

impl PublishError {
    pub fn new(stage: Stage, source: impl Into<StageError>) -> Self {
        Self {
            stage,
            source: source.into(),
            compensation_failures: Vec::new(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match &self.source {
            StageError::Host(HostError::ForkTimeout { .. }) => FailureKind::ForkTimeout,
            StageError::Host(HostError::Validation(_)) if self.stage == Stage::PullRequest => {
                FailureKind::PullRequestRejected
            }
            StageError::Host(_) => FailureKind::RemoteApi,

            StageError::Git(GitError::CloneFailed { .. }) => FailureKind::CloneFailed,
            StageError::Git(GitError::FetchFailed { .. }) => FailureKind::FetchFailed,
            StageError::Git(GitError::PushRejected { .. }) => FailureKind::PushRejected,
            StageError::Git(GitError::BranchExists(_)) => FailureKind::BranchExists,
            StageError::Git(GitError::CheckoutFailed { .. }) => FailureKind::CheckoutFailed,
            StageError::Git(GitError::RemoteExists(_)) => FailureKind::RemoteExists,
            StageError::Git(_) => FailureKind::Internal,

            StageError::Core(CoreError::MergeConflict { .. }) => FailureKind::MergeConflictInTable,
            StageError::Core(CoreError::TableParse { .. }) => FailureKind::TableUnreadable,
            StageError::Core(CoreError::InvalidEntity { .. }) => FailureKind::InvalidSnapshot,
            StageError::Core(CoreError::InvalidArgs(_))
            | StageError::Core(CoreError::TomlParse(_)) => FailureKind::InvalidConfig,
            StageError::Core(_) => FailureKind::Internal,

            StageError::Join(_) => FailureKind::Internal,
        }
    }
}
