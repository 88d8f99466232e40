//! Core library for statshop
//!
//! Pure building blocks for publishing metrics snapshots:
//! - `SnapshotTable`: wide (entity x date) table with deterministic TSV output
//! - Snapshot and repository identity types
//! - Branch naming and pull request synthesis
//! - Fixed-delay bounded retry for eventually consistent remotes
//! - Publisher configuration

pub mod branch;
pub mod config;
pub mod error;
pub mod retry;
pub mod summary;
pub mod table;
pub mod types;

pub use branch::branch_name_for;
pub use config::{load_config, save_config, ForkPollConfig, PublisherConfig};
pub use error::CoreError;
pub use retry::{retry_fixed, PollState, Retried, RetryExhausted, RetryPolicy};
pub use summary::{PullRequestDraft, SnapshotSummary};
pub use table::SnapshotTable;
pub use types::repo::RepoSlug;
pub use types::snapshot::{MemberStats, Snapshot};
