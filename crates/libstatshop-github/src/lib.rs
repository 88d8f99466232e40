//! Remote repository host API for statshop
//!
//! - `RepositoryHost`: the operations the publisher needs from a hosting
//!   service (fork, identity, readiness probe, pull requests)
//! - `GitHubClient`: REST implementation of `RepositoryHost`
//! - `ForkCoordinator`: request a fork and poll until it is readable

pub mod client;
pub mod error;
pub mod fork;
pub mod host;
pub mod types;

pub use client::GitHubClient;
pub use error::HostError;
pub use fork::ForkCoordinator;
pub use host::RepositoryHost;
pub use types::{AuthenticatedUser, ForkedRepo, PullRequest, RepoInfo};

/// User agent sent with every API request
pub const USER_AGENT: &str = concat!("statshop/", env!("CARGO_PKG_VERSION"));
