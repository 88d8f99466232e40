//! Git operations for statshop
//!
//! This crate wraps a local working copy with git2:
//! - `WorkingCopy`: open/clone, remotes, fetch, hard reset, branches,
//!   checkout, commit and authenticated push
//! - `ForkSync`: reset a fork's default branch onto upstream and force-push it
//! - `WorkDir`: ephemeral clone directory removed on drop

mod credentials;
mod error;
mod sync;
mod workdir;
mod working_copy;

pub use credentials::{CommitAuthor, Credentials};
pub use error::GitError;
pub use sync::{ForkSync, SyncOutcome, UPSTREAM_REMOTE};
pub use workdir::WorkDir;
pub use working_copy::{WorkingCopy, ORIGIN_REMOTE};

pub use git2::Oid;
