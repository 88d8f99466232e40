//! Snapshot publishing pipeline
//!
//! `SnapshotPublisher` runs the whole flow for one snapshot:
//! fork upstream, wait for the fork, clone it, sync it with upstream, cut a
//! dated branch, merge the snapshot into the table file, commit, push and
//! open a pull request. Failures come back as a `PublishError` tagged with
//! the stage that failed.

mod compensation;
mod error;
mod publisher;

pub use compensation::Compensation;
pub use error::{FailureKind, PublishError, Stage, StageError};
pub use publisher::{PublishOutcome, SnapshotPublisher};
