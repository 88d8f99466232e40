use std::fmt;
use std::path::PathBuf;

use libstatshop_git::{Credentials, GitError, WorkingCopy};

/// Undo action registered once a stage has created remote state
#[derive(Clone)]
pub enum Compensation {
    /// Delete a branch pushed earlier in the run
    DeleteRemoteBranch {
        work_tree: PathBuf,
        remote: String,
        branch: String,
        creds: Option<Credentials>,
    },
}

impl Compensation {
    /// Perform the undo. Blocking; callers run it off the async executor.
    pub fn run(&self) -> Result<(), GitError> {
        match self {
            Compensation::DeleteRemoteBranch {
                work_tree,
                remote,
                branch,
                creds,
            } => {
                let copy = WorkingCopy::open(work_tree)?;
                copy.delete_remote_branch(remote, branch, creds.as_ref())
            }
        }
    }
}

impl fmt::Debug for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compensation::DeleteRemoteBranch { remote, branch, .. } => f
                .debug_struct("DeleteRemoteBranch")
                .field("remote", remote)
                .field("branch", branch)
                .finish_non_exhaustive(),
        }
    }
}

impl fmt::Display for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compensation::DeleteRemoteBranch { remote, branch, .. } => {
                write!(f, "delete branch '{}' on '{}'", branch, remote)
            }
        }
    }
}
