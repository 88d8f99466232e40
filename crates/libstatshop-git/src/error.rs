use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during Git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a git repository: {}", .0.display())]
    RepositoryNotFound(PathBuf),

    #[error("Clone of {url} failed: {source}")]
    CloneFailed {
        url: String,
        #[source]
        source: git2::Error,
    },

    #[error("Fetch from '{remote}' failed: {source}")]
    FetchFailed {
        remote: String,
        #[source]
        source: git2::Error,
    },

    #[error("Push rejected: {refspec}: {reason}")]
    PushRejected { refspec: String, reason: String },

    #[error("Branch already exists: {0}")]
    BranchExists(String),

    #[error("Checkout of '{branch}' failed: {reason}")]
    CheckoutFailed { branch: String, reason: String },

    #[error("Remote already exists: {0}")]
    RemoteExists(String),

    #[error("Reference not found: {0}")]
    RefNotFound(String),
}
