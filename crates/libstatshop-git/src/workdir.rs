use std::path::{Path, PathBuf};

use crate::GitError;

/// Ephemeral directory for one pipeline run's clone.
///
/// Removed on drop unless `keep` is set.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    keep: bool,
}

impl WorkDir {
    /// Create a fresh empty directory under `parent` (or the system temp dir)
    pub fn create(parent: Option<&Path>, keep: bool) -> Result<Self, GitError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("statshop-").keep(true);

        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };

        Ok(Self {
            path: dir.path().to_path_buf(),
            keep,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_kept(&self) -> bool {
        self.keep
    }

    /// Leave the directory on disk after drop
    pub fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if self.keep {
            tracing::debug!(path = %self.path.display(), "keeping work dir");
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove work dir");
            }
        }
    }
}
