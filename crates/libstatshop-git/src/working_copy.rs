//! Local working copy operations
//!
//! A `WorkingCopy` owns one git2 `Repository` with a work tree. Every
//! network operation takes its credentials as an argument; nothing is cached
//! on the handle.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    BranchType, ErrorCode, FetchOptions, ObjectType, Oid, PushOptions, RemoteCallbacks,
    Repository, ResetType, StatusOptions,
};

use crate::credentials::{CommitAuthor, Credentials};
use crate::GitError;

/// Name of the remote a clone points back to
pub const ORIGIN_REMOTE: &str = "origin";

pub struct WorkingCopy {
    repo: Repository,
    path: PathBuf,
}

impl WorkingCopy {
    /// Open an existing working copy
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = match Repository::open(path) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => {
                return Err(GitError::RepositoryNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        if repo.is_bare() {
            return Err(GitError::RepositoryNotFound(path.to_path_buf()));
        }
        Ok(Self {
            repo,
            path: path.to_path_buf(),
        })
    }

    /// Clone `url` into `dest` (which must be absent or empty)
    pub fn clone(url: &str, dest: &Path, creds: Option<&Credentials>) -> Result<Self, GitError> {
        tracing::debug!(url, dest = %dest.display(), "cloning");

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks(creds));

        let repo = RepoBuilder::new()
            .fetch_options(fetch_options)
            .clone(url, dest)
            .map_err(|source| GitError::CloneFailed {
                url: url.to_string(),
                source,
            })?;

        Ok(Self {
            repo,
            path: dest.to_path_buf(),
        })
    }

    /// Work tree root
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Underlying repository, for read-only inspection
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // ------------------------------------------------------------------
    // Remotes
    // ------------------------------------------------------------------

    /// Add a remote. Fails with `RemoteExists` if the name is taken.
    pub fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        match self.repo.find_remote(name) {
            Ok(_) => Err(GitError::RemoteExists(name.to_string())),
            Err(e) if e.code() == ErrorCode::NotFound => {
                self.repo.remote(name, url)?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// URL configured for a remote, if the remote exists
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(str::to_string)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_remote_url(&self, name: &str, url: &str) -> Result<(), GitError> {
        self.repo.remote_set_url(name, url)?;
        Ok(())
    }

    /// Fetch `branch` from `remote` into `refs/remotes/<remote>/<branch>`
    pub fn fetch(
        &self,
        remote: &str,
        branch: &str,
        creds: Option<&Credentials>,
    ) -> Result<(), GitError> {
        tracing::debug!(remote, branch, "fetching");

        let fetch_failed = |source| GitError::FetchFailed {
            remote: remote.to_string(),
            source,
        };

        let mut handle = self.repo.find_remote(remote).map_err(fetch_failed)?;
        let refspec = format!("+refs/heads/{0}:refs/remotes/{1}/{0}", branch, remote);

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks(creds));

        handle
            .fetch(&[refspec.as_str()], Some(&mut fetch_options), None)
            .map_err(fetch_failed)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Refs and branches
    // ------------------------------------------------------------------

    /// Commit a reference (full name) points at
    pub fn resolve(&self, refname: &str) -> Result<Oid, GitError> {
        let reference = match self.repo.find_reference(refname) {
            Ok(reference) => reference,
            Err(e) if e.code() == ErrorCode::NotFound => {
                return Err(GitError::RefNotFound(refname.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(reference.peel_to_commit()?.id())
    }

    /// Tip of `<remote>/<branch>` as of the last fetch
    pub fn remote_branch_tip(&self, remote: &str, branch: &str) -> Result<Oid, GitError> {
        self.resolve(&format!("refs/remotes/{}/{}", remote, branch))
    }

    /// Tip of a local branch
    pub fn branch_tip(&self, branch: &str) -> Result<Oid, GitError> {
        self.resolve(&format!("refs/heads/{}", branch))
    }

    pub fn has_branch(&self, name: &str) -> Result<bool, GitError> {
        match self.repo.find_branch(name, BranchType::Local) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Commit HEAD points at
    pub fn head_oid(&self) -> Result<Oid, GitError> {
        self.resolve("HEAD")
    }

    /// Short name of the checked-out branch (None when detached or unborn)
    pub fn current_branch(&self) -> Result<Option<String>, GitError> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };
        if !head.is_branch() {
            return Ok(None);
        }
        Ok(head.shorthand().map(str::to_string))
    }

    /// Create a local branch at `at`. Fails with `BranchExists` if present.
    pub fn create_branch(&self, name: &str, at: Oid) -> Result<(), GitError> {
        if self.has_branch(name)? {
            return Err(GitError::BranchExists(name.to_string()));
        }
        let commit = self.repo.find_commit(at)?;
        self.repo.branch(name, &commit, false)?;
        tracing::debug!(branch = name, at = %at, "created branch");
        Ok(())
    }

    /// Check out a local branch. Refuses when the branch is missing or the
    /// work tree has uncommitted changes.
    pub fn checkout(&self, name: &str) -> Result<(), GitError> {
        let failed = |reason: String| GitError::CheckoutFailed {
            branch: name.to_string(),
            reason,
        };

        if !self.has_branch(name)? {
            return Err(failed("no such branch".to_string()));
        }
        if self.is_dirty()? {
            return Err(failed("working tree has uncommitted changes".to_string()));
        }

        let refname = format!("refs/heads/{}", name);
        let target = self.repo.revparse_single(&refname)?;
        self.repo
            .checkout_tree(&target, Some(CheckoutBuilder::new().safe()))
            .map_err(|e| failed(e.message().to_string()))?;
        self.repo.set_head(&refname)?;
        Ok(())
    }

    /// Whether tracked files differ from HEAD (untracked files are ignored)
    pub fn is_dirty(&self) -> Result<bool, GitError> {
        let mut options = StatusOptions::new();
        options.include_untracked(false).include_ignored(false);
        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(statuses.iter().any(|entry| entry.status() != git2::Status::CURRENT))
    }

    /// Move HEAD's branch to `target`, discarding local commits and work tree
    /// changes. Only use this on clones whose history may be thrown away.
    pub fn hard_reset(&self, target: Oid) -> Result<(), GitError> {
        let object = self.repo.find_object(target, Some(ObjectType::Commit))?;
        self.repo.reset(&object, ResetType::Hard, None)?;
        tracing::debug!(target = %target, "hard reset");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Commit and push
    // ------------------------------------------------------------------

    /// Stage `files` (paths relative to the work tree) and commit them on
    /// HEAD. Files missing from disk are staged as deletions.
    pub fn stage_and_commit(
        &self,
        files: &[&Path],
        message: &str,
        author: &CommitAuthor,
    ) -> Result<Oid, GitError> {
        let mut index = self.repo.index()?;
        for file in files {
            if self.path.join(file).exists() {
                index.add_path(file)?;
            } else {
                index.remove_path(file)?;
            }
        }
        index.write()?;

        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                None
            }
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let sig = author.signature()?;
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        tracing::debug!(commit = %oid, "committed");
        Ok(oid)
    }

    /// Push a local branch to the same name on `remote`
    pub fn push(
        &self,
        remote: &str,
        branch: &str,
        force: bool,
        creds: Option<&Credentials>,
    ) -> Result<(), GitError> {
        let refspec = format!(
            "{}refs/heads/{1}:refs/heads/{1}",
            if force { "+" } else { "" },
            branch
        );
        self.push_refspec(remote, &refspec, creds)
    }

    /// Delete a branch on `remote`
    pub fn delete_remote_branch(
        &self,
        remote: &str,
        branch: &str,
        creds: Option<&Credentials>,
    ) -> Result<(), GitError> {
        self.push_refspec(remote, &format!(":refs/heads/{}", branch), creds)
    }

    fn push_refspec(
        &self,
        remote: &str,
        refspec: &str,
        creds: Option<&Credentials>,
    ) -> Result<(), GitError> {
        tracing::debug!(remote, refspec, "pushing");

        let rejected = |reason: String| GitError::PushRejected {
            refspec: refspec.to_string(),
            reason,
        };

        let mut handle = self
            .repo
            .find_remote(remote)
            .map_err(|e| rejected(e.message().to_string()))?;

        let push_error: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));
        let push_error_clone = Rc::clone(&push_error);

        let mut callbacks = remote_callbacks(creds);
        callbacks.push_update_reference(move |refname, status| {
            if let Some(msg) = status {
                *push_error_clone.borrow_mut() = Some(format!("{}: {}", refname, msg));
            }
            Ok(())
        });

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(callbacks);

        handle
            .push(&[refspec], Some(&mut push_options))
            .map_err(|e| rejected(e.message().to_string()))?;

        let error = push_error.borrow().clone();
        if let Some(reason) = error {
            return Err(rejected(reason));
        }
        Ok(())
    }
}

fn remote_callbacks(creds: Option<&Credentials>) -> RemoteCallbacks<'_> {
    match creds {
        Some(creds) => creds.callbacks(),
        None => RemoteCallbacks::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn author() -> CommitAuthor {
        CommitAuthor::new(
            "Test",
            "test@example.com",
            Utc.with_ymd_and_hms(2015, 11, 27, 4, 39, 45).unwrap(),
        )
    }

    fn setup_repo_with_commit() -> (TempDir, WorkingCopy) {
        let temp = TempDir::new().unwrap();
        Repository::init(temp.path()).unwrap();
        let copy = WorkingCopy::open(temp.path()).unwrap();
        std::fs::write(temp.path().join("README.md"), "hello\n").unwrap();
        copy.stage_and_commit(&[Path::new("README.md")], "Initial commit", &author())
            .unwrap();
        (temp, copy)
    }

    #[test]
    fn test_open_missing_repo() {
        let temp = TempDir::new().unwrap();
        let err = WorkingCopy::open(temp.path()).err().unwrap();
        assert!(matches!(err, GitError::RepositoryNotFound(_)));
    }

    #[test]
    fn test_commit_on_unborn_branch() {
        let (_temp, copy) = setup_repo_with_commit();
        let head = copy.repository().find_commit(copy.head_oid().unwrap()).unwrap();
        assert_eq!(head.parent_count(), 0);
        assert_eq!(head.message(), Some("Initial commit"));
        assert_eq!(head.author().name(), Some("Test"));
        assert!(!copy.is_dirty().unwrap());
    }

    #[test]
    fn test_create_branch_twice_fails() {
        let (_temp, copy) = setup_repo_with_commit();
        let head = copy.head_oid().unwrap();

        copy.create_branch("2015-11-27@04-39-45", head).unwrap();
        let err = copy.create_branch("2015-11-27@04-39-45", head).unwrap_err();
        assert!(matches!(err, GitError::BranchExists(ref b) if b == "2015-11-27@04-39-45"));
    }

    #[test]
    fn test_checkout_switches_head() {
        let (_temp, copy) = setup_repo_with_commit();
        copy.create_branch("feature", copy.head_oid().unwrap()).unwrap();

        copy.checkout("feature").unwrap();
        assert_eq!(copy.current_branch().unwrap().as_deref(), Some("feature"));
    }

    #[test]
    fn test_checkout_missing_branch_fails() {
        let (_temp, copy) = setup_repo_with_commit();
        let err = copy.checkout("nope").unwrap_err();
        assert!(matches!(err, GitError::CheckoutFailed { .. }));
    }

    #[test]
    fn test_checkout_dirty_tree_fails() {
        let (temp, copy) = setup_repo_with_commit();
        copy.create_branch("feature", copy.head_oid().unwrap()).unwrap();
        std::fs::write(temp.path().join("README.md"), "changed\n").unwrap();

        assert!(copy.is_dirty().unwrap());
        let err = copy.checkout("feature").unwrap_err();
        assert!(matches!(err, GitError::CheckoutFailed { .. }));
    }

    #[test]
    fn test_add_remote_twice_fails() {
        let (_temp, copy) = setup_repo_with_commit();
        copy.add_remote("upstream", "https://example.com/a.git").unwrap();

        let err = copy.add_remote("upstream", "https://example.com/b.git").unwrap_err();
        assert!(matches!(err, GitError::RemoteExists(ref r) if r == "upstream"));
        assert_eq!(
            copy.remote_url("upstream").unwrap().as_deref(),
            Some("https://example.com/a.git")
        );
        assert_eq!(copy.remote_url("missing").unwrap(), None);
    }

    #[test]
    fn test_fetch_unknown_remote_fails() {
        let (_temp, copy) = setup_repo_with_commit();
        let err = copy.fetch("nowhere", "main", None).unwrap_err();
        assert!(matches!(err, GitError::FetchFailed { .. }));
    }

    #[test]
    fn test_hard_reset_discards_changes() {
        let (temp, copy) = setup_repo_with_commit();
        let first = copy.head_oid().unwrap();

        std::fs::write(temp.path().join("README.md"), "second\n").unwrap();
        copy.stage_and_commit(&[Path::new("README.md")], "Second", &author())
            .unwrap();
        std::fs::write(temp.path().join("README.md"), "scribbles\n").unwrap();

        copy.hard_reset(first).unwrap();
        assert_eq!(copy.head_oid().unwrap(), first);
        assert_eq!(
            std::fs::read_to_string(temp.path().join("README.md")).unwrap(),
            "hello\n"
        );
        assert!(!copy.is_dirty().unwrap());
    }

    #[test]
    fn test_resolve_missing_ref() {
        let (_temp, copy) = setup_repo_with_commit();
        let err = copy.remote_branch_tip("upstream", "main").unwrap_err();
        assert!(matches!(err, GitError::RefNotFound(_)));
    }
}
