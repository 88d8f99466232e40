//! The publish pipeline
//!
//! Stages run strictly in order; each one awaits its predecessor. Git work
//! runs on the blocking pool and reopens the working copy by path, so no
//! git2 handle crosses an await point.

use std::path::{Path, PathBuf};

use chrono::Utc;
use libstatshop_core::{
    branch_name_for, CoreError, PublisherConfig, PullRequestDraft, RepoSlug, Snapshot,
    SnapshotTable,
};
use libstatshop_git::{
    CommitAuthor, Credentials, ForkSync, GitError, WorkDir, WorkingCopy, ORIGIN_REMOTE,
};
use libstatshop_github::{
    AuthenticatedUser, ForkCoordinator, ForkedRepo, PullRequest, RepoInfo, RepositoryHost,
};
use serde::Serialize;

use crate::compensation::Compensation;
use crate::error::{PublishError, Stage, StageError};

/// What a successful run produced
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub pull_request: PullRequest,
    pub branch: String,
    /// `owner/name` of the fork the branch was pushed to
    pub fork: String,
    pub commit: String,
    pub table_path: String,
    /// Whether the table file was created by this run
    pub table_created: bool,
    /// Set when the clone was kept on disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
}

/// Publishes snapshots as pull requests against one upstream repository
pub struct SnapshotPublisher<H: RepositoryHost> {
    config: PublisherConfig,
    host: H,
    token: String,
}

/// Resources acquired during one run
#[derive(Default)]
struct RunState {
    work_dir: Option<WorkDir>,
    compensations: Vec<Compensation>,
}

/// Values resolved before any git work
struct Target {
    upstream: RepoSlug,
    upstream_url: String,
    default_branch: String,
    fork: ForkedRepo,
    creds: Credentials,
    user: AuthenticatedUser,
}

impl<H: RepositoryHost> SnapshotPublisher<H> {
    /// `token` authenticates git pushes; `host` carries its own API auth
    pub fn new(config: PublisherConfig, host: H, token: impl Into<String>) -> Self {
        Self {
            config,
            host,
            token: token.into(),
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Run the whole pipeline for `snapshot`.
    ///
    /// On failure, registered compensations run before the work dir is
    /// dropped; their own failures are attached to the returned error.
    pub async fn publish(&self, snapshot: &Snapshot) -> Result<PublishOutcome, PublishError> {
        let mut state = RunState::default();

        match self.run(snapshot, &mut state).await {
            Ok(outcome) => Ok(outcome),
            Err(mut err) => {
                tracing::info!(stage = %err.stage, error = %err.source, "publish failed");
                let pending = std::mem::take(&mut state.compensations);
                err.compensation_failures = compensate(pending).await;
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        snapshot: &Snapshot,
        state: &mut RunState,
    ) -> Result<PublishOutcome, PublishError> {
        let branch = branch_name_for(snapshot.timestamp);
        tracing::info!(branch = %branch, upstream = %self.config.upstream, "publishing snapshot");

        // Prepare
        self.config
            .validate()
            .map_err(|e| PublishError::new(Stage::Prepare, e))?;
        let upstream = self
            .config
            .upstream_slug()
            .map_err(|e| PublishError::new(Stage::Prepare, e))?;
        let upstream_url = self
            .config
            .upstream_fetch_url()
            .map_err(|e| PublishError::new(Stage::Prepare, e))?;

        let target = self.resolve_target(upstream, upstream_url).await?;

        let work_dir = WorkDir::create(
            self.config.work_dir_parent.as_deref(),
            self.config.keep_work_dir,
        )
        .map_err(|e| PublishError::new(Stage::Prepare, e))?;
        let work_tree = work_dir.path().to_path_buf();
        state.work_dir = Some(work_dir);

        // Clone
        tracing::info!(stage = %Stage::Clone, url = %target.fork.clone_url, "cloning fork");
        {
            let url = target.fork.clone_url.clone();
            let dest = work_tree.clone();
            let creds = target.creds.clone();
            blocking(Stage::Clone, move || {
                WorkingCopy::clone(&url, &dest, Some(&creds)).map(|_| ())
            })
            .await?;
        }

        // Sync
        tracing::info!(stage = %Stage::Sync, branch = %target.default_branch, "syncing fork with upstream");
        {
            let sync = ForkSync::new(target.upstream_url.clone(), target.default_branch.clone());
            let path = work_tree.clone();
            let creds = target.creds.clone();
            let outcome = blocking(Stage::Sync, move || {
                let copy = WorkingCopy::open(&path)?;
                sync.run(&copy, Some(&creds))
            })
            .await?;
            tracing::debug!(changed = outcome.changed(), tip = %outcome.upstream_tip, "sync done");
        }

        // Branch
        tracing::info!(stage = %Stage::Branch, branch = %branch, "creating branch");
        {
            let path = work_tree.clone();
            let name = branch.clone();
            blocking(Stage::Branch, move || {
                let copy = WorkingCopy::open(&path)?;
                // A branch already on the fork counts as a collision too
                match copy.remote_branch_tip(ORIGIN_REMOTE, &name) {
                    Ok(_) => return Err(GitError::BranchExists(name)),
                    Err(GitError::RefNotFound(_)) => {}
                    Err(e) => return Err(e),
                }
                let head = copy.head_oid()?;
                copy.create_branch(&name, head)
            })
            .await?;
        }

        // Checkout
        {
            let path = work_tree.clone();
            let name = branch.clone();
            blocking(Stage::Checkout, move || {
                WorkingCopy::open(&path)?.checkout(&name)
            })
            .await?;
        }

        // Merge table
        tracing::info!(stage = %Stage::MergeTable, table = %self.config.table_path, "merging snapshot into table");
        let table_created = {
            let file = work_tree.join(&self.config.table_path);
            let snapshot = snapshot.clone();
            blocking(Stage::MergeTable, move || merge_into_file(&file, &snapshot)).await?
        };

        // Commit
        let commit = {
            let path = work_tree.clone();
            let table_path = PathBuf::from(&self.config.table_path);
            let message = self.config.commit_message.clone();
            let author = CommitAuthor::new(
                target.user.commit_name(),
                target.user.commit_email(),
                Utc::now(),
            );
            blocking(Stage::Commit, move || {
                let copy = WorkingCopy::open(&path)?;
                copy.stage_and_commit(&[table_path.as_path()], &message, &author)
            })
            .await?
        };
        tracing::debug!(commit = %commit, "table committed");

        // Push
        tracing::info!(stage = %Stage::Push, branch = %branch, "pushing branch to fork");
        {
            let path = work_tree.clone();
            let name = branch.clone();
            let creds = target.creds.clone();
            blocking(Stage::Push, move || {
                WorkingCopy::open(&path)?.push(ORIGIN_REMOTE, &name, false, Some(&creds))
            })
            .await?;
        }
        if self.config.cleanup_remote_branch_on_failure {
            state.compensations.push(Compensation::DeleteRemoteBranch {
                work_tree: work_tree.clone(),
                remote: ORIGIN_REMOTE.to_string(),
                branch: branch.clone(),
                creds: Some(target.creds.clone()),
            });
        }

        // Pull request
        tracing::info!(stage = %Stage::PullRequest, base = %target.default_branch, "opening pull request");
        let draft = PullRequestDraft::render(
            snapshot,
            &self.config.table_path,
            format!("{}:{}", target.fork.owner.login, branch),
            target.default_branch.clone(),
        );
        let pull_request = self
            .host
            .create_pull_request(&target.upstream, &draft)
            .await
            .map_err(|e| PublishError::new(Stage::PullRequest, e))?;

        // Nothing left to undo
        state.compensations.clear();
        tracing::info!(number = pull_request.number, url = %pull_request.html_url, "pull request opened");

        Ok(PublishOutcome {
            pull_request,
            branch,
            fork: target.fork.full_name.clone(),
            commit: commit.to_string(),
            table_path: self.config.table_path.clone(),
            table_created,
            work_dir: state
                .work_dir
                .as_ref()
                .filter(|dir| dir.is_kept())
                .map(|dir| dir.path().to_path_buf()),
        })
    }

    /// Identity, upstream default branch, and a ready fork
    async fn resolve_target(
        &self,
        upstream: RepoSlug,
        upstream_url: String,
    ) -> Result<Target, PublishError> {
        let user = self
            .host
            .authenticated_user()
            .await
            .map_err(|e| PublishError::new(Stage::Identity, e))?;
        tracing::debug!(login = %user.login, "authenticated");

        tracing::info!(stage = %Stage::Fork, upstream = %upstream, "requesting fork");
        let upstream_info: RepoInfo = self
            .host
            .repository(&upstream)
            .await
            .map_err(|e| PublishError::new(Stage::Fork, e))?;
        let fork = self
            .host
            .create_fork(&upstream)
            .await
            .map_err(|e| PublishError::new(Stage::Fork, e))?;

        tracing::info!(stage = %Stage::AwaitFork, fork = %fork.full_name, "waiting for fork");
        let fork = ForkCoordinator::new(&self.host, self.config.fork_poll.policy())
            .await_ready(fork)
            .await
            .map_err(|e| PublishError::new(Stage::AwaitFork, e))?;

        Ok(Target {
            upstream,
            upstream_url,
            default_branch: upstream_info.default_branch,
            fork,
            creds: Credentials::new(user.login.clone(), self.token.clone()),
            user,
        })
    }
}

/// Load the table at `file` (or start a new one), merge, and write it back.
/// Returns whether the file was created.
fn merge_into_file(file: &Path, snapshot: &Snapshot) -> Result<bool, CoreError> {
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let (mut table, created) = SnapshotTable::load_or_new(file)?;
    table.merge_snapshot(snapshot)?;
    table.save(file)?;
    tracing::debug!(path = %file.display(), created, "table written");
    Ok(created)
}

/// Run `f` on the blocking pool, tagging its failure with `stage`
async fn blocking<T, E, F>(stage: Stage, f: F) -> Result<T, PublishError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<StageError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(|e| PublishError::new(stage, e)),
        Err(e) => Err(PublishError::new(stage, StageError::Join(e.to_string()))),
    }
}

/// Run compensations newest first; collect the ones that failed
async fn compensate(compensations: Vec<Compensation>) -> Vec<String> {
    let mut failures = Vec::new();
    for compensation in compensations.into_iter().rev() {
        let description = compensation.to_string();
        let result = tokio::task::spawn_blocking(move || compensation.run()).await;
        match result {
            Ok(Ok(())) => tracing::info!(action = %description, "compensation done"),
            Ok(Err(e)) => {
                tracing::warn!(action = %description, error = %e, "compensation failed");
                failures.push(format!("{}: {}", description, e));
            }
            Err(e) => {
                tracing::warn!(action = %description, error = %e, "compensation task failed");
                failures.push(format!("{}: {}", description, e));
            }
        }
    }
    failures
}
