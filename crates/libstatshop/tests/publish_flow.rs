//! End-to-end publish runs against local bare repositories and a fake host

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use git2::build::RepoBuilder;
use git2::{Oid, Repository, Signature};
use libstatshop_core::{PublisherConfig, PullRequestDraft, RepoSlug, Snapshot};
use libstatshop_github::{
    AuthenticatedUser, ForkedRepo, HostError, PullRequest, RepoInfo, RepositoryHost,
};
use libstatshop::{FailureKind, SnapshotPublisher, Stage};
use tempfile::TempDir;

const BRANCH: &str = "2015-11-27@04-39-45";

fn commit_file(repo: &Repository, branch: &str, path: &str, content: &str) -> Oid {
    let refname = format!("refs/heads/{}", branch);
    let parent = repo
        .find_reference(&refname)
        .ok()
        .map(|r| r.peel_to_commit().unwrap());

    let base_tree = parent.as_ref().map(|c| c.tree().unwrap());
    let mut builder = repo.treebuilder(base_tree.as_ref()).unwrap();
    let blob = repo.blob(content.as_bytes()).unwrap();
    builder.insert(path, blob, 0o100644).unwrap();
    let tree = repo.find_tree(builder.write().unwrap()).unwrap();

    let sig = Signature::now("fixture", "fixture@example.com").unwrap();
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some(&refname), &sig, &sig, "fixture", &tree, &parents)
        .unwrap()
}

/// Content of `path` at the tip of `branch`, if both exist
fn read_file(repo: &Repository, branch: &str, path: &str) -> Option<String> {
    let reference = repo.find_reference(&format!("refs/heads/{}", branch)).ok()?;
    let tree = reference.peel_to_tree().ok()?;
    let entry = tree.get_path(Path::new(path)).ok()?;
    let blob = repo.find_blob(entry.id()).ok()?;
    Some(String::from_utf8_lossy(blob.content()).into_owned())
}

fn has_branch(repo: &Repository, branch: &str) -> bool {
    repo.find_reference(&format!("refs/heads/{}", branch)).is_ok()
}

struct Fixture {
    temp: TempDir,
    upstream: Repository,
    fork: Repository,
    upstream_path: PathBuf,
    fork_path: PathBuf,
}

impl Fixture {
    /// Upstream `main` with a README; the fork is cloned before `table`
    /// (if any) lands upstream, so it only reaches the fork through sync
    fn new(table: Option<&str>) -> Self {
        let temp = TempDir::new().unwrap();
        let upstream_path = temp.path().join("upstream.git");
        let fork_path = temp.path().join("fork.git");

        let upstream = Repository::init_bare(&upstream_path).unwrap();
        upstream.set_head("refs/heads/main").unwrap();
        commit_file(&upstream, "main", "README.md", "stats\n");

        let fork = RepoBuilder::new()
            .bare(true)
            .clone(upstream_path.to_str().unwrap(), &fork_path)
            .unwrap();

        if let Some(table) = table {
            commit_file(&upstream, "main", "slack_stats.tsv", table);
        }

        Self {
            temp,
            upstream,
            fork,
            upstream_path,
            fork_path,
        }
    }

    fn config(&self) -> PublisherConfig {
        let mut config = PublisherConfig::new("hackclub/stats");
        config.upstream_git_url = Some(self.upstream_path.to_str().unwrap().to_string());
        config.work_dir_parent = Some(self.temp.path().join("work"));
        config.fork_poll.interval_ms = 1;
        config.fork_poll.max_attempts = 3;
        config
    }

    fn work_parent(&self) -> PathBuf {
        self.temp.path().join("work")
    }
}

/// Host with scripted readiness and pull request responses
struct FakeHost {
    fork_clone_url: String,
    fork_ready: bool,
    reject_pull_requests: bool,
    probes: AtomicU32,
    drafts: Mutex<Vec<(RepoSlug, PullRequestDraft)>>,
}

impl FakeHost {
    fn new(fixture: &Fixture) -> Self {
        Self {
            fork_clone_url: fixture.fork_path.to_str().unwrap().to_string(),
            fork_ready: true,
            reject_pull_requests: false,
            probes: AtomicU32::new(0),
            drafts: Mutex::new(Vec::new()),
        }
    }

    fn repo(owner: &str, name: &str, clone_url: &str) -> RepoInfo {
        RepoInfo {
            name: name.to_string(),
            full_name: format!("{}/{}", owner, name),
            owner: libstatshop_github::types::Owner {
                login: owner.to_string(),
            },
            clone_url: clone_url.to_string(),
            default_branch: "main".to_string(),
        }
    }
}

#[async_trait]
impl RepositoryHost for FakeHost {
    async fn create_fork(&self, _upstream: &RepoSlug) -> Result<ForkedRepo, HostError> {
        Ok(Self::repo("statbot", "stats", &self.fork_clone_url))
    }

    async fn repository(&self, slug: &RepoSlug) -> Result<RepoInfo, HostError> {
        Ok(Self::repo(&slug.owner, &slug.name, "unused"))
    }

    async fn authenticated_user(&self) -> Result<AuthenticatedUser, HostError> {
        Ok(AuthenticatedUser {
            login: "statbot".to_string(),
            name: None,
            email: None,
        })
    }

    async fn probe_contents(&self, slug: &RepoSlug) -> Result<(), HostError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.fork_ready {
            Ok(())
        } else {
            Err(HostError::NotFound(format!("{} is empty", slug)))
        }
    }

    async fn create_pull_request(
        &self,
        upstream: &RepoSlug,
        draft: &PullRequestDraft,
    ) -> Result<PullRequest, HostError> {
        self.drafts
            .lock()
            .unwrap()
            .push((upstream.clone(), draft.clone()));
        if self.reject_pull_requests {
            return Err(HostError::Validation(
                "A pull request already exists".to_string(),
            ));
        }
        Ok(PullRequest {
            number: 42,
            html_url: "https://github.com/hackclub/stats/pull/42".to_string(),
        })
    }
}

fn snapshot() -> Snapshot {
    let timestamp = Utc.with_ymd_and_hms(2015, 11, 27, 4, 39, 45).unwrap()
        + chrono::Duration::milliseconds(737);
    Snapshot::new(timestamp).with_member("amy", 40, 832)
}

#[tokio::test]
async fn test_publish_creates_table_branch_and_pull_request() {
    let fx = Fixture::new(None);
    let publisher = SnapshotPublisher::new(fx.config(), FakeHost::new(&fx), "token");

    let outcome = publisher.publish(&snapshot()).await.unwrap();

    assert_eq!(outcome.branch, BRANCH);
    assert_eq!(outcome.fork, "statbot/stats");
    assert_eq!(outcome.pull_request.number, 42);
    assert!(outcome.table_created);
    assert!(outcome.work_dir.is_none());

    assert_eq!(
        read_file(&fx.fork, BRANCH, "slack_stats.tsv").unwrap(),
        "Entity\t2015-11-27T04:39:45.737Z\namy\t832\n"
    );
    // The fork was synced before branching
    let upstream_tip = fx.upstream.refname_to_id("refs/heads/main").unwrap();
    assert_eq!(fx.fork.refname_to_id("refs/heads/main").unwrap(), upstream_tip);
    let branch_commit = fx
        .fork
        .find_reference(&format!("refs/heads/{}", BRANCH))
        .unwrap()
        .peel_to_commit()
        .unwrap();
    assert_eq!(branch_commit.parent_id(0).unwrap(), upstream_tip);
    assert_eq!(branch_commit.message(), Some("Add latest Slack stats"));
    assert_eq!(
        branch_commit.author().email(),
        Some("statbot@users.noreply.github.com")
    );

    let drafts = publisher.host().drafts.lock().unwrap();
    assert_eq!(drafts.len(), 1);
    let (upstream, draft) = &drafts[0];
    assert_eq!(upstream.full_name(), "hackclub/stats");
    assert_eq!(draft.title, "Add latest Slack stats from 2015-11-27");
    assert_eq!(draft.head, format!("statbot:{}", BRANCH));
    assert_eq!(draft.base, "main");

    // Work dir was removed
    let leftovers = std::fs::read_dir(fx.work_parent()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_publish_merges_into_existing_table() {
    let fx = Fixture::new(Some("Users\t2015-11-20T00:00:00.000Z\namy\t800\nbob\t5\n"));
    let publisher = SnapshotPublisher::new(fx.config(), FakeHost::new(&fx), "token");

    let outcome = publisher.publish(&snapshot()).await.unwrap();
    assert!(!outcome.table_created);

    assert_eq!(
        read_file(&fx.fork, BRANCH, "slack_stats.tsv").unwrap(),
        "Users\t2015-11-20T00:00:00.000Z\t2015-11-27T04:39:45.737Z\n\
         amy\t800\t832\n\
         bob\t5\t\n"
    );
}

#[tokio::test]
async fn test_publish_keeps_columns_after_leading_blank_line() {
    let fx = Fixture::new(Some("\nEntity\t2015-11-25T00:00:00.000Z\namy\t445\n"));
    let publisher = SnapshotPublisher::new(fx.config(), FakeHost::new(&fx), "token");

    publisher.publish(&snapshot()).await.unwrap();

    assert_eq!(
        read_file(&fx.fork, BRANCH, "slack_stats.tsv").unwrap(),
        "Entity\t2015-11-25T00:00:00.000Z\t2015-11-27T04:39:45.737Z\n\
         amy\t445\t832\n"
    );
}

#[tokio::test]
async fn test_unwritable_member_name_stops_before_push() {
    let fx = Fixture::new(None);
    let publisher = SnapshotPublisher::new(fx.config(), FakeHost::new(&fx), "token");
    let snapshot = snapshot().with_member("bad\tname", 1, 7);

    let err = publisher.publish(&snapshot).await.unwrap_err();
    assert_eq!(err.stage, Stage::MergeTable);
    assert_eq!(err.kind(), FailureKind::InvalidSnapshot);
    assert!(!has_branch(&fx.fork, BRANCH));
}

#[tokio::test]
async fn test_rerun_reports_branch_collision() {
    let fx = Fixture::new(None);
    let publisher = SnapshotPublisher::new(fx.config(), FakeHost::new(&fx), "token");
    publisher.publish(&snapshot()).await.unwrap();
    let first_tip = fx
        .fork
        .refname_to_id(&format!("refs/heads/{}", BRANCH))
        .unwrap();

    let err = publisher.publish(&snapshot()).await.unwrap_err();
    assert_eq!(err.stage, Stage::Branch);
    assert_eq!(err.kind(), FailureKind::BranchExists);

    // The earlier branch is untouched
    assert_eq!(
        fx.fork
            .refname_to_id(&format!("refs/heads/{}", BRANCH))
            .unwrap(),
        first_tip
    );
}

#[tokio::test]
async fn test_rejected_pull_request_deletes_pushed_branch() {
    let fx = Fixture::new(None);
    let mut host = FakeHost::new(&fx);
    host.reject_pull_requests = true;
    let publisher = SnapshotPublisher::new(fx.config(), host, "token");

    let err = publisher.publish(&snapshot()).await.unwrap_err();
    assert_eq!(err.stage, Stage::PullRequest);
    assert_eq!(err.kind(), FailureKind::PullRequestRejected);
    assert!(err.compensation_failures.is_empty());
    assert!(!has_branch(&fx.fork, BRANCH));
}

#[tokio::test]
async fn test_rejected_pull_request_keeps_branch_without_cleanup() {
    let fx = Fixture::new(None);
    let mut host = FakeHost::new(&fx);
    host.reject_pull_requests = true;
    let mut config = fx.config();
    config.cleanup_remote_branch_on_failure = false;
    let publisher = SnapshotPublisher::new(config, host, "token");

    let err = publisher.publish(&snapshot()).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::PullRequestRejected);
    assert!(has_branch(&fx.fork, BRANCH));
}

#[tokio::test]
async fn test_conflicting_table_cell_stops_before_push() {
    let fx = Fixture::new(Some("Entity\t2015-11-27T04:39:45.737Z\namy\t700\n"));
    let publisher = SnapshotPublisher::new(fx.config(), FakeHost::new(&fx), "token");

    let err = publisher.publish(&snapshot()).await.unwrap_err();
    assert_eq!(err.stage, Stage::MergeTable);
    assert_eq!(err.kind(), FailureKind::MergeConflictInTable);
    assert!(!has_branch(&fx.fork, BRANCH));
    assert!(publisher.host().drafts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unready_fork_times_out() {
    let fx = Fixture::new(None);
    let mut host = FakeHost::new(&fx);
    host.fork_ready = false;
    let publisher = SnapshotPublisher::new(fx.config(), host, "token");

    let err = publisher.publish(&snapshot()).await.unwrap_err();
    assert_eq!(err.stage, Stage::AwaitFork);
    assert_eq!(err.kind(), FailureKind::ForkTimeout);
    assert_eq!(publisher.host().probes.load(Ordering::SeqCst), 3);
    assert!(!fx.work_parent().exists());
}

#[tokio::test]
async fn test_invalid_config_fails_in_prepare() {
    let fx = Fixture::new(None);
    let mut config = fx.config();
    config.table_path = "../outside.tsv".to_string();
    let publisher = SnapshotPublisher::new(config, FakeHost::new(&fx), "token");

    let err = publisher.publish(&snapshot()).await.unwrap_err();
    assert_eq!(err.stage, Stage::Prepare);
    assert_eq!(err.kind(), FailureKind::InvalidConfig);
    assert_eq!(publisher.host().probes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_keep_work_dir_leaves_clone() {
    let fx = Fixture::new(None);
    let mut config = fx.config();
    config.keep_work_dir = true;
    let publisher = SnapshotPublisher::new(config, FakeHost::new(&fx), "token");

    let outcome = publisher.publish(&snapshot()).await.unwrap();
    let dir = outcome.work_dir.unwrap();
    assert!(dir.starts_with(fx.work_parent()));
    assert_eq!(
        std::fs::read_to_string(dir.join("slack_stats.tsv")).unwrap(),
        "Entity\t2015-11-27T04:39:45.737Z\namy\t832\n"
    );
}
