use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::types::repo::RepoSlug;

/// Default path of the table file inside the target repository
pub const DEFAULT_TABLE_PATH: &str = "slack_stats.tsv";

/// Default commit message for snapshot commits
pub const DEFAULT_COMMIT_MESSAGE: &str = "Add latest Slack stats";

/// Default REST API endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Publisher configuration, usually loaded from `statshop.toml`.
///
/// Credentials are not part of the config; the publisher receives them
/// separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Upstream repository (URL or `owner/name`)
    pub upstream: String,
    /// Git URL to fetch upstream from, if not the github.com HTTPS URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_git_url: Option<String>,
    /// Table file path relative to the repository root
    pub table_path: String,
    pub commit_message: String,
    pub api_base_url: String,
    /// Parent directory for ephemeral clones (system temp dir if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir_parent: Option<PathBuf>,
    /// Keep the clone around after the run
    pub keep_work_dir: bool,
    /// Delete the pushed branch again if a later stage fails
    pub cleanup_remote_branch_on_failure: bool,
    pub fork_poll: ForkPollConfig,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            upstream: String::new(),
            upstream_git_url: None,
            table_path: DEFAULT_TABLE_PATH.to_string(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            work_dir_parent: None,
            keep_work_dir: false,
            cleanup_remote_branch_on_failure: true,
            fork_poll: ForkPollConfig::default(),
        }
    }
}

/// Fork readiness polling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkPollConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for ForkPollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ForkPollConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(Duration::from_millis(self.interval_ms), self.max_attempts)
    }
}

impl PublisherConfig {
    pub fn new(upstream: impl Into<String>) -> Self {
        Self {
            upstream: upstream.into(),
            ..Self::default()
        }
    }

    /// Upstream owner/name
    pub fn upstream_slug(&self) -> Result<RepoSlug, CoreError> {
        RepoSlug::parse(&self.upstream)
    }

    /// URL used to fetch upstream history
    pub fn upstream_fetch_url(&self) -> Result<String, CoreError> {
        match &self.upstream_git_url {
            Some(url) => Ok(url.clone()),
            None => Ok(self.upstream_slug()?.github_clone_url()),
        }
    }

    /// Check the fields a publish run depends on
    pub fn validate(&self) -> Result<(), CoreError> {
        self.upstream_slug()?;

        let table = Path::new(&self.table_path);
        if self.table_path.is_empty()
            || table.is_absolute()
            || table.components().any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(CoreError::InvalidArgs(format!(
                "table_path must be a relative path inside the repository: '{}'",
                self.table_path
            )));
        }
        if self.commit_message.trim().is_empty() {
            return Err(CoreError::InvalidArgs(
                "commit_message must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load publisher config from a TOML file
pub fn load_config(path: &Path) -> Result<PublisherConfig, CoreError> {
    let content = std::fs::read_to_string(path)?;
    let config: PublisherConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Save publisher config to a TOML file
pub fn save_config(path: &Path, config: &PublisherConfig) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
