use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Owner/name identity of a hosted repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse a repository reference.
    ///
    /// Accepts `owner/name`, `https://github.com/owner/name(.git)`,
    /// `git@github.com:owner/name.git` and `ssh://git@github.com/owner/name.git`.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let trimmed = input.trim().trim_end_matches('/');

        let path = if let Some(rest) = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .or_else(|| trimmed.strip_prefix("ssh://"))
            .or_else(|| trimmed.strip_prefix("git://"))
        {
            // Drop the host (and any user@ prefix)
            match rest.split_once('/') {
                Some((_host, path)) => path,
                None => return Err(invalid(input)),
            }
        } else if let Some((user_host, path)) = trimmed.split_once(':') {
            // scp-like syntax: git@github.com:owner/name.git
            if !user_host.contains('@') {
                return Err(invalid(input));
            }
            path
        } else {
            trimmed
        };

        let path = path.strip_suffix(".git").unwrap_or(path);
        let mut parts = path.split('/').filter(|p| !p.is_empty());
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) => Ok(Self::new(owner, name)),
            _ => Err(invalid(input)),
        }
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// HTTPS clone URL on github.com
    pub fn github_clone_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.name)
    }
}

fn invalid(input: &str) -> CoreError {
    CoreError::InvalidArgs(format!("not a repository reference: '{}'", input))
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoSlug {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
