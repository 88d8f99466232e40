use std::fmt;

use chrono::{DateTime, Utc};
use git2::{Cred, RemoteCallbacks};

/// Short-lived HTTPS credentials for remote operations.
///
/// Passed per call and never stored on a working copy.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub token: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            token: token.into(),
        }
    }

    /// Remote callbacks answering plaintext user/password challenges with
    /// `login` / `token`
    pub(crate) fn callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();
        let mut tries = 0;
        callbacks.credentials(move |_url, _username_from_url, allowed| {
            // libgit2 keeps asking while the server rejects us
            tries += 1;
            if tries > 1 {
                return Err(git2::Error::from_str("authentication rejected"));
            }
            if allowed.is_user_pass_plaintext() {
                Cred::userpass_plaintext(&self.login, &self.token)
            } else {
                Cred::default()
            }
        });
        callbacks
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Identity recorded as author and committer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
    pub when: DateTime<Utc>,
}

impl CommitAuthor {
    pub fn new(name: impl Into<String>, email: impl Into<String>, when: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            when,
        }
    }

    pub(crate) fn signature(&self) -> Result<git2::Signature<'static>, git2::Error> {
        let time = git2::Time::new(self.when.timestamp(), 0);
        git2::Signature::new(&self.name, &self.email, &time)
    }
}
