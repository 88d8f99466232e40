use thiserror::Error;

/// Errors from the repository host API
#[derive(Debug, Error)]
pub enum HostError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unauthorized: token missing, invalid or lacking scope ({0})")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Fork not ready after {attempts} attempts: {last_error}")]
    ForkTimeout { attempts: u32, last_error: String },
}

impl HostError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HostError::Http(_) | HostError::NotFound(_) | HostError::Server(_)
        )
    }
}
