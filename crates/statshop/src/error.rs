use std::path::PathBuf;

use libstatshop::{FailureKind, PublishError};
use libstatshop_core::CoreError;
use thiserror::Error;

/// Errors surfaced by the command line
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("access token not set: environment variable {0} is empty or missing")]
    MissingToken(String),

    #[error("refusing to overwrite {}; pass --force", .0.display())]
    AlreadyExists(PathBuf),
}

impl CliError {
    /// Stable code for the JSON error envelope
    pub fn error_code(&self) -> &'static str {
        match self {
            CliError::Publish(e) => e.kind().code(),
            CliError::Core(e) => e.error_code(),
            CliError::MissingToken(_) => "missing_token",
            CliError::AlreadyExists(_) => "already_exists",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Publish(e) => e.kind().exit_code(),
            CliError::Core(CoreError::InvalidArgs(_)) | CliError::Core(CoreError::TomlParse(_)) => {
                FailureKind::InvalidConfig.exit_code()
            }
            CliError::Core(CoreError::InvalidEntity { .. }) => {
                FailureKind::InvalidSnapshot.exit_code()
            }
            CliError::Core(CoreError::MergeConflict { .. }) => {
                FailureKind::MergeConflictInTable.exit_code()
            }
            CliError::Core(_) => 1,
            CliError::MissingToken(_) | CliError::AlreadyExists(_) => 2,
        }
    }

    /// Extra context for the JSON envelope
    pub fn details(&self) -> serde_json::Value {
        match self {
            CliError::Publish(e) => serde_json::json!({
                "stage": e.stage,
                "kind": e.kind(),
                "compensation_failures": e.compensation_failures,
            }),
            _ => serde_json::Value::Null,
        }
    }

    /// Hints printed under the error in human output
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            CliError::Publish(e) if !e.compensation_failures.is_empty() => e
                .compensation_failures
                .iter()
                .map(|failure| format!("clean up manually: {}", failure))
                .collect(),
            CliError::Publish(e) if e.kind() == FailureKind::BranchExists => {
                vec!["a branch for this snapshot timestamp is already on the fork".to_string()]
            }
            CliError::MissingToken(var) => vec![format!("export {}=<token>", var)],
            _ => Vec::new(),
        }
    }
}
