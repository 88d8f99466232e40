use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by the pure core (table handling, config, parsing)
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("table parse error at line {line}: {message}")]
    TableParse { line: usize, message: String },

    #[error(
        "merge conflict for '{entity}' at {timestamp}: table has {existing}, snapshot has {incoming}"
    )]
    MergeConflict {
        entity: String,
        timestamp: DateTime<Utc>,
        existing: u64,
        incoming: u64,
    },

    #[error("invalid entity name {entity:?}: {reason}")]
    InvalidEntity { entity: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl CoreError {
    /// Get the error code for JSON output
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::InvalidArgs(_) => "invalid_args",
            CoreError::TableParse { .. } => "table_unreadable",
            CoreError::MergeConflict { .. } => "merge_conflict_in_table",
            CoreError::InvalidEntity { .. } => "invalid_snapshot",
            CoreError::Io(_) => "io_error",
            CoreError::Json(_) => "invalid_args",
            CoreError::TomlParse(_) => "invalid_args",
            CoreError::TomlSerialize(_) => "internal_error",
        }
    }

    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        CoreError::TableParse {
            line,
            message: message.into(),
        }
    }
}
