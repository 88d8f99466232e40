use chrono::{DateTime, Utc};

/// Branch name for a snapshot taken at `timestamp`: `YYYY-MM-DD@HH-MM-SS` (UTC).
///
/// Names sort in chronological order and are unique at one-second granularity.
pub fn branch_name_for(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d@%H-%M-%S").to_string()
}
