use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Message counts observed for one member at snapshot time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStats {
    /// Messages sent in the trailing seven days
    #[serde(rename = "last7Days")]
    pub last_7_days: u64,
    /// Messages sent since the workspace was created
    pub all_time: u64,
}

/// One timestamped set of per-member observations.
///
/// Serialized form matches what the stats collector emits:
///
/// ```json
/// {
///   "timestamp": "2015-11-27T04:39:45.737Z",
///   "members": {
///     "zrl": { "last7Days": 421, "allTime": 3232 }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub members: BTreeMap<String, MemberStats>,
}

impl Snapshot {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            members: BTreeMap::new(),
        }
    }

    /// Builder-style insert, mostly useful in tests and tools
    pub fn with_member(mut self, name: impl Into<String>, last_7_days: u64, all_time: u64) -> Self {
        self.members.insert(
            name.into(),
            MemberStats {
                last_7_days,
                all_time,
            },
        );
        self
    }

    /// Load a snapshot from a JSON file
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let snapshot = serde_json::from_str(&content)?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parses_collector_json() {
        let json = r#"{
            "timestamp": "2015-11-27T04:39:45.737Z",
            "members": {
                "exampleUser": { "last7Days": 242, "allTime": 1382 },
                "zrl": { "last7Days": 421, "allTime": 3232 }
            }
        }"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(
            snapshot.timestamp,
            Utc.with_ymd_and_hms(2015, 11, 27, 4, 39, 45).unwrap()
                + chrono::Duration::milliseconds(737)
        );
        assert_eq!(snapshot.members.len(), 2);
        assert_eq!(snapshot.members["zrl"].last_7_days, 421);
        assert_eq!(snapshot.members["exampleUser"].all_time, 1382);
    }

    #[test]
    fn test_missing_members_is_empty() {
        let snapshot: Snapshot =
            serde_json::from_str(r#"{"timestamp": "2015-11-27T04:39:45Z"}"#).unwrap();
        assert!(snapshot.members.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let snapshot = Snapshot::new(Utc.with_ymd_and_hms(2015, 1, 2, 0, 0, 0).unwrap())
            .with_member("amy", 100, 832);
        std::fs::write(&path, serde_json::to_string(&snapshot).unwrap()).unwrap();

        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }
}
