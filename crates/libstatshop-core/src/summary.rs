//! Pull request synthesis from a snapshot's aggregate statistics

use chrono::Datelike;
use serde::Serialize;

use crate::types::snapshot::{MemberStats, Snapshot};

/// Aggregates shown in the pull request description.
///
/// Ties on the "most active" selections go to the lexicographically first
/// member name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    /// Sum of all-time counts across members
    pub total_messages: u64,
    /// Member with the highest all-time count, and that count
    pub most_active_all_time: Option<(String, u64)>,
    /// Member with the highest trailing-week count, and that count
    pub most_active_last_7_days: Option<(String, u64)>,
}

impl SnapshotSummary {
    pub fn compute(snapshot: &Snapshot) -> Self {
        let total_messages = snapshot
            .members
            .values()
            .fold(0u64, |total, m| total.saturating_add(m.all_time));

        Self {
            total_messages,
            most_active_all_time: max_by_count(snapshot, |m| m.all_time),
            most_active_last_7_days: max_by_count(snapshot, |m| m.last_7_days),
        }
    }
}

// Members iterate in name order, so keeping the first strict maximum
// resolves ties lexicographically.
fn max_by_count(snapshot: &Snapshot, count: impl Fn(&MemberStats) -> u64) -> Option<(String, u64)> {
    let mut best: Option<(&String, u64)> = None;
    for (name, stats) in &snapshot.members {
        let value = count(stats);
        match best {
            Some((_, top)) if value <= top => {}
            _ => best = Some((name, value)),
        }
    }
    best.map(|(name, value)| (name.clone(), value))
}

/// Title, body and refs of the pull request to submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestDraft {
    pub title: String,
    pub body: String,
    /// `<fork-owner>:<branch>`
    pub head: String,
    /// Upstream default branch
    pub base: String,
}

impl PullRequestDraft {
    /// Render the pull request for `snapshot`.
    ///
    /// `table_path` is the file the snapshot was merged into; `head` and
    /// `base` are passed through unchanged.
    pub fn render(
        snapshot: &Snapshot,
        table_path: &str,
        head: impl Into<String>,
        base: impl Into<String>,
    ) -> Self {
        let date = snapshot.timestamp;
        let short_date = format!("{}-{}-{}", date.year(), date.month(), date.day());
        let summary = SnapshotSummary::compute(snapshot);

        let mut body = format!(
            "This pull request adds the latest Slack stats from {} to the `{}` file.\n\n",
            short_date, table_path
        );
        body.push_str(&format!(
            "As of {}, there have been {} messages sent in the Slack.",
            date.format("%a, %d %b %Y %H:%M:%S GMT"),
            summary.total_messages
        ));
        if let Some((name, count)) = &summary.most_active_all_time {
            body.push_str(&format!(
                " The most active user of all time is `{}`, who has sent {} messages in total.",
                name, count
            ));
        }
        if let Some((name, count)) = &summary.most_active_last_7_days {
            body.push_str(&format!(
                " The most active user in the past 7 days is `{}`, who sent {} messages.",
                name, count
            ));
        }
        body.push_str("\n\n_Note: all times are UTC._\n\n");
        body.push_str(&"-".repeat(80));
        body.push_str(
            "\n\n_This pull request is brought to you by \
             [`slack-stats-collector`](https://github.com/hackclub/slack-stats-collector)_",
        );

        Self {
            title: format!("Add latest Slack stats from {}", short_date),
            body,
            head: head.into(),
            base: base.into(),
        }
    }
}
