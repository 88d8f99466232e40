//! Summary command implementation

use std::path::Path;

use libstatshop_core::{branch_name_for, PullRequestDraft, Snapshot, SnapshotSummary};
use serde::Serialize;

use crate::cli::Cli;
use crate::error::CliError;
use crate::output::{output_success, print_human};

#[derive(Serialize)]
struct SummaryOutput {
    branch: String,
    summary: SnapshotSummary,
    pull_request: PullRequestDraft,
}

pub fn run(cli: &Cli, snapshot_path: &Path, table_path: &str, base: &str) -> Result<(), CliError> {
    let snapshot = Snapshot::load(snapshot_path)?;
    let branch = branch_name_for(snapshot.timestamp);
    let summary = SnapshotSummary::compute(&snapshot);
    let draft = PullRequestDraft::render(&snapshot, table_path, branch.clone(), base);

    print_human(cli, &format!("branch: {}", branch));
    print_human(cli, &format!("title:  {}", draft.title));
    print_human(cli, "");
    print_human(cli, &draft.body);

    output_success(
        cli,
        SummaryOutput {
            branch,
            summary,
            pull_request: draft,
        },
    );
    Ok(())
}
