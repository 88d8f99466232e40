//! Publish command implementation

use std::path::Path;

use libstatshop::SnapshotPublisher;
use libstatshop_core::{load_config, Snapshot};
use libstatshop_github::GitHubClient;

use crate::cli::Cli;
use crate::error::CliError;
use crate::output::{output_success, print_human};

pub async fn run(
    cli: &Cli,
    config_path: &Path,
    snapshot_path: &Path,
    token_env: &str,
    keep_work_dir: bool,
) -> Result<(), CliError> {
    let mut config = load_config(config_path)?;
    if keep_work_dir {
        config.keep_work_dir = true;
    }
    let snapshot = Snapshot::load(snapshot_path)?;

    let token = match std::env::var(token_env) {
        Ok(token) if !token.trim().is_empty() => token,
        _ => return Err(CliError::MissingToken(token_env.to_string())),
    };

    let host = GitHubClient::new(config.api_base_url.clone(), token.clone());
    let publisher = SnapshotPublisher::new(config, host, token);
    let outcome = publisher.publish(&snapshot).await?;

    print_human(
        cli,
        &format!(
            "Opened pull request #{}: {}",
            outcome.pull_request.number, outcome.pull_request.html_url
        ),
    );
    print_human(cli, &format!("  branch: {}:{}", outcome.fork, outcome.branch));
    if let Some(dir) = &outcome.work_dir {
        print_human(cli, &format!("  clone kept at {}", dir.display()));
    }
    output_success(cli, outcome);
    Ok(())
}
