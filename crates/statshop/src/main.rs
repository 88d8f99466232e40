mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &cli.command {
        Command::Publish {
            config,
            snapshot,
            token_env,
            keep_work_dir,
        } => commands::publish::run(&cli, config, snapshot, token_env, *keep_work_dir).await,
        Command::Table { cmd } => commands::table::run(&cli, cmd.clone()),
        Command::Summary {
            snapshot,
            table_path,
            base,
        } => commands::summary::run(&cli, snapshot, table_path, base),
        Command::Config { cmd } => commands::config::run(&cli, cmd.clone()),
    };

    if let Err(e) = result {
        output::output_error(&cli, &e);
        std::process::exit(e.exit_code());
    }
}
