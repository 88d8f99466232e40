use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "statshop", about = "Publish stats snapshots as pull requests", version)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress human-readable output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fork, sync, merge the snapshot into the table and open a pull request
    Publish {
        /// Publisher config (TOML)
        #[arg(long, default_value = "statshop.toml")]
        config: PathBuf,

        /// Snapshot JSON file
        #[arg(long)]
        snapshot: PathBuf,

        /// Environment variable holding the access token
        #[arg(long, default_value = "GITHUB_ACCESS_TOKEN")]
        token_env: String,

        /// Keep the local clone after the run
        #[arg(long)]
        keep_work_dir: bool,
    },

    /// Table file commands
    Table {
        #[command(subcommand)]
        cmd: TableCommand,
    },

    /// Show the pull request a snapshot would produce
    Summary {
        /// Snapshot JSON file
        #[arg(long)]
        snapshot: PathBuf,

        /// Table path named in the pull request body
        #[arg(long, default_value = libstatshop_core::config::DEFAULT_TABLE_PATH)]
        table_path: String,

        /// Base branch for the preview
        #[arg(long, default_value = "main")]
        base: String,
    },

    /// Config file commands
    Config {
        #[command(subcommand)]
        cmd: ConfigCommand,
    },
}

#[derive(Subcommand, Clone)]
pub enum TableCommand {
    /// Merge a snapshot into a table file (load-then-merge)
    Merge {
        /// Table file (TSV); a missing file starts a new table
        #[arg(long)]
        table: PathBuf,

        /// Snapshot JSON file
        #[arg(long)]
        snapshot: PathBuf,

        /// Write the result back instead of printing it
        #[arg(long)]
        write: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommand {
    /// Write a config file with defaults
    Init {
        /// Upstream repository (URL or owner/name)
        #[arg(long)]
        upstream: String,

        /// Where to write the config
        #[arg(long, default_value = "statshop.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
