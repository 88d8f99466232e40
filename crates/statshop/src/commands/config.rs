//! Config command implementation

use libstatshop_core::{save_config, PublisherConfig};
use serde::Serialize;

use crate::cli::{Cli, ConfigCommand};
use crate::error::CliError;
use crate::output::{output_success, print_human};

#[derive(Serialize)]
struct InitOutput {
    path: String,
    config: PublisherConfig,
}

pub fn run(cli: &Cli, cmd: ConfigCommand) -> Result<(), CliError> {
    match cmd {
        ConfigCommand::Init {
            upstream,
            path,
            force,
        } => {
            if path.exists() && !force {
                return Err(CliError::AlreadyExists(path));
            }

            let config = PublisherConfig::new(upstream);
            config.validate()?;
            save_config(&path, &config)?;

            print_human(cli, &format!("Wrote {}", path.display()));
            output_success(
                cli,
                InitOutput {
                    path: path.display().to_string(),
                    config,
                },
            );
            Ok(())
        }
    }
}
