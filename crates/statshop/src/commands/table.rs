//! Table command implementation

use libstatshop_core::{Snapshot, SnapshotTable};
use serde::Serialize;

use crate::cli::{Cli, TableCommand};
use crate::error::CliError;
use crate::output::{output_success, print_human};

#[derive(Serialize)]
struct MergeOutput {
    table: String,
    created: bool,
    written: bool,
    entities: usize,
    columns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    tsv: Option<String>,
}

pub fn run(cli: &Cli, cmd: TableCommand) -> Result<(), CliError> {
    match cmd {
        TableCommand::Merge {
            table,
            snapshot,
            write,
        } => {
            let snapshot = Snapshot::load(&snapshot)?;
            let (mut merged, created) = SnapshotTable::load_or_new(&table)?;
            merged.merge_snapshot(&snapshot)?;

            let tsv = merged.to_tsv();
            if write {
                if let Some(parent) = table.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(libstatshop_core::CoreError::from)?;
                }
                merged.save(&table)?;
                print_human(cli, &format!("Merged snapshot into {}", table.display()));
            } else if !cli.json {
                // The merged table is the command's output, even in quiet mode
                print!("{}", tsv);
            }

            output_success(
                cli,
                MergeOutput {
                    table: table.display().to_string(),
                    created,
                    written: write,
                    entities: merged.entities().count(),
                    columns: merged.dates().count(),
                    tsv: (!write).then_some(tsv),
                },
            );
            Ok(())
        }
    }
}
