//! Wide-format snapshot table
//!
//! The table holds one column per observation date and one row per entity,
//! where each cell is the cumulative message count for that entity as of
//! that date:
//!
//! ```text
//! Entity  2015-11-25T00:00:00.000Z  2015-11-26T00:00:00.000Z
//! amy     445                       600
//! bobby   202                       655
//! ```
//!
//! Serialization is byte-for-byte deterministic: dates ascend, entities are
//! sorted lexicographically, and every row ends with a newline. Missing cells
//! render as empty strings.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

use crate::error::CoreError;
use crate::types::snapshot::Snapshot;

/// Label used in the first header cell of a freshly created table
pub const DEFAULT_LABEL: &str = "Entity";

/// Cell separator
pub const SEPARATOR: char = '\t';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotTable {
    label: String,
    dates: BTreeSet<DateTime<Utc>>,
    entries: BTreeMap<String, BTreeMap<DateTime<Utc>, u64>>,
}

impl Default for SnapshotTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotTable {
    pub fn new() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            dates: BTreeSet::new(),
            entries: BTreeMap::new(),
        }
    }

    /// First header cell
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Observation dates, ascending
    pub fn dates(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.dates.iter()
    }

    /// Entity names, sorted
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() && self.entries.is_empty()
    }

    /// Get the count recorded for an entity at a date, if any
    pub fn count(&self, entity: &str, date: DateTime<Utc>) -> Option<u64> {
        self.entries
            .get(entity)
            .and_then(|row| row.get(&normalize(date)))
            .copied()
    }

    /// Set the count for an entity at a date, registering the date as a
    /// column if it is new. Overwrites any previous value.
    pub fn set_count(&mut self, entity: &str, date: DateTime<Utc>, count: u64) {
        let date = normalize(date);
        self.dates.insert(date);
        self.entries
            .entry(entity.to_string())
            .or_default()
            .insert(date, count);
    }

    /// Fold a snapshot's cumulative counts in as a column.
    ///
    /// Existing columns are kept. A cell that already holds a different value
    /// for the snapshot's date is a conflict; an identical value is a no-op,
    /// so merging the same snapshot twice leaves the table unchanged.
    pub fn merge_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), CoreError> {
        let date = normalize(snapshot.timestamp);

        // Check every cell first so a rejected snapshot leaves the table untouched
        for (entity, stats) in &snapshot.members {
            check_entity_name(entity)?;
            if let Some(existing) = self.count(entity, date) {
                if existing != stats.all_time {
                    return Err(CoreError::MergeConflict {
                        entity: entity.clone(),
                        timestamp: date,
                        existing,
                        incoming: stats.all_time,
                    });
                }
            }
        }

        self.dates.insert(date);
        for (entity, stats) in &snapshot.members {
            self.set_count(entity, date, stats.all_time);
        }
        Ok(())
    }

    /// Render the table as TSV
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();

        out.push_str(&self.label);
        for date in &self.dates {
            out.push(SEPARATOR);
            out.push_str(&format_date(*date));
        }
        out.push('\n');

        for (entity, row) in &self.entries {
            out.push_str(entity);
            for date in &self.dates {
                out.push(SEPARATOR);
                if let Some(count) = row.get(date) {
                    out.push_str(&count.to_string());
                }
            }
            out.push('\n');
        }

        out
    }

    /// Parse a TSV document produced by [`SnapshotTable::to_tsv`].
    ///
    /// A blank or whitespace-only document yields an empty table. Blank
    /// lines before the header are skipped. The header label is kept so that
    /// re-serializing reproduces the input.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let mut lines = input
            .lines()
            .enumerate()
            .skip_while(|(_, line)| line.trim().is_empty());

        let (header_idx, header) = match lines.next() {
            Some(first) => first,
            None => return Ok(Self::new()),
        };
        let header_line = header_idx + 1;

        let mut header_cells = header.split(SEPARATOR);
        let label = header_cells.next().unwrap_or_default();
        if label.is_empty() {
            return Err(CoreError::parse(header_line, "header has no label cell"));
        }

        let mut columns = Vec::new();
        let mut table = Self {
            label: label.to_string(),
            ..Self::new()
        };
        for cell in header_cells {
            let date = parse_date(cell).map_err(|e| CoreError::parse(header_line, e))?;
            if !table.dates.insert(date) {
                return Err(CoreError::parse(
                    header_line,
                    format!("duplicate column '{}'", cell),
                ));
            }
            columns.push(date);
        }

        for (idx, line) in lines {
            let line_no = idx + 1;
            if line.is_empty() {
                continue;
            }

            let mut cells = line.split(SEPARATOR);
            let entity = cells.next().unwrap_or_default();
            if entity.is_empty() {
                return Err(CoreError::parse(line_no, "row has no entity name"));
            }
            if table.entries.contains_key(entity) {
                return Err(CoreError::parse(
                    line_no,
                    format!("duplicate entity '{}'", entity),
                ));
            }

            let mut row = BTreeMap::new();
            for (col, cell) in cells.enumerate() {
                let date = columns.get(col).ok_or_else(|| {
                    CoreError::parse(
                        line_no,
                        format!("row has more cells than the header ({} columns)", columns.len()),
                    )
                })?;
                if cell.is_empty() {
                    continue;
                }
                let count: u64 = cell.parse().map_err(|_| {
                    CoreError::parse(line_no, format!("invalid count '{}'", cell))
                })?;
                row.insert(*date, count);
            }
            table.entries.insert(entity.to_string(), row);
        }

        Ok(table)
    }

    /// Load the table stored at `path`, or start an empty one if the file
    /// does not exist. The flag is true when the file was missing.
    pub fn load_or_new(path: &Path) -> Result<(Self, bool), CoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok((Self::parse(&content)?, false)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok((Self::new(), true)),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the table as TSV, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_tsv())?;
        Ok(())
    }
}

// Names must survive a TSV round trip as a single leading cell
fn check_entity_name(entity: &str) -> Result<(), CoreError> {
    let reason = if entity.is_empty() {
        "name is empty"
    } else if entity.contains(SEPARATOR) {
        "name contains a tab"
    } else if entity.contains(['\n', '\r']) {
        "name contains a line break"
    } else {
        return Ok(());
    };
    Err(CoreError::InvalidEntity {
        entity: entity.to_string(),
        reason: reason.to_string(),
    })
}

/// Render a date the way the table header does (ISO-8601, millisecond precision)
pub fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_date(cell: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(cell)
        .map(|d| normalize(d.with_timezone(&Utc)))
        .map_err(|e| format!("invalid timestamp '{}': {}", cell, e))
}

// Columns are keyed at millisecond precision, matching the rendered header
fn normalize(date: DateTime<Utc>) -> DateTime<Utc> {
    date.trunc_subsecs(3)
}
