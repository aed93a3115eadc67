use std::path::Path;

use crate::commands::common::{format_conflict_lines, open_coordinator, print_json};
use crate::error::CliError;

pub fn run_conflicts(
    table: Option<&str>,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let coordinator = open_coordinator(db_path)?;
    let conflicts = coordinator.open_conflicts(table, limit)?;

    if as_json {
        return print_json(&conflicts);
    }

    if conflicts.is_empty() {
        println!("No open sync conflicts.");
        return Ok(());
    }

    for line in format_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
