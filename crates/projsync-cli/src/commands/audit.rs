use std::path::Path;

use crate::commands::common::{
    format_audit_lines, format_summary_lines, open_coordinator, print_json,
};
use crate::error::CliError;

pub fn run_audit(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let coordinator = open_coordinator(db_path)?;
    let entries = coordinator.recent_audit(limit)?;

    if as_json {
        return print_json(&entries);
    }

    if entries.is_empty() {
        println!("Audit log is empty.");
        return Ok(());
    }

    for line in format_audit_lines(&entries) {
        println!("{line}");
    }
    Ok(())
}

pub fn run_audit_summary(since: i64, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let coordinator = open_coordinator(db_path)?;
    let rows = coordinator.audit_summary(since)?;

    if as_json {
        return print_json(&rows);
    }

    for line in format_summary_lines(&rows) {
        println!("{line}");
    }
    Ok(())
}
