use std::path::Path;

use crate::commands::common::{format_status_lines, open_coordinator, print_json};
use crate::error::CliError;

pub fn run_status(device_id: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let coordinator = open_coordinator(db_path)?;
    let report = coordinator.sync_status(device_id)?;

    if as_json {
        return print_json(&report);
    }

    for line in format_status_lines(&report) {
        println!("{line}");
    }
    Ok(())
}
