use std::path::Path;

use projsync_core::models::ConflictResolution;

use crate::commands::common::{open_coordinator, read_document};
use crate::error::CliError;

pub fn run_resolve(file: &Path, db_path: &Path) -> Result<(), CliError> {
    let request: ConflictResolution = read_document(file)?;
    let coordinator = open_coordinator(db_path)?;
    coordinator.resolve_conflict(&request)?;

    println!(
        "Resolved {}/{} as {}",
        request.table_name, request.record_id, request.resolution
    );
    Ok(())
}
