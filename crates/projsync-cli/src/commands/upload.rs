use std::path::Path;

use projsync_core::models::{SyncRequest, UploadResult};

use crate::commands::common::{open_coordinator, print_json, read_document};
use crate::error::CliError;

pub fn run_upload(file: &Path, db_path: &Path) -> Result<UploadResult, CliError> {
    let request: SyncRequest = read_document(file)?;
    let coordinator = open_coordinator(db_path)?;
    let result = coordinator.upload_batch(&request)?;

    print_json(&result)?;
    if result.failed_count > 0 || result.conflict_count > 0 {
        eprintln!(
            "{} record(s) failed, {} conflicted",
            result.failed_count, result.conflict_count
        );
    }
    Ok(result)
}
