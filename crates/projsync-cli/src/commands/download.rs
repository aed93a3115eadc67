use std::path::Path;

use projsync_core::models::{DownloadRequest, SyncResponse};

use crate::commands::common::{open_coordinator, print_json};
use crate::error::CliError;

pub fn run_download(request: &DownloadRequest, db_path: &Path) -> Result<SyncResponse, CliError> {
    let coordinator = open_coordinator(db_path)?;
    let response = coordinator.download(request)?;
    print_json(&response)?;
    Ok(response)
}
