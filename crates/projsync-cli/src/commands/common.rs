use std::env;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use projsync_core::models::{AuditEntry, AuditSummaryRow, SyncConflict, SyncStatusReport};
use projsync_core::{Database, SyncCoordinator};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CliError;

const DEFAULT_DB_FILE: &str = "projsync.db";
const STDIN_PATH: &str = "-";

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("PROJSYNC_DATABASE_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_FILE)
}

pub fn open_coordinator(path: &Path) -> Result<SyncCoordinator, CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    tracing::debug!(path = %path.display(), "Opening sync database");
    Ok(SyncCoordinator::new(Database::open(path)?))
}

/// Parse a JSON document from `path`, or from piped stdin when `path` is `-`.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let content = if path == Path::new(STDIN_PATH) {
        read_piped_stdin()?
    } else {
        normalize_content(&fs::read_to_string(path)?)
    };
    let content = content.ok_or_else(|| CliError::EmptyInput(path.display().to_string()))?;
    Ok(serde_json::from_str(&content)?)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn format_status_lines(report: &SyncStatusReport) -> Vec<String> {
    let mut lines = vec![format!(
        "device={}  server_time={}",
        report.device_id,
        format_sync_timestamp(report.server_time)
    )];
    lines.extend(report.pending_counts.iter().map(|(table, pending)| {
        let own = report
            .device_pending_counts
            .get(table)
            .copied()
            .unwrap_or_default();
        format!("{table:<24} pending={pending:<6} device={own}")
    }));
    lines
}

pub fn format_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {}  {}/{}  device={} local={} remote={}",
                format_sync_timestamp(conflict.detected_at),
                conflict.id,
                conflict.table_name,
                conflict.record_id,
                conflict.device_id,
                format_optional_millis(conflict.local_updated_at),
                format_optional_millis(conflict.remote_updated_at)
            )
        })
        .collect()
}

pub fn format_audit_lines(entries: &[AuditEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let mut line = format!(
                "{}  {:<16} {:<8} {}/{}  device={}",
                format_sync_timestamp(entry.created_at),
                entry.operation.as_str(),
                entry.status.as_str(),
                entry.table_name,
                entry.record_id.as_deref().unwrap_or("-"),
                entry.device_id
            );
            if let Some(error) = &entry.error_message {
                line.push_str("  error=");
                line.push_str(error);
            }
            line
        })
        .collect()
}

pub fn format_summary_lines(rows: &[AuditSummaryRow]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            format!(
                "{:<16} {:<8} {}",
                row.operation.as_str(),
                row.status.as_str(),
                row.count
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

fn format_optional_millis(timestamp_ms: Option<i64>) -> String {
    timestamp_ms.map_or_else(|| "-".to_string(), |millis| millis.to_string())
}
