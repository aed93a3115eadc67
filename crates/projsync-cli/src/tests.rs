use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use projsync_core::models::{
    AuditEntry, AuditOperation, AuditStatus, AuditSummaryRow, DownloadRequest, SyncConflict,
    SyncRequest, SyncStatusReport,
};
use serde_json::json;
use tempfile::TempDir;

use crate::cli::CompletionShell;
use crate::commands::common::{
    format_audit_lines, format_conflict_lines, format_status_lines, format_summary_lines,
    format_sync_timestamp, normalize_content, open_coordinator, read_document, resolve_db_path,
};
use crate::commands::completions::render_completions;
use crate::commands::download::run_download;
use crate::commands::resolve::run_resolve;
use crate::commands::upload::run_upload;
use crate::error::CliError;

fn write_document(dir: &TempDir, name: &str, value: &serde_json::Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, value.to_string()).unwrap();
    path
}

fn download_all(db_path: &Path, table: &str) -> projsync_core::models::SyncResponse {
    let request = DownloadRequest {
        table_name: table.to_string(),
        last_synced_at: 0,
        device_id: "inspector".to_string(),
        limit: None,
    };
    run_download(&request, db_path).unwrap()
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  {}  "), Some("{}".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
}

#[test]
fn explicit_db_path_wins() {
    let explicit = PathBuf::from("/tmp/explicit.db");
    assert_eq!(resolve_db_path(Some(explicit.clone())), explicit);
}

#[test]
fn format_sync_timestamp_returns_utc_label() {
    assert_eq!(format_sync_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn read_document_rejects_empty_and_malformed_files() {
    let dir = TempDir::new().unwrap();
    let empty = dir.path().join("empty.json");
    fs::write(&empty, "  \n").unwrap();
    assert!(matches!(
        read_document::<SyncRequest>(&empty),
        Err(CliError::EmptyInput(_))
    ));

    let malformed = dir.path().join("bad.json");
    fs::write(&malformed, "{\"tableName\": ").unwrap();
    assert!(matches!(
        read_document::<SyncRequest>(&malformed),
        Err(CliError::Serialization(_))
    ));
}

#[test]
fn upload_file_persists_records() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("sync.db");
    let file = write_document(
        &dir,
        "upload.json",
        &json!({
            "tableName": "projects",
            "deviceId": "device-a",
            "requestId": "req-1",
            "records": [
                {"id": "p1", "name": "Alpha"},
                {"id": "p2", "name": "Beta", "deleted": true}
            ]
        }),
    );

    let result = run_upload(&file, &db_path).unwrap();
    assert_eq!(result.success_count, 2);
    assert_eq!(result.failed_count, 0);

    let response = download_all(&db_path, "projects");
    assert_eq!(response.new_records.len(), 1);
    assert_eq!(response.new_records[0].id(), Some("p1"));
    assert_eq!(response.deleted_ids, vec!["p2".to_string()]);
}

#[test]
fn upload_of_unknown_table_fails_the_command() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("sync.db");
    let file = write_document(
        &dir,
        "upload.json",
        &json!({"tableName": "users", "deviceId": "device-a", "records": []}),
    );

    let err = run_upload(&file, &db_path).unwrap_err();
    assert!(matches!(
        err,
        CliError::Core(projsync_core::Error::UnknownTable(name)) if name == "users"
    ));
}

#[test]
fn resolve_file_settles_open_conflict() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("sync.db");
    let first = write_document(
        &dir,
        "first.json",
        &json!({
            "tableName": "project_tasks",
            "deviceId": "device-a",
            "records": [{"id": "t1", "projectId": "p1", "title": "Server"}]
        }),
    );
    let stale = write_document(
        &dir,
        "stale.json",
        &json!({
            "tableName": "project_tasks",
            "deviceId": "device-b",
            "records": [{"id": "t1", "projectId": "p1", "title": "Client", "updatedAt": 1}]
        }),
    );
    run_upload(&first, &db_path).unwrap();
    let result = run_upload(&stale, &db_path).unwrap();
    assert_eq!(result.conflict_count, 1);

    let resolution = write_document(
        &dir,
        "resolve.json",
        &json!({
            "tableName": "project_tasks",
            "recordId": "t1",
            "resolution": "local",
            "deviceId": "device-b",
            "mergedData": {"id": "t1", "projectId": "p1", "title": "Client"}
        }),
    );
    run_resolve(&resolution, &db_path).unwrap();

    let coordinator = open_coordinator(&db_path).unwrap();
    assert!(coordinator
        .open_conflicts(Some("project_tasks"), 10)
        .unwrap()
        .is_empty());

    let response = download_all(&db_path, "project_tasks");
    assert_eq!(
        response.new_records[0].get("title"),
        Some(&json!("Client"))
    );
}

#[test]
fn format_status_lines_list_every_table() {
    let report = SyncStatusReport {
        device_id: "device-a".to_string(),
        server_time: 0,
        pending_counts: BTreeMap::from([
            ("projects".to_string(), 3),
            ("project_tasks".to_string(), 0),
        ]),
        device_pending_counts: BTreeMap::from([("projects".to_string(), 1)]),
        is_online: true,
    };

    let lines = format_status_lines(&report);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("device=device-a"));
    assert!(lines[1].starts_with("project_tasks"));
    assert!(lines[2].contains("pending=3"));
    assert!(lines[2].ends_with("device=1"));
}

#[test]
fn format_conflict_lines_include_key_fields() {
    let conflicts = vec![SyncConflict {
        id: "c1".to_string(),
        table_name: "projects".to_string(),
        record_id: "p1".to_string(),
        device_id: "device-b".to_string(),
        remote_updated_at: Some(200),
        local_updated_at: None,
        detected_at: 300,
        resolved_at: None,
        resolution: None,
        resolved_by: None,
    }];

    let rendered = format_conflict_lines(&conflicts);
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].contains("projects/p1"));
    assert!(rendered[0].contains("device=device-b"));
    assert!(rendered[0].contains("local=- remote=200"));
}

#[test]
fn format_audit_lines_append_errors() {
    let entries = vec![
        AuditEntry {
            id: 2,
            device_id: "device-a".to_string(),
            table_name: "projects".to_string(),
            record_id: Some("p1".to_string()),
            operation: AuditOperation::Upload,
            status: AuditStatus::Failed,
            error_message: Some("missing required field 'name'".to_string()),
            request_id: None,
            created_at: 0,
        },
        AuditEntry {
            id: 1,
            device_id: "device-a".to_string(),
            table_name: "projects".to_string(),
            record_id: None,
            operation: AuditOperation::Download,
            status: AuditStatus::Success,
            error_message: None,
            request_id: None,
            created_at: 0,
        },
    ];

    let rendered = format_audit_lines(&entries);
    assert!(rendered[0].ends_with("error=missing required field 'name'"));
    assert!(rendered[1].contains("projects/-"));
    assert!(!rendered[1].contains("error="));

    let summary = format_summary_lines(&[AuditSummaryRow {
        operation: AuditOperation::ResolveConflict,
        status: AuditStatus::Success,
        count: 4,
    }]);
    assert_eq!(summary, vec!["resolve_conflict success  4".to_string()]);
}

#[test]
fn completions_name_the_binary() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("projsync"));
}
