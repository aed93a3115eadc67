//! Database migrations

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};

/// Current schema version
const CURRENT_VERSION: i32 = 3;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        apply(conn, 1, &migrate_v1_statements())?;
    }
    if version < 2 {
        apply(conn, 2, MIGRATE_V2)?;
    }
    if version < 3 {
        apply(conn, 3, MIGRATE_V3)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten()
        .unwrap_or(0);

    Ok(version)
}

/// Run one migration's statements atomically and record its version
fn apply<S: AsRef<str>>(conn: &Connection, version: i32, statements: &[S]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for stmt in statements {
        tx.execute_batch(stmt.as_ref())?;
    }
    tx.execute("INSERT INTO schema_version (version) VALUES (?)", [version])?;
    tx.commit()?;

    tracing::info!("Migrated database to version {version} (target {CURRENT_VERSION})");
    Ok(())
}

/// Sync-control columns shared by every synced table
const SYNC_COLUMNS: &str = "id TEXT PRIMARY KEY,
            created_at INTEGER,
            updated_at INTEGER,
            device_id TEXT,
            sync_status TEXT,
            synced_at INTEGER,
            deleted INTEGER NOT NULL DEFAULT 0";

/// Migration to version 1: synced entity tables
fn migrate_v1_statements() -> Vec<String> {
    let tables = [
        (
            "projects",
            "name TEXT,
            description TEXT,
            owner_id TEXT,
            status TEXT,
            settings TEXT",
        ),
        (
            "project_files",
            "project_id TEXT,
            path TEXT,
            content TEXT,
            mime_type TEXT,
            size_bytes INTEGER",
        ),
        (
            "project_conversations",
            "project_id TEXT,
            role TEXT,
            content TEXT,
            model TEXT",
        ),
        (
            "project_tasks",
            "project_id TEXT,
            title TEXT,
            description TEXT,
            status TEXT,
            priority INTEGER,
            due_at INTEGER,
            completed INTEGER",
        ),
        (
            "project_collaborators",
            "project_id TEXT,
            user_id TEXT,
            role TEXT,
            invited_by TEXT",
        ),
        (
            "project_comments",
            "project_id TEXT,
            author_id TEXT,
            content TEXT,
            target_id TEXT",
        ),
    ];

    let mut statements = vec![
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )"
        .to_string(),
    ];

    for (table, business_columns) in tables {
        statements.push(format!(
            "CREATE TABLE IF NOT EXISTS {table} (
            {SYNC_COLUMNS},
            {business_columns}
        )"
        ));
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_updated ON {table}(updated_at, id)"
        ));
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_pending ON {table}(sync_status, device_id)"
        ));
    }

    statements
}

/// Migration to version 2: per-record audit log
const MIGRATE_V2: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS sync_audit_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        device_id TEXT NOT NULL,
        table_name TEXT NOT NULL,
        record_id TEXT,
        operation TEXT NOT NULL,
        status TEXT NOT NULL,
        error_message TEXT,
        request_id TEXT,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sync_audit_log_created_at ON sync_audit_log(created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_sync_audit_log_record ON sync_audit_log(table_name, record_id)",
];

/// Migration to version 3: persisted upload conflicts
const MIGRATE_V3: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS sync_conflicts (
        id TEXT PRIMARY KEY,
        table_name TEXT NOT NULL,
        record_id TEXT NOT NULL,
        device_id TEXT NOT NULL,
        remote_updated_at INTEGER,
        local_updated_at INTEGER,
        detected_at INTEGER NOT NULL,
        resolved_at INTEGER,
        resolution TEXT,
        resolved_by TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_record ON sync_conflicts(table_name, record_id)",
    "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_open ON sync_conflicts(resolved_at, detected_at DESC)",
];
