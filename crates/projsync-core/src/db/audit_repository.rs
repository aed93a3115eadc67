//! Sync audit log repository

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)] // SQLite uses i64 for LIMIT/COUNT

use crate::error::Result;
use crate::models::{AuditEntry, AuditOperation, AuditStatus, AuditSummaryRow};
use rusqlite::{params, Connection};

/// An audit entry about to be written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAuditEntry<'a> {
    pub device_id: &'a str,
    pub table_name: &'a str,
    pub record_id: Option<&'a str>,
    pub operation: AuditOperation,
    pub status: AuditStatus,
    pub error_message: Option<&'a str>,
    pub request_id: Option<&'a str>,
    pub created_at: i64,
}

/// Trait for audit log storage operations
pub trait AuditLogger {
    /// Append one entry
    fn record(&self, entry: &NewAuditEntry<'_>) -> Result<i64>;

    /// Newest entries first
    fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>>;

    /// Entry counts grouped by operation and status, for entries at or after `since`
    fn summary(&self, since: i64) -> Result<Vec<AuditSummaryRow>>;
}

/// `SQLite` implementation of `AuditLogger`
pub struct SqliteAuditLogger<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteAuditLogger<'a> {
    /// Create a new logger with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEntry> {
        Ok(AuditEntry {
            id: row.get(0)?,
            device_id: row.get(1)?,
            table_name: row.get(2)?,
            record_id: row.get(3)?,
            operation: parse_wire(row, 4)?,
            status: parse_wire(row, 5)?,
            error_message: row.get(6)?,
            request_id: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

/// Parse a stored wire name back into its enum
fn parse_wire<T>(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let value: String = row.get(index)?;
    value.parse().map_err(|error: String| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            error.into(),
        )
    })
}

impl AuditLogger for SqliteAuditLogger<'_> {
    fn record(&self, entry: &NewAuditEntry<'_>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sync_audit_log
                (device_id, table_name, record_id, operation, status, error_message, request_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                entry.device_id,
                entry.table_name,
                entry.record_id,
                entry.operation.as_str(),
                entry.status.as_str(),
                entry.error_message,
                entry.request_id,
                entry.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, device_id, table_name, record_id, operation, status, error_message, request_id, created_at
             FROM sync_audit_log
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
        )?;

        let entries = stmt
            .query_map(params![limit as i64], Self::parse_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    fn summary(&self, since: i64) -> Result<Vec<AuditSummaryRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT operation, status, COUNT(*)
             FROM sync_audit_log
             WHERE created_at >= ?
             GROUP BY operation, status
             ORDER BY operation, status",
        )?;

        let rows = stmt
            .query_map(params![since], |row| {
                Ok(AuditSummaryRow {
                    operation: parse_wire(row, 0)?,
                    status: parse_wire(row, 1)?,
                    count: row.get::<_, i64>(2)?.max(0) as u64,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }
}
