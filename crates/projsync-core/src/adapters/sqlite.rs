//! `SQLite` implementation of `SyncAdapter`, driven by a static table schema

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)] // SQLite uses i64 for LIMIT/COUNT

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::codec::{self, read_column, ColumnValue, TypedRecord};
use super::schema::{ConflictPolicy, TableSchema};
use super::{PendingScope, SyncAdapter, WriteOutcome, Written};
use crate::error::{DecodeError, Error, Result};
use crate::models::{SyncMeta, SyncRecord, SyncStatus, SyncTable};
use crate::sync::detect_conflict;

/// Sync-control columns, in the order every SELECT returns them
const META_COLUMNS: [&str; 7] = [
    "id",
    "created_at",
    "updated_at",
    "device_id",
    "sync_status",
    "synced_at",
    "deleted",
];

/// Adapter for one table of the central `SQLite` store
pub struct SqliteTableAdapter {
    schema: &'static TableSchema,
    select_list: String,
}

impl SqliteTableAdapter {
    /// Create an adapter for the given schema
    pub fn new(schema: &'static TableSchema) -> Self {
        let select_list = META_COLUMNS
            .iter()
            .copied()
            .chain(schema.columns.iter().map(|spec| spec.column))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            schema,
            select_list,
        }
    }

    /// Create the adapter for a built-in table
    pub fn for_table(table: SyncTable) -> Self {
        Self::new(TableSchema::of(table))
    }

    /// Parse a typed record from a row selected with `select_list`
    fn parse_row(&self, row: &rusqlite::Row<'_>) -> rusqlite::Result<TypedRecord> {
        let status: Option<String> = row.get(4)?;
        let meta = SyncMeta {
            id: row.get(0)?,
            created_at: row.get(1)?,
            updated_at: row.get(2)?,
            device_id: row.get(3)?,
            sync_status: status.and_then(|status| status.parse::<SyncStatus>().ok()),
            synced_at: row.get(5)?,
            deleted: row.get::<_, Option<i64>>(6)?.unwrap_or(0) != 0,
        };

        let values = self
            .schema
            .columns
            .iter()
            .enumerate()
            .map(|(offset, spec)| read_column(row, META_COLUMNS.len() + offset, spec.kind).map(Some))
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(TypedRecord { meta, values })
    }

    fn select(
        &self,
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<TypedRecord>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| self.parse_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Whether `incoming` would leave `existing` exactly as stored.
    ///
    /// The record's own `deviceId` identifies its author; `writer` stands in when it has none,
    /// so an echo of a downloaded row from another device is still a no-op.
    fn is_unchanged(existing: &TypedRecord, incoming: &TypedRecord, writer: &str) -> bool {
        let author = incoming.meta.device_id.as_deref().unwrap_or(writer);
        existing.meta.device_id.as_deref() == Some(author)
            && existing.meta.sync_status == Some(SyncStatus::Synced)
            && existing.meta.deleted == incoming.meta.deleted
            && existing
                .values
                .iter()
                .zip(&incoming.values)
                .all(|(stored, upload)| upload.is_none() || upload == stored)
    }

    fn insert(&self, conn: &Connection, incoming: &TypedRecord, writer: &str, now: i64) -> Result<()> {
        let columns = META_COLUMNS
            .iter()
            .copied()
            .chain(self.schema.columns.iter().map(|spec| spec.column))
            .collect::<Vec<_>>();
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            self.schema.name(),
            columns.join(", ")
        );

        let mut values = vec![
            ColumnValue::Text(incoming.meta.id.clone()),
            ColumnValue::Integer(incoming.meta.created_at.unwrap_or(now)),
            ColumnValue::Integer(now),
            ColumnValue::Text(writer.to_string()),
            ColumnValue::Text(SyncStatus::Synced.as_str().to_string()),
            ColumnValue::Integer(now),
            ColumnValue::Bool(incoming.meta.deleted),
        ];
        values.extend(
            incoming
                .values
                .iter()
                .map(|value| value.clone().unwrap_or(ColumnValue::Null)),
        );

        conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    fn update(&self, conn: &Connection, incoming: &TypedRecord, writer: &str, now: i64) -> Result<()> {
        let mut assignments = vec![
            "created_at = COALESCE(created_at, ?1)".to_string(),
            "updated_at = ?2".to_string(),
            "device_id = ?3".to_string(),
            "sync_status = ?4".to_string(),
            "synced_at = ?5".to_string(),
            "deleted = ?6".to_string(),
        ];
        let mut values = vec![
            ColumnValue::Integer(incoming.meta.created_at.unwrap_or(now)),
            ColumnValue::Integer(now),
            ColumnValue::Text(writer.to_string()),
            ColumnValue::Text(SyncStatus::Synced.as_str().to_string()),
            ColumnValue::Integer(now),
            ColumnValue::Bool(incoming.meta.deleted),
        ];

        for (spec, value) in self.schema.columns.iter().zip(&incoming.values) {
            if let Some(value) = value {
                values.push(value.clone());
                assignments.push(format!("{} = ?{}", spec.column, values.len()));
            }
        }

        values.push(ColumnValue::Text(incoming.meta.id.clone()));
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            self.schema.name(),
            assignments.join(", "),
            values.len()
        );

        let rows = conn.execute(&sql, params_from_iter(values))?;
        if rows == 0 {
            return Err(Error::NotFound(format!(
                "{}/{}",
                self.schema.name(),
                incoming.meta.id
            )));
        }
        Ok(())
    }
}

impl SyncAdapter for SqliteTableAdapter {
    fn table(&self) -> SyncTable {
        self.schema.table
    }

    fn decode(&self, fields: &SyncRecord) -> std::result::Result<TypedRecord, DecodeError> {
        codec::decode(self.schema, fields)
    }

    fn encode(&self, record: &TypedRecord) -> SyncRecord {
        codec::encode(self.schema, record)
    }

    fn find(&self, conn: &Connection, id: &str) -> Result<Option<TypedRecord>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?",
            self.select_list,
            self.schema.name()
        );
        let record = conn
            .query_row(&sql, params![id], |row| self.parse_row(row))
            .optional()?;
        Ok(record)
    }

    fn conflict(
        &self,
        existing: Option<&TypedRecord>,
        incoming: &TypedRecord,
        device_id: &str,
    ) -> bool {
        match self.schema.policy {
            ConflictPolicy::AppendOnly => false,
            ConflictPolicy::LastWriteWins => {
                detect_conflict(existing.map(|record| &record.meta), &incoming.meta, device_id)
            }
        }
    }

    fn write(
        &self,
        conn: &Connection,
        existing: Option<&TypedRecord>,
        incoming: &TypedRecord,
        writer: &str,
        now: i64,
    ) -> Result<Written> {
        let outcome = match existing {
            None => {
                self.insert(conn, incoming, writer, now)?;
                WriteOutcome::Inserted
            }
            Some(existing) => {
                let skip = match self.schema.policy {
                    ConflictPolicy::AppendOnly => true,
                    ConflictPolicy::LastWriteWins => Self::is_unchanged(existing, incoming, writer),
                };
                if skip {
                    return Ok(Written {
                        outcome: WriteOutcome::Unchanged,
                        record: existing.clone(),
                    });
                }
                self.update(conn, incoming, writer, now)?;
                WriteOutcome::Updated
            }
        };

        let record = self
            .find(conn, &incoming.meta.id)?
            .ok_or_else(|| Error::NotFound(format!("{}/{}", self.schema.name(), incoming.meta.id)))?;
        Ok(Written { outcome, record })
    }

    fn query_incremental(
        &self,
        conn: &Connection,
        since: i64,
        limit: Option<usize>,
    ) -> Result<Vec<SyncRecord>> {
        let table = self.schema.name();
        let rows = if let Some(limit) = limit {
            // Cut at the timestamp of the limit-th row so a timestamp group is never split
            let sql = format!(
                "SELECT {list} FROM {table}
                 WHERE updated_at > ?1
                   AND updated_at <= COALESCE(
                       (SELECT updated_at FROM {table}
                        WHERE updated_at > ?1
                        ORDER BY updated_at ASC, id ASC
                        LIMIT 1 OFFSET ?2),
                       9223372036854775807)
                 ORDER BY updated_at ASC, id ASC",
                list = self.select_list
            );
            let offset = i64::try_from(limit.max(1)).unwrap_or(i64::MAX) - 1;
            self.select(conn, &sql, params![since, offset])?
        } else {
            let sql = format!(
                "SELECT {} FROM {table} WHERE updated_at > ?1 ORDER BY updated_at ASC, id ASC",
                self.select_list
            );
            self.select(conn, &sql, params![since])?
        };

        Ok(rows.iter().map(|row| self.encode(row)).collect())
    }

    fn has_changes_since(&self, conn: &Connection, since: i64) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE updated_at > ?)",
            self.schema.name()
        );
        Ok(conn.query_row(&sql, params![since], |row| row.get(0))?)
    }

    fn count_pending(&self, conn: &Connection, scope: PendingScope<'_>) -> Result<u64> {
        let base = format!(
            "SELECT COUNT(*) FROM {} WHERE (sync_status IS NULL OR sync_status = 'pending')",
            self.schema.name()
        );
        let count: i64 = match scope {
            PendingScope::Global => conn.query_row(&base, [], |row| row.get(0))?,
            PendingScope::Device(device_id) => conn.query_row(
                &format!("{base} AND device_id = ?"),
                params![device_id],
                |row| row.get(0),
            )?,
        };
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn project(id: &str, name: &str) -> SyncRecord {
        SyncRecord::from_value(json!({"id": id, "name": name})).unwrap()
    }

    fn write_new(adapter: &SqliteTableAdapter, conn: &Connection, record: &SyncRecord, now: i64) -> Written {
        let typed = adapter.decode(record).unwrap();
        let existing = adapter.find(conn, &typed.meta.id).unwrap();
        adapter
            .write(conn, existing.as_ref(), &typed, "device-a", now)
            .unwrap()
    }

    #[test]
    fn test_insert_stamps_sync_fields() {
        let db = setup();
        let adapter = SqliteTableAdapter::for_table(SyncTable::Projects);

        let written = write_new(&adapter, db.connection(), &project("p1", "Alpha"), 1_000);
        assert_eq!(written.outcome, WriteOutcome::Inserted);

        let meta = &written.record.meta;
        assert_eq!(meta.created_at, Some(1_000));
        assert_eq!(meta.updated_at, Some(1_000));
        assert_eq!(meta.synced_at, Some(1_000));
        assert_eq!(meta.device_id.as_deref(), Some("device-a"));
        assert_eq!(meta.sync_status, Some(SyncStatus::Synced));
        assert!(!meta.deleted);
    }

    #[test]
    fn test_update_keeps_created_at_and_absent_fields() {
        let db = setup();
        let adapter = SqliteTableAdapter::for_table(SyncTable::Projects);
        let conn = db.connection();

        let first = SyncRecord::from_value(json!({
            "id": "p1", "name": "Alpha", "description": "first", "createdAt": 500
        }))
        .unwrap();
        write_new(&adapter, conn, &first, 1_000);

        let written = write_new(&adapter, conn, &project("p1", "Beta"), 2_000);
        assert_eq!(written.outcome, WriteOutcome::Updated);

        let encoded = adapter.encode(&written.record);
        assert_eq!(encoded.get("name"), Some(&json!("Beta")));
        assert_eq!(encoded.get("description"), Some(&json!("first")));
        assert_eq!(encoded.millis("createdAt"), Some(500));
        assert_eq!(encoded.millis("updatedAt"), Some(2_000));
    }

    #[test]
    fn test_identical_rewrite_is_unchanged() {
        let db = setup();
        let adapter = SqliteTableAdapter::for_table(SyncTable::Projects);
        let conn = db.connection();

        write_new(&adapter, conn, &project("p1", "Alpha"), 1_000);
        let written = write_new(&adapter, conn, &project("p1", "Alpha"), 2_000);

        assert_eq!(written.outcome, WriteOutcome::Unchanged);
        assert_eq!(written.record.meta.updated_at, Some(1_000));
    }

    #[test]
    fn test_echo_from_other_device_is_unchanged() {
        let db = setup();
        let adapter = SqliteTableAdapter::for_table(SyncTable::Projects);
        let conn = db.connection();

        let first = write_new(&adapter, conn, &project("p1", "Alpha"), 1_000);
        let echo = adapter.decode(&adapter.encode(&first.record)).unwrap();
        let written = adapter
            .write(conn, Some(&first.record), &echo, "device-b", 2_000)
            .unwrap();

        assert_eq!(written.outcome, WriteOutcome::Unchanged);
        assert_eq!(written.record, first.record);
    }

    #[test]
    fn test_append_only_ignores_resubmission() {
        let db = setup();
        let adapter = SqliteTableAdapter::for_table(SyncTable::ProjectConversations);
        let conn = db.connection();
        let message = |content: &str| {
            SyncRecord::from_value(json!({
                "id": "m1", "projectId": "p1", "role": "user", "content": content
            }))
            .unwrap()
        };

        write_new(&adapter, conn, &message("hello"), 1_000);
        let incoming = adapter.decode(&message("edited")).unwrap();
        let existing = adapter.find(conn, "m1").unwrap();
        assert!(!adapter.conflict(existing.as_ref(), &incoming, "device-b"));

        let written = adapter
            .write(conn, existing.as_ref(), &incoming, "device-b", 2_000)
            .unwrap();
        assert_eq!(written.outcome, WriteOutcome::Unchanged);
        assert_eq!(
            adapter.encode(&written.record).get("content"),
            Some(&json!("hello"))
        );
    }

    #[test]
    fn test_query_incremental_includes_tombstones() {
        let db = setup();
        let adapter = SqliteTableAdapter::for_table(SyncTable::Projects);
        let conn = db.connection();

        write_new(&adapter, conn, &project("p1", "Alpha"), 1_000);
        write_new(&adapter, conn, &project("p2", "Beta"), 2_000);
        let tombstone = SyncRecord::from_value(json!({"id": "p1", "deleted": true})).unwrap();
        write_new(&adapter, conn, &tombstone, 3_000);

        let records = adapter.query_incremental(conn, 1_500, None).unwrap();
        let ids = records.iter().filter_map(SyncRecord::id).collect::<Vec<_>>();
        assert_eq!(ids, vec!["p2", "p1"]);
        assert!(records[1].is_deleted());
    }

    #[test]
    fn test_query_incremental_limit_keeps_timestamp_groups_whole() {
        let db = setup();
        let adapter = SqliteTableAdapter::for_table(SyncTable::Projects);
        let conn = db.connection();

        write_new(&adapter, conn, &project("a", "A"), 100);
        write_new(&adapter, conn, &project("b", "B"), 200);
        write_new(&adapter, conn, &project("c", "C"), 200);
        write_new(&adapter, conn, &project("d", "D"), 300);

        let page = adapter.query_incremental(conn, 0, Some(2)).unwrap();
        let ids = page.iter().filter_map(SyncRecord::id).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(adapter.has_changes_since(conn, 200).unwrap());

        let rest = adapter.query_incremental(conn, 200, Some(2)).unwrap();
        assert_eq!(rest.len(), 1);
        assert!(!adapter.has_changes_since(conn, 300).unwrap());
    }

    #[test]
    fn test_query_incremental_with_huge_limit_returns_everything() {
        let db = setup();
        let adapter = SqliteTableAdapter::for_table(SyncTable::Projects);
        let conn = db.connection();

        write_new(&adapter, conn, &project("a", "A"), 100);
        write_new(&adapter, conn, &project("b", "B"), 200);

        let page = adapter.query_incremental(conn, 0, Some(usize::MAX)).unwrap();
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn test_count_pending_by_scope() {
        let db = setup();
        let adapter = SqliteTableAdapter::for_table(SyncTable::ProjectTasks);
        let conn = db.connection();

        conn.execute_batch(
            "INSERT INTO project_tasks (id, device_id, sync_status, title) VALUES ('t1', 'device-a', 'pending', 'a');
             INSERT INTO project_tasks (id, device_id, sync_status, title) VALUES ('t2', 'device-b', NULL, 'b');
             INSERT INTO project_tasks (id, device_id, sync_status, title) VALUES ('t3', 'device-a', 'synced', 'c');",
        )
        .unwrap();

        assert_eq!(adapter.count_pending(conn, PendingScope::Global).unwrap(), 2);
        assert_eq!(
            adapter
                .count_pending(conn, PendingScope::Device("device-a"))
                .unwrap(),
            1
        );
        assert_eq!(
            adapter
                .count_pending(conn, PendingScope::Device("device-c"))
                .unwrap(),
            0
        );
    }
}
