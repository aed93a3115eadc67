//! Persisted sync conflicts

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::error::Result;
use crate::models::{Resolution, SyncConflict};
use rusqlite::{params, Connection, OptionalExtension};

const SELECT_COLUMNS: &str = "id, table_name, record_id, device_id, remote_updated_at, local_updated_at,
        detected_at, resolved_at, resolution, resolved_by";

/// Trait for conflict storage operations
pub trait ConflictRepository {
    /// Persist a newly detected conflict
    fn insert(&self, conflict: &SyncConflict) -> Result<()>;

    /// Get a conflict by ID
    fn get(&self, id: &str) -> Result<Option<SyncConflict>>;

    /// Unresolved conflicts, newest first, optionally for one table
    fn list_open(&self, table_name: Option<&str>, limit: usize) -> Result<Vec<SyncConflict>>;

    /// Mark one conflict resolved. Returns whether a row changed.
    fn mark_resolved(
        &self,
        id: &str,
        resolution: Resolution,
        resolved_by: &str,
        resolved_at: i64,
    ) -> Result<bool>;

    /// Mark every open conflict of a record resolved. Returns the number of rows changed.
    fn resolve_open_for_record(
        &self,
        table_name: &str,
        record_id: &str,
        resolution: Resolution,
        resolved_by: &str,
        resolved_at: i64,
    ) -> Result<usize>;
}

/// `SQLite` implementation of `ConflictRepository`
pub struct SqliteConflictRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteConflictRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_conflict(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncConflict> {
        let resolution: Option<String> = row.get(8)?;
        Ok(SyncConflict {
            id: row.get(0)?,
            table_name: row.get(1)?,
            record_id: row.get(2)?,
            device_id: row.get(3)?,
            remote_updated_at: row.get(4)?,
            local_updated_at: row.get(5)?,
            detected_at: row.get(6)?,
            resolved_at: row.get(7)?,
            resolution: resolution.and_then(|value| value.parse().ok()),
            resolved_by: row.get(9)?,
        })
    }
}

impl ConflictRepository for SqliteConflictRepository<'_> {
    fn insert(&self, conflict: &SyncConflict) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_conflicts
                (id, table_name, record_id, device_id, remote_updated_at, local_updated_at,
                 detected_at, resolved_at, resolution, resolved_by)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                conflict.id,
                conflict.table_name,
                conflict.record_id,
                conflict.device_id,
                conflict.remote_updated_at,
                conflict.local_updated_at,
                conflict.detected_at,
                conflict.resolved_at,
                conflict.resolution.map(|resolution| resolution.as_str()),
                conflict.resolved_by,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<SyncConflict>> {
        let conflict = self
            .conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM sync_conflicts WHERE id = ?"),
                params![id],
                Self::parse_conflict,
            )
            .optional()?;
        Ok(conflict)
    }

    fn list_open(&self, table_name: Option<&str>, limit: usize) -> Result<Vec<SyncConflict>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM sync_conflicts
             WHERE resolved_at IS NULL AND (?1 IS NULL OR table_name = ?1)
             ORDER BY detected_at DESC, id DESC
             LIMIT ?2"
        ))?;

        let conflicts = stmt
            .query_map(params![table_name, limit as i64], Self::parse_conflict)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(conflicts)
    }

    fn mark_resolved(
        &self,
        id: &str,
        resolution: Resolution,
        resolved_by: &str,
        resolved_at: i64,
    ) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE sync_conflicts SET resolved_at = ?, resolution = ?, resolved_by = ?
             WHERE id = ? AND resolved_at IS NULL",
            params![resolved_at, resolution.as_str(), resolved_by, id],
        )?;
        Ok(rows > 0)
    }

    fn resolve_open_for_record(
        &self,
        table_name: &str,
        record_id: &str,
        resolution: Resolution,
        resolved_by: &str,
        resolved_at: i64,
    ) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE sync_conflicts SET resolved_at = ?, resolution = ?, resolved_by = ?
             WHERE table_name = ? AND record_id = ? AND resolved_at IS NULL",
            params![
                resolved_at,
                resolution.as_str(),
                resolved_by,
                table_name,
                record_id
            ],
        )?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    fn conflict(id: &str, table_name: &str, record_id: &str, detected_at: i64) -> SyncConflict {
        SyncConflict {
            id: id.to_string(),
            table_name: table_name.to_string(),
            record_id: record_id.to_string(),
            device_id: "device-b".to_string(),
            remote_updated_at: Some(2_000),
            local_updated_at: Some(1_000),
            detected_at,
            resolved_at: None,
            resolution: None,
            resolved_by: None,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteConflictRepository::new(db.connection());

        let stored = conflict("c1", "projects", "p1", 10);
        repo.insert(&stored).unwrap();

        assert_eq!(repo.get("c1").unwrap(), Some(stored));
        assert_eq!(repo.get("missing").unwrap(), None);
    }

    #[test]
    fn test_list_open_filters_by_table_and_state() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteConflictRepository::new(db.connection());

        repo.insert(&conflict("c1", "projects", "p1", 10)).unwrap();
        repo.insert(&conflict("c2", "project_tasks", "t1", 20)).unwrap();
        repo.insert(&conflict("c3", "projects", "p2", 30)).unwrap();
        repo.mark_resolved("c3", Resolution::Remote, "device-a", 40)
            .unwrap();

        let all = repo.list_open(None, 10).unwrap();
        let ids = all.iter().map(|c| c.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["c2", "c1"]);

        let projects = repo.list_open(Some("projects"), 10).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "c1");
    }

    #[test]
    fn test_mark_resolved_only_once() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteConflictRepository::new(db.connection());
        repo.insert(&conflict("c1", "projects", "p1", 10)).unwrap();

        assert!(repo
            .mark_resolved("c1", Resolution::Local, "device-b", 50)
            .unwrap());
        assert!(!repo
            .mark_resolved("c1", Resolution::Remote, "device-a", 60)
            .unwrap());

        let resolved = repo.get("c1").unwrap().unwrap();
        assert!(!resolved.is_open());
        assert_eq!(resolved.resolution, Some(Resolution::Local));
        assert_eq!(resolved.resolved_by.as_deref(), Some("device-b"));
        assert_eq!(resolved.resolved_at, Some(50));
    }

    #[test]
    fn test_resolve_open_for_record() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteConflictRepository::new(db.connection());
        repo.insert(&conflict("c1", "projects", "p1", 10)).unwrap();
        repo.insert(&conflict("c2", "projects", "p1", 20)).unwrap();
        repo.insert(&conflict("c3", "projects", "p2", 30)).unwrap();

        let changed = repo
            .resolve_open_for_record("projects", "p1", Resolution::Manual, "device-a", 99)
            .unwrap();
        assert_eq!(changed, 2);
        assert_eq!(repo.list_open(None, 10).unwrap().len(), 1);
    }
}
