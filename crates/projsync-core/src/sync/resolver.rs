//! Conflict resolution

use serde_json::Value;

use super::coordinator::{required_device, SyncCoordinator};
use crate::db::{
    AuditLogger, ConflictRepository, NewAuditEntry, SqliteAuditLogger, SqliteConflictRepository,
};
use crate::error::{Error, Result};
use crate::models::{fields, AuditOperation, AuditStatus, ConflictResolution, Resolution, SyncRecord};

impl SyncCoordinator {
    /// Settle a conflict.
    ///
    /// `remote` keeps the stored row untouched. `local` and `manual` force-write `mergedData`
    /// as the resolving device, bypassing conflict detection. The persisted conflict (or, without
    /// a `conflictId`, every open conflict of the record) is marked resolved, and an audit entry
    /// is written either way.
    ///
    /// # Errors
    /// `Error::UnknownTable`, `Error::InvalidRequest` for a missing or mismatched `mergedData`,
    /// `Error::NotFound` for an unknown `conflictId`, or a storage error.
    pub fn resolve_conflict(&self, request: &ConflictResolution) -> Result<()> {
        let adapter = self.registry().get(&request.table_name)?;
        let device_id = required_device(&request.device_id)?;
        let table_name = adapter.table().as_str();
        let record_id = request.record_id.trim();
        if record_id.is_empty() {
            return Err(Error::InvalidRequest("recordId must not be empty".to_string()));
        }

        let conflicts = SqliteConflictRepository::new(self.conn());
        if let Some(conflict_id) = request.conflict_id.as_deref() {
            let conflict = conflicts
                .get(conflict_id)?
                .ok_or_else(|| Error::NotFound(format!("conflict {conflict_id}")))?;
            if conflict.table_name != table_name || conflict.record_id != record_id {
                return Err(Error::InvalidRequest(format!(
                    "conflict {conflict_id} belongs to {}/{}",
                    conflict.table_name, conflict.record_id
                )));
            }
        }

        let now = self.now();
        let entry = |status: AuditStatus, error_message: Option<&'static str>| NewAuditEntry {
            device_id,
            table_name,
            record_id: Some(record_id),
            operation: AuditOperation::ResolveConflict,
            status,
            error_message,
            request_id: None,
            created_at: now,
        };

        let merged = match request.resolution {
            Resolution::Remote => None,
            Resolution::Local | Resolution::Manual => {
                match merged_record(request.merged_data.as_ref(), record_id) {
                    Ok(merged) => Some(merged),
                    Err(message) => {
                        SqliteAuditLogger::new(self.conn())
                            .record(&entry(AuditStatus::Failed, Some(message)))?;
                        return Err(Error::InvalidRequest(message.to_string()));
                    }
                }
            }
        };

        let typed = match merged.as_ref().map(|record| adapter.decode(record)).transpose() {
            Ok(typed) => typed,
            Err(error) => {
                let message = format!("mergedData: {error}");
                SqliteAuditLogger::new(self.conn()).record(&NewAuditEntry {
                    error_message: Some(&message),
                    ..entry(AuditStatus::Failed, None)
                })?;
                return Err(Error::InvalidRequest(message));
            }
        };

        let tx = self.conn().unchecked_transaction()?;
        if let Some(typed) = &typed {
            let existing = adapter.find(&tx, record_id)?;
            adapter.write(&tx, existing.as_ref(), typed, device_id, now)?;
        }

        let repo = SqliteConflictRepository::new(&tx);
        let resolved = match request.conflict_id.as_deref() {
            Some(conflict_id) => usize::from(repo.mark_resolved(
                conflict_id,
                request.resolution,
                device_id,
                now,
            )?),
            None => repo.resolve_open_for_record(
                table_name,
                record_id,
                request.resolution,
                device_id,
                now,
            )?,
        };
        SqliteAuditLogger::new(&tx).record(&entry(AuditStatus::Success, None))?;
        tx.commit()?;

        tracing::info!(
            table = table_name,
            record = record_id,
            device = device_id,
            resolution = request.resolution.as_str(),
            resolved,
            "Conflict resolved"
        );
        Ok(())
    }
}

/// `mergedData` with its `id` filled from `record_id`
fn merged_record(merged: Option<&SyncRecord>, record_id: &str) -> std::result::Result<SyncRecord, &'static str> {
    let mut merged = merged
        .cloned()
        .ok_or("mergedData is required for local and manual resolutions")?;

    let matches_record = match merged.get(fields::ID) {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id.trim() == record_id),
        Some(_) => Some(false),
    };
    match matches_record {
        None => {
            merged.insert(fields::ID, Value::from(record_id));
        }
        Some(true) => {}
        Some(false) => return Err("mergedData.id does not match recordId"),
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merged_record_fills_missing_id() {
        let merged = SyncRecord::from_value(json!({"name": "Merged"})).unwrap();
        let filled = merged_record(Some(&merged), "p1").unwrap();
        assert_eq!(filled.id(), Some("p1"));
    }

    #[test]
    fn merged_record_rejects_other_id() {
        let merged = SyncRecord::from_value(json!({"id": "p2", "name": "Merged"})).unwrap();
        assert!(merged_record(Some(&merged), "p1").is_err());
        assert!(merged_record(None, "p1").is_err());
    }
}
