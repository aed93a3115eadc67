//! Incremental reads and new/updated/deleted classification

use rusqlite::Connection;
use serde_json::Value;

use crate::adapters::SyncAdapter;
use crate::error::Result;
use crate::models::{fields, SyncRecord};

/// One incremental read, classified
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncrementalPage {
    pub new_records: Vec<SyncRecord>,
    pub updated_records: Vec<SyncRecord>,
    pub deleted_ids: Vec<String>,
    /// Largest `updatedAt` in the page
    pub max_updated_at: Option<i64>,
    /// Rows newer than `max_updated_at` were left out by the limit
    pub has_more: bool,
}

impl IncrementalPage {
    pub fn len(&self) -> usize {
        self.new_records.len() + self.updated_records.len() + self.deleted_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reads everything an adapter changed since a watermark
pub struct IncrementalReader<'a> {
    adapter: &'a dyn SyncAdapter,
}

impl<'a> IncrementalReader<'a> {
    pub const fn new(adapter: &'a dyn SyncAdapter) -> Self {
        Self { adapter }
    }

    /// Query rows with `updatedAt > since` and classify them.
    pub fn read(&self, conn: &Connection, since: i64, limit: Option<usize>) -> Result<IncrementalPage> {
        let records = self.adapter.query_incremental(conn, since, limit)?;
        let mut page = classify(records, since);

        if limit.is_some() {
            if let Some(max) = page.max_updated_at {
                page.has_more = self.adapter.has_changes_since(conn, max)?;
            }
        }

        Ok(page)
    }
}

/// Split records into new, updated and deleted.
///
/// Tombstones go to `deleted_ids`; otherwise a record created after the watermark is new and
/// anything else is an update. `createdAt`/`updatedAt` are normalized to integers, missing as 0.
pub fn classify(records: Vec<SyncRecord>, since: i64) -> IncrementalPage {
    let mut page = IncrementalPage::default();

    for mut record in records {
        let created_at = normalize_millis(&mut record, fields::CREATED_AT);
        let updated_at = normalize_millis(&mut record, fields::UPDATED_AT);
        page.max_updated_at = Some(page.max_updated_at.map_or(updated_at, |max| max.max(updated_at)));

        if record.is_deleted() {
            if let Some(id) = record.id() {
                page.deleted_ids.push(id.to_string());
            }
        } else if created_at > since {
            page.new_records.push(record);
        } else {
            page.updated_records.push(record);
        }
    }

    page
}

fn normalize_millis(record: &mut SyncRecord, field: &str) -> i64 {
    let millis = record.millis(field).unwrap_or(0);
    record.insert(field, Value::from(millis));
    millis
}
