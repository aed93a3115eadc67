//! Per-table sync adapters
//!
//! Every synced table is reached through a [`SyncAdapter`]: it decodes wire records into typed
//! rows, decides whether an upload conflicts with the stored row, writes, and answers the
//! incremental and pending-count queries. The coordinator never touches a table directly.

mod codec;
mod registry;
mod schema;
mod sqlite;

use rusqlite::Connection;

use crate::error::{DecodeError, Result};
use crate::models::{SyncRecord, SyncTable};

pub use codec::{ColumnValue, TypedRecord};
pub use registry::AdapterRegistry;
pub use schema::{ColumnKind, ColumnSpec, ConflictPolicy, TableSchema};
pub use sqlite::SqliteTableAdapter;

/// What `write` did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Updated,
    /// Nothing to write: the stored row already matches, or the table is append-only
    Unchanged,
}

/// Result of a write, with the row as now stored
#[derive(Debug, Clone, PartialEq)]
pub struct Written {
    pub outcome: WriteOutcome,
    pub record: TypedRecord,
}

/// Which rows `count_pending` counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingScope<'a> {
    /// Every row of the table
    Global,
    /// Rows last written by one device
    Device(&'a str),
}

/// Codec, conflict check and storage access for one synced table.
pub trait SyncAdapter: Send + Sync {
    /// Table this adapter serves.
    fn table(&self) -> SyncTable;

    /// Strictly decode a wire record.
    fn decode(&self, fields: &SyncRecord) -> std::result::Result<TypedRecord, DecodeError>;

    /// Encode a typed row for the wire.
    fn encode(&self, record: &TypedRecord) -> SyncRecord;

    /// Look up a row by id, tombstones included.
    fn find(&self, conn: &Connection, id: &str) -> Result<Option<TypedRecord>>;

    /// Whether writing `incoming` over `existing` would silently discard a newer edit made on
    /// another device. `device_id` stands in for an incoming record without its own `deviceId`.
    fn conflict(
        &self,
        existing: Option<&TypedRecord>,
        incoming: &TypedRecord,
        device_id: &str,
    ) -> bool;

    /// Insert or update `incoming`, stamping `updatedAt`/`syncedAt` with `now`,
    /// `syncStatus = synced` and `deviceId = writer`.
    fn write(
        &self,
        conn: &Connection,
        existing: Option<&TypedRecord>,
        incoming: &TypedRecord,
        writer: &str,
        now: i64,
    ) -> Result<Written>;

    /// Rows with `updatedAt > since`, tombstones included, ordered by `updatedAt` then `id`.
    ///
    /// With a `limit` the result ends on a complete `updatedAt` group, so it may exceed the
    /// limit when several rows share the boundary timestamp.
    fn query_incremental(
        &self,
        conn: &Connection,
        since: i64,
        limit: Option<usize>,
    ) -> Result<Vec<SyncRecord>>;

    /// Whether any row has `updatedAt > since`.
    fn has_changes_since(&self, conn: &Connection, since: i64) -> Result<bool>;

    /// Rows whose `syncStatus` is `pending` or unset.
    fn count_pending(&self, conn: &Connection, scope: PendingScope<'_>) -> Result<u64>;
}
