//! Upload and download orchestration

use std::sync::Arc;

use rusqlite::Connection;
use uuid::Uuid;

use super::incremental::IncrementalReader;
use super::request_cache::RequestCache;
use super::stats::StatsCollector;
use crate::adapters::{AdapterRegistry, SyncAdapter, TypedRecord};
use crate::config::EngineConfig;
use crate::db::{
    AuditLogger, ConflictRepository, Database, NewAuditEntry, SqliteAuditLogger,
    SqliteConflictRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    AuditEntry, AuditOperation, AuditStatus, AuditSummaryRow, ConflictInfo, DownloadRequest,
    DownloadStats, RecordFailure, SyncConflict, SyncRecord, SyncRequest, SyncResponse,
    UploadResult,
};
use crate::util::{compact_text, Clock, SystemClock};

/// Entry point of the sync engine.
///
/// Owns the store connection, the adapter registry, the idempotency cache and the clock.
/// Every operation is synchronous; callers that share a coordinator across threads wrap it
/// in a mutex.
pub struct SyncCoordinator {
    db: Database,
    registry: AdapterRegistry,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    cache: RequestCache,
}

/// What happened to one uploaded record
enum RecordOutcome {
    Written,
    Conflict(ConflictInfo),
}

/// Request-wide fields of one upload
#[derive(Clone, Copy)]
struct UploadScope<'a> {
    device_id: &'a str,
    table_name: &'a str,
    request_id: Option<&'a str>,
    force_overwrite: bool,
}

impl<'a> UploadScope<'a> {
    fn audit<'b>(
        &self,
        record_id: Option<&'b str>,
        status: AuditStatus,
        error_message: Option<&'b str>,
        created_at: i64,
    ) -> NewAuditEntry<'b>
    where
        'a: 'b,
    {
        NewAuditEntry {
            device_id: self.device_id,
            table_name: self.table_name,
            record_id,
            operation: AuditOperation::Upload,
            status,
            error_message,
            request_id: self.request_id,
            created_at,
        }
    }
}

impl SyncCoordinator {
    /// Coordinator over `db` with the built-in tables and default config
    pub fn new(db: Database) -> Self {
        let config = EngineConfig::default();
        Self {
            db,
            registry: AdapterRegistry::with_default_tables(),
            cache: RequestCache::new(config.request_cache_ttl, config.request_cache_capacity),
            config,
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.cache = RequestCache::new(config.request_cache_ttl, config.request_cache_capacity);
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: AdapterRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub const fn database(&self) -> &Database {
        &self.db
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(super) const fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub(super) fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    pub(super) fn conn(&self) -> &Connection {
        self.db.connection()
    }

    /// Apply a batch of client records to one table.
    ///
    /// Records are processed in order, each in its own transaction together with its audit
    /// entry. Decode failures and record-level write failures are counted and the batch
    /// continues; a storage outage aborts the call. Conflicts are reported, persisted, and not
    /// written unless `force_overwrite` is set.
    ///
    /// # Errors
    /// `Error::UnknownTable` or `Error::InvalidRequest` before any record is touched, or a
    /// storage outage.
    pub fn upload_batch(&self, request: &SyncRequest) -> Result<UploadResult> {
        let adapter = self.registry.get(&request.table_name)?;
        let device_id = required_device(&request.device_id)?;
        let table_name = adapter.table().as_str();
        let request_id = request
            .request_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        if let Some(request_id) = request_id {
            if let Some(mut cached) = self.cache.get(device_id, request_id, table_name, self.now()) {
                tracing::info!(
                    table = table_name,
                    device = device_id,
                    request_id,
                    "Replaying cached upload result"
                );
                cached.replayed = true;
                return Ok(cached);
            }
        }

        let scope = UploadScope {
            device_id,
            table_name,
            request_id,
            force_overwrite: request.force_overwrite,
        };
        let mut stats = StatsCollector::start(AuditOperation::Upload, table_name);
        let mut result = UploadResult::default();

        for (index, raw) in request.records.iter().enumerate() {
            let now = self.now();

            let typed = match adapter.decode(raw) {
                Ok(typed) => typed,
                Err(error) => {
                    let message = error.to_string();
                    tracing::debug!(table = table_name, index, error = %message, "Rejected record");
                    SqliteAuditLogger::new(self.conn()).record(&scope.audit(
                        raw.id(),
                        AuditStatus::Failed,
                        Some(&message),
                        now,
                    ))?;
                    stats.record(AuditStatus::Failed);
                    result.failed_count += 1;
                    result.failures.push(RecordFailure {
                        index,
                        id: raw.id().map(str::to_string),
                        error: message,
                    });
                    continue;
                }
            };

            let record_id = typed.meta.id.as_str();
            match self.apply_record(adapter, scope, raw, &typed, now) {
                Ok(RecordOutcome::Written) => {
                    stats.record(AuditStatus::Success);
                    result.success_count += 1;
                }
                Ok(RecordOutcome::Conflict(info)) => {
                    stats.record(AuditStatus::Conflict);
                    result.conflict_count += 1;
                    result.conflicts.push(info);
                }
                Err(error) if error.is_storage_outage() => {
                    tracing::error!(
                        table = table_name,
                        device = device_id,
                        record = record_id,
                        error = %error,
                        "Storage unavailable, aborting upload"
                    );
                    return Err(error);
                }
                Err(error) => {
                    let message = compact_text(&error.to_string());
                    tracing::warn!(table = table_name, record = record_id, error = %message, "Record write failed");
                    SqliteAuditLogger::new(self.conn()).record(&scope.audit(
                        Some(record_id),
                        AuditStatus::Failed,
                        Some(&message),
                        now,
                    ))?;
                    stats.record(AuditStatus::Failed);
                    result.failed_count += 1;
                    result.failures.push(RecordFailure {
                        index,
                        id: Some(record_id.to_string()),
                        error: message,
                    });
                }
            }
        }

        result.execution_time_ms = stats.finish(device_id);

        if let Some(request_id) = request_id {
            self.cache
                .put(device_id, request_id, table_name, &result, self.now());
        }

        Ok(result)
    }

    /// Conflict check, then write or record the conflict, in one transaction with its audit entry
    fn apply_record(
        &self,
        adapter: &dyn SyncAdapter,
        scope: UploadScope<'_>,
        raw: &SyncRecord,
        typed: &TypedRecord,
        now: i64,
    ) -> Result<RecordOutcome> {
        let record_id = typed.meta.id.as_str();
        let tx = self.conn().unchecked_transaction()?;
        let existing = adapter.find(&tx, record_id)?;
        let conflicting = existing.as_ref().filter(|stored| {
            !scope.force_overwrite && adapter.conflict(Some(stored), typed, scope.device_id)
        });

        if let Some(stored) = conflicting {
            let info = ConflictInfo {
                conflict_id: Uuid::now_v7().to_string(),
                id: record_id.to_string(),
                table_name: scope.table_name.to_string(),
                local_version: raw.clone(),
                remote_version: adapter.encode(stored),
                local_updated_at: typed.meta.updated_at,
                remote_updated_at: stored.meta.updated_at,
            };

            SqliteConflictRepository::new(&tx).insert(&SyncConflict {
                id: info.conflict_id.clone(),
                table_name: info.table_name.clone(),
                record_id: info.id.clone(),
                device_id: typed
                    .meta
                    .device_id
                    .clone()
                    .unwrap_or_else(|| scope.device_id.to_string()),
                remote_updated_at: info.remote_updated_at,
                local_updated_at: info.local_updated_at,
                detected_at: now,
                resolved_at: None,
                resolution: None,
                resolved_by: None,
            })?;
            SqliteAuditLogger::new(&tx).record(&scope.audit(
                Some(record_id),
                AuditStatus::Conflict,
                None,
                now,
            ))?;
            tx.commit()?;

            tracing::info!(
                table = scope.table_name,
                record = record_id,
                device = scope.device_id,
                conflict_id = %info.conflict_id,
                "Upload conflict detected"
            );
            return Ok(RecordOutcome::Conflict(info));
        }

        adapter.write(&tx, existing.as_ref(), typed, scope.device_id, now)?;
        SqliteAuditLogger::new(&tx).record(&scope.audit(
            Some(record_id),
            AuditStatus::Success,
            None,
            now,
        ))?;
        tx.commit()?;
        Ok(RecordOutcome::Written)
    }

    /// Everything changed in `table_name` since `last_synced_at`, with the engine's default
    /// page limit.
    ///
    /// # Errors
    /// `Error::UnknownTable`, `Error::InvalidRequest`, or a storage error.
    pub fn download_incremental(
        &self,
        table_name: &str,
        last_synced_at: i64,
        device_id: &str,
    ) -> Result<SyncResponse> {
        self.download(&DownloadRequest {
            table_name: table_name.to_string(),
            last_synced_at,
            device_id: device_id.to_string(),
            limit: None,
        })
    }

    /// Incremental download with an optional per-call page limit.
    ///
    /// `next_watermark` stays strictly below `server_timestamp`. A write stamped in the same
    /// millisecond as this call is therefore delivered by the next call, at the cost of possibly
    /// re-sending rows from that millisecond.
    ///
    /// # Errors
    /// `Error::UnknownTable`, `Error::InvalidRequest`, or a storage error.
    pub fn download(&self, request: &DownloadRequest) -> Result<SyncResponse> {
        let adapter = self.registry.get(&request.table_name)?;
        let device_id = required_device(&request.device_id)?;
        let table_name = adapter.table().as_str();

        if request.last_synced_at < 0 {
            return Err(Error::InvalidRequest(
                "lastSyncedAt must not be negative".to_string(),
            ));
        }
        let limit = request.limit.or(self.config.default_page_limit);
        if limit == Some(0) {
            return Err(Error::InvalidRequest("limit must be at least 1".to_string()));
        }

        let mut stats = StatsCollector::start(AuditOperation::Download, table_name);
        let server_timestamp = self.now();
        let page = IncrementalReader::new(adapter).read(self.conn(), request.last_synced_at, limit)?;

        let settled = server_timestamp.saturating_sub(1).max(0);
        let next_watermark = match page.max_updated_at {
            Some(max) if page.has_more => max.min(settled),
            _ => settled,
        };

        stats.record_many(AuditStatus::Success, page.len());
        SqliteAuditLogger::new(self.conn()).record(&NewAuditEntry {
            device_id,
            table_name,
            record_id: None,
            operation: AuditOperation::Download,
            status: AuditStatus::Success,
            error_message: None,
            request_id: None,
            created_at: server_timestamp,
        })?;

        let stats = DownloadStats {
            new_count: page.new_records.len(),
            updated_count: page.updated_records.len(),
            deleted_count: page.deleted_ids.len(),
            conflict_count: 0,
            execution_time_ms: stats.finish(device_id),
        };

        Ok(SyncResponse {
            new_records: page.new_records,
            updated_records: page.updated_records,
            deleted_ids: page.deleted_ids,
            conflicts: Vec::new(),
            server_timestamp,
            next_watermark,
            has_more: page.has_more,
            stats,
        })
    }

    /// Unresolved conflicts, newest first
    ///
    /// # Errors
    /// `Error::UnknownTable` for an unknown filter, or a storage error.
    pub fn open_conflicts(&self, table_name: Option<&str>, limit: usize) -> Result<Vec<SyncConflict>> {
        let table = table_name
            .map(|name| self.registry.get(name).map(|adapter| adapter.table().as_str()))
            .transpose()?;
        SqliteConflictRepository::new(self.conn()).list_open(table, limit)
    }

    /// Newest audit entries first
    ///
    /// # Errors
    /// Returns an error if the audit log cannot be read.
    pub fn recent_audit(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        SqliteAuditLogger::new(self.conn()).recent(limit)
    }

    /// Audit counts by operation and status since `since` (unix ms)
    ///
    /// # Errors
    /// Returns an error if the audit log cannot be read.
    pub fn audit_summary(&self, since: i64) -> Result<Vec<AuditSummaryRow>> {
        SqliteAuditLogger::new(self.conn()).summary(since)
    }
}

/// Trimmed, non-empty device id
pub(super) fn required_device(device_id: &str) -> Result<&str> {
    let trimmed = device_id.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidRequest("deviceId must not be empty".to_string()));
    }
    Ok(trimmed)
}
