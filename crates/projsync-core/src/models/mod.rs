//! Data models for projsync

mod audit;
mod record;
mod sync;
mod sync_conflict;
mod table;

pub use audit::{AuditEntry, AuditOperation, AuditStatus, AuditSummaryRow};
pub use record::{fields, SyncMeta, SyncRecord, SyncStatus};
pub use sync::{
    ConflictInfo, ConflictResolution, DownloadRequest, DownloadStats, RecordFailure, Resolution,
    SyncRequest, SyncResponse, SyncStatusReport, UploadResult,
};
pub use sync_conflict::SyncConflict;
pub use table::SyncTable;
