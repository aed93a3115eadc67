//! Request and response types of the four sync operations

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::record::SyncRecord;

/// Batch upload from one device to one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub table_name: String,
    pub device_id: String,
    /// Idempotency key; retries carrying the same key replay the first result
    #[serde(default)]
    pub request_id: Option<String>,
    /// Client watermark at upload time (informational)
    #[serde(default)]
    pub last_synced_at: i64,
    #[serde(default)]
    pub records: Vec<SyncRecord>,
    /// Write even when a conflict is detected
    #[serde(default)]
    pub force_overwrite: bool,
}

/// A record the upload could not apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFailure {
    /// Position of the record in the request
    pub index: usize,
    pub id: Option<String>,
    pub error: String,
}

/// Outcome of `upload_batch`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub success_count: usize,
    pub failed_count: usize,
    pub conflict_count: usize,
    pub conflicts: Vec<ConflictInfo>,
    pub failures: Vec<RecordFailure>,
    pub execution_time_ms: u64,
    /// Served from the idempotency cache without touching storage
    #[serde(default)]
    pub replayed: bool,
}

impl UploadResult {
    pub const fn processed(&self) -> usize {
        self.success_count + self.failed_count + self.conflict_count
    }
}

/// A detected disagreement between the client's and the server's version of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    /// Handle for `resolve_conflict`
    pub conflict_id: String,
    pub id: String,
    pub table_name: String,
    /// The client's incoming version
    pub local_version: SyncRecord,
    /// The version currently stored on the server
    pub remote_version: SyncRecord,
    pub local_updated_at: Option<i64>,
    pub remote_updated_at: Option<i64>,
}

/// Parameters of an incremental download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub table_name: String,
    /// Exclusive lower bound on `updatedAt`; `0` downloads the full history
    #[serde(default)]
    pub last_synced_at: i64,
    pub device_id: String,
    /// Page size; falls back to the engine default
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Per-category counts of a download
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStats {
    pub new_count: usize,
    pub updated_count: usize,
    pub deleted_count: usize,
    pub conflict_count: usize,
    pub execution_time_ms: u64,
}

/// Outcome of `download_incremental`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub new_records: Vec<SyncRecord>,
    pub updated_records: Vec<SyncRecord>,
    pub deleted_ids: Vec<String>,
    pub conflicts: Vec<ConflictInfo>,
    pub server_timestamp: i64,
    /// Watermark for the next call; equals `server_timestamp` unless the page was truncated
    pub next_watermark: i64,
    pub has_more: bool,
    pub stats: DownloadStats,
}

/// How a conflict is settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Keep the client's version
    Local,
    /// Keep the server's version
    Remote,
    /// Keep a client-side merge of both
    Manual,
}

impl Resolution {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown resolution '{other}'")),
        }
    }
}

/// Input of `resolve_conflict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolution {
    #[serde(default)]
    pub conflict_id: Option<String>,
    pub table_name: String,
    pub record_id: String,
    pub resolution: Resolution,
    pub device_id: String,
    #[serde(default)]
    pub merged_data: Option<SyncRecord>,
}

/// Outcome of `sync_status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusReport {
    pub device_id: String,
    pub server_time: i64,
    /// Pending or unset records per table, across all devices
    pub pending_counts: BTreeMap<String, u64>,
    /// Pending or unset records per table, last written by `device_id`
    pub device_pending_counts: BTreeMap<String, u64>,
    pub is_online: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sync_request_uses_camel_case_and_defaults() {
        let request: SyncRequest = serde_json::from_value(json!({
            "tableName": "projects",
            "deviceId": "device-a",
            "records": [{"id": "p1"}]
        }))
        .unwrap();
        assert_eq!(request.table_name, "projects");
        assert_eq!(request.request_id, None);
        assert_eq!(request.last_synced_at, 0);
        assert!(!request.force_overwrite);
        assert_eq!(request.records.len(), 1);
    }

    #[test]
    fn resolution_parses_lowercase() {
        let resolution: ConflictResolution = serde_json::from_value(json!({
            "tableName": "projects",
            "recordId": "p1",
            "resolution": "remote",
            "deviceId": "device-a"
        }))
        .unwrap();
        assert_eq!(resolution.resolution, Resolution::Remote);
        assert!(resolution.merged_data.is_none());
        assert_eq!("manual".parse::<Resolution>(), Ok(Resolution::Manual));
    }

    #[test]
    fn upload_result_counts_every_outcome() {
        let result = UploadResult {
            success_count: 2,
            failed_count: 1,
            conflict_count: 1,
            ..UploadResult::default()
        };
        assert_eq!(result.processed(), 4);
    }
}
