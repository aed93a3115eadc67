//! Persisted sync conflict model

use serde::{Deserialize, Serialize};

use super::sync::Resolution;

/// A conflict detected during upload, kept until a client resolves it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    /// Conflict identifier (UUID v7)
    pub id: String,
    pub table_name: String,
    pub record_id: String,
    /// Device whose upload was rejected
    pub device_id: String,
    /// Server row's `updatedAt` when the conflict occurred
    pub remote_updated_at: Option<i64>,
    /// Incoming row's `updatedAt` that was rejected
    pub local_updated_at: Option<i64>,
    /// Detection timestamp (unix ms)
    pub detected_at: i64,
    /// Resolution timestamp (unix ms), `None` while open
    pub resolved_at: Option<i64>,
    pub resolution: Option<Resolution>,
    pub resolved_by: Option<String>,
}

impl SyncConflict {
    pub const fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}
