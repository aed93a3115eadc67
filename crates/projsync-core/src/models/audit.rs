//! Audit log entries

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sync operation an audit entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    Upload,
    Download,
    ResolveConflict,
}

impl AuditOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Download => "download",
            Self::ResolveConflict => "resolve_conflict",
        }
    }
}

/// Outcome recorded for one record (or one call, for downloads)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Failed,
    Conflict,
}

impl AuditStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Conflict => "conflict",
        }
    }
}

macro_rules! impl_wire_name {
    ($ty:ty, $($variant:ident),+) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s == Self::$variant.as_str() {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("unknown {} '{s}'", stringify!($ty)))
            }
        }
    };
}

impl_wire_name!(AuditOperation, Upload, Download, ResolveConflict);
impl_wire_name!(AuditStatus, Success, Failed, Conflict);

/// One row of the sync audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub device_id: String,
    pub table_name: String,
    pub record_id: Option<String>,
    pub operation: AuditOperation,
    pub status: AuditStatus,
    pub error_message: Option<String>,
    pub request_id: Option<String>,
    pub created_at: i64,
}

/// Audit rows grouped by operation and status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummaryRow {
    pub operation: AuditOperation,
    pub status: AuditStatus,
    pub count: u64,
}
