//! Generic sync record and its bookkeeping metadata

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Wire names of the sync-control fields every record carries.
pub mod fields {
    pub const ID: &str = "id";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const DEVICE_ID: &str = "deviceId";
    pub const SYNC_STATUS: &str = "syncStatus";
    pub const SYNCED_AT: &str = "syncedAt";
    pub const DELETED: &str = "deleted";
}

/// Reconciliation state of a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Written locally, not yet reconciled
    Pending,
    /// Reconciled with the central store
    Synced,
}

impl SyncStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            other => Err(format!("unknown sync status '{other}'")),
        }
    }
}

/// A record as exchanged with clients: field name to JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncRecord(Map<String, Value>);

impl SyncRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// The `id` field, when present as a string.
    pub fn id(&self) -> Option<&str> {
        self.0.get(fields::ID).and_then(Value::as_str)
    }

    /// `true` when the tombstone flag is set.
    pub fn is_deleted(&self) -> bool {
        self.0
            .get(fields::DELETED)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// A timestamp field already normalized to epoch milliseconds.
    pub fn millis(&self, field: &str) -> Option<i64> {
        self.0.get(field).and_then(Value::as_i64)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for SyncRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Typed view of the sync-control fields.
///
/// Conflict detection and write stamping operate on this, never on the raw map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncMeta {
    pub id: String,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub device_id: Option<String>,
    pub sync_status: Option<SyncStatus>,
    pub synced_at: Option<i64>,
    pub deleted: bool,
}

impl SyncMeta {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: None,
            updated_at: None,
            device_id: None,
            sync_status: None,
            synced_at: None,
            deleted: false,
        }
    }
}
