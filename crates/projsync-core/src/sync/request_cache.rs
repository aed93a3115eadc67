//! Idempotency cache for upload batches

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::models::UploadResult;

type CacheKey = (String, String);

/// Upload results keyed by `(deviceId, requestId)`, kept for a fixed TTL
pub struct RequestCache {
    state: Mutex<HashMap<CacheKey, CachedUpload>>,
    ttl_ms: i64,
    capacity: usize,
}

#[derive(Debug, Clone)]
struct CachedUpload {
    table_name: String,
    result: UploadResult,
    stored_at: i64,
}

impl RequestCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            capacity: capacity.max(1),
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.ttl_ms > 0
    }

    /// Cached result of an earlier upload with the same key, if still fresh.
    ///
    /// A hit recorded against another table is ignored.
    pub fn get(&self, device_id: &str, request_id: &str, table_name: &str, now: i64) -> Option<UploadResult> {
        if !self.is_enabled() {
            return None;
        }

        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (device_id.to_string(), request_id.to_string());
        let entry = guard.get(&key)?;

        if now.saturating_sub(entry.stored_at) >= self.ttl_ms {
            guard.remove(&key);
            return None;
        }

        if entry.table_name != table_name {
            tracing::warn!(
                device = device_id,
                request_id,
                cached_table = %entry.table_name,
                table = table_name,
                "Request id reused for a different table, not replaying"
            );
            return None;
        }

        Some(entry.result.clone())
    }

    /// Remember the result of an upload
    pub fn put(&self, device_id: &str, request_id: &str, table_name: &str, result: &UploadResult, now: i64) {
        if !self.is_enabled() {
            return;
        }

        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (device_id.to_string(), request_id.to_string());

        if !guard.contains_key(&key) && guard.len() >= self.capacity {
            guard.retain(|_, entry| now.saturating_sub(entry.stored_at) < self.ttl_ms);
            if guard.len() >= self.capacity {
                let oldest = guard
                    .iter()
                    .min_by_key(|(_, entry)| entry.stored_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    guard.remove(&oldest);
                }
            }
        }

        guard.insert(
            key,
            CachedUpload {
                table_name: table_name.to_string(),
                result: result.clone(),
                stored_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
