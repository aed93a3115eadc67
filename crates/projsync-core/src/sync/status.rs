//! Pending-sync accounting

use std::collections::BTreeMap;

use super::coordinator::{required_device, SyncCoordinator};
use crate::adapters::PendingScope;
use crate::error::Result;
use crate::models::SyncStatusReport;

impl SyncCoordinator {
    /// Pending or unsynced record counts for every registered table.
    ///
    /// `pending_counts` covers all devices; `device_pending_counts` only rows last written by
    /// `device_id`.
    ///
    /// # Errors
    /// `Error::InvalidRequest` for an empty device id, or a storage error.
    pub fn sync_status(&self, device_id: &str) -> Result<SyncStatusReport> {
        let device_id = required_device(device_id)?;
        let mut pending_counts = BTreeMap::new();
        let mut device_pending_counts = BTreeMap::new();

        for table in self.registry().tables() {
            let Some(adapter) = self.registry().adapter(table) else {
                continue;
            };
            pending_counts.insert(
                table.as_str().to_string(),
                adapter.count_pending(self.conn(), PendingScope::Global)?,
            );
            device_pending_counts.insert(
                table.as_str().to_string(),
                adapter.count_pending(self.conn(), PendingScope::Device(device_id))?,
            );
        }

        let total: u64 = pending_counts.values().sum();
        tracing::info!(device = device_id, pending = total, "Sync status requested");

        Ok(SyncStatusReport {
            device_id: device_id.to_string(),
            server_time: self.now(),
            pending_counts,
            device_pending_counts,
            is_online: true,
        })
    }
}
