//! Per-operation timing and outcome tallies

use std::collections::BTreeMap;
use std::time::Instant;

use crate::models::{AuditOperation, AuditStatus};

/// Times one sync operation and counts its per-record outcomes
#[derive(Debug)]
pub struct StatsCollector {
    operation: AuditOperation,
    table: String,
    started: Instant,
    tallies: BTreeMap<AuditStatus, usize>,
}

impl StatsCollector {
    pub fn start(operation: AuditOperation, table: impl Into<String>) -> Self {
        Self {
            operation,
            table: table.into(),
            started: Instant::now(),
            tallies: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, status: AuditStatus) {
        self.record_many(status, 1);
    }

    pub fn record_many(&mut self, status: AuditStatus, count: usize) {
        *self.tallies.entry(status).or_default() += count;
    }

    pub fn count(&self, status: AuditStatus) -> usize {
        self.tallies.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.tallies.values().sum()
    }

    /// Milliseconds since `start`
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Emit the tallies as one `tracing` event and return the elapsed time
    pub fn finish(self, device_id: &str) -> u64 {
        let elapsed_ms = self.elapsed_ms();
        tracing::info!(
            operation = self.operation.as_str(),
            table = %self.table,
            device = device_id,
            success = self.count(AuditStatus::Success),
            failed = self.count(AuditStatus::Failed),
            conflict = self.count(AuditStatus::Conflict),
            elapsed_ms,
            "Sync operation finished"
        );
        elapsed_ms
    }
}
