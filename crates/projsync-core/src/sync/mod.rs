//! Sync engine: upload, download, status and conflict resolution

mod conflict;
mod coordinator;
mod incremental;
mod request_cache;
mod resolver;
mod stats;
mod status;


pub use conflict::detect_conflict;
pub use coordinator::SyncCoordinator;
pub use incremental::{classify, IncrementalPage, IncrementalReader};
pub use request_cache::RequestCache;
pub use stats::StatsCollector;
