//! projsync-core - Sync engine for projsync
//!
//! This crate contains the shared models, table adapters, database layer, and the sync
//! coordinator used by the projsync interfaces (HTTP API, CLI).

pub mod adapters;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod sync;
pub mod util;

pub use adapters::{AdapterRegistry, SyncAdapter};
pub use config::EngineConfig;
pub use db::Database;
pub use error::{DecodeError, Error, Result};
pub use sync::SyncCoordinator;
