//! Database layer for projsync

mod audit_repository;
mod conflict_repository;
mod connection;
mod migrations;

pub use audit_repository::{AuditLogger, NewAuditEntry, SqliteAuditLogger};
pub use conflict_repository::{ConflictRepository, SqliteConflictRepository};
pub use connection::Database;
