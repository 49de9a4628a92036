//! Storage layer for Tollgate.
//!
//! Two stores live here:
//! - The local license store, which persists the single [`LicenseRecord`]
//!   for this installation. Writes replace the whole record atomically.
//! - The audit log, an append-only SQLite database of validation attempts and
//!   audited state changes.
//!
//! [`LicenseRecord`]: tollgate_types::LicenseRecord

mod audit_log;
mod error;
mod record_store;

pub use audit_log::AuditLog;
pub use error::{StoreError, StoreResult};
pub use record_store::{FileLicenseStore, LicenseStore, MemoryLicenseStore};
