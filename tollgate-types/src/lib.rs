//! Core type definitions for Tollgate.
//!
//! This crate defines the vocabulary shared by every other layer:
//! - Canonical hardware component names and hashed fingerprints
//! - License keys and the locally persisted license record
//! - Validation and audit log entries
//!
//! The collector and the registry mapping both name components through
//! [`HardwareComponent`], never through strings, so the two sides cannot drift
//! apart without a compile error.

mod component;
mod fingerprint;
mod key;
mod log;
mod record;

pub use component::HardwareComponent;
pub use fingerprint::{ComponentHash, HardwareFingerprint};
pub use key::LicenseKey;
pub use log::{AuditKind, AuditLogEntry, ReasonCode, ValidationLogEntry, ValidationResultKind};
pub use record::{LicenseRecord, RecordStatus};

/// Result type alias using the crate's error type.
pub type TypesResult<T> = std::result::Result<T, TypesError>;

/// Errors that can occur constructing shared types.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid license key: {0}")]
    InvalidKey(String),

    #[error("invalid component hash: {0}")]
    InvalidHash(String),

    #[error("unknown hardware component: {0}")]
    UnknownComponent(String),
}
