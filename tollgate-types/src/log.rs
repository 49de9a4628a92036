//! Append-only validation and audit log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result class of a validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationResultKind {
    /// Use is allowed (possibly with a warning).
    Success,
    /// The attempt could not complete (rate limit, activation refused, ...).
    Failure,
    /// Use is denied.
    Blocked,
}

impl ValidationResultKind {
    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Blocked => "blocked",
        }
    }

    /// Parses a stored name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }
}

/// Machine-readable reason attached to every validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    Ok,
    ExpiringSoon,
    OfflineGrace,
    GraceExpired,
    Revoked,
    Expired,
    FingerprintMismatch,
    NotActivated,
    KeyNotFound,
    Pending,
    Suspended,
    InvalidRegistryRecord,
    StoreError,
    NetworkError,
    RateLimited,
    TransferLimitExceeded,
    TransferRejected,
}

impl ReasonCode {
    const ALL: [Self; 17] = [
        Self::Ok,
        Self::ExpiringSoon,
        Self::OfflineGrace,
        Self::GraceExpired,
        Self::Revoked,
        Self::Expired,
        Self::FingerprintMismatch,
        Self::NotActivated,
        Self::KeyNotFound,
        Self::Pending,
        Self::Suspended,
        Self::InvalidRegistryRecord,
        Self::StoreError,
        Self::NetworkError,
        Self::RateLimited,
        Self::TransferLimitExceeded,
        Self::TransferRejected,
    ];

    /// Returns the snake_case code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::ExpiringSoon => "expiring_soon",
            Self::OfflineGrace => "offline_grace",
            Self::GraceExpired => "grace_expired",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
            Self::FingerprintMismatch => "fingerprint_mismatch",
            Self::NotActivated => "not_activated",
            Self::KeyNotFound => "key_not_found",
            Self::Pending => "pending",
            Self::Suspended => "suspended",
            Self::InvalidRegistryRecord => "invalid_registry_record",
            Self::StoreError => "store_error",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::TransferLimitExceeded => "transfer_limit_exceeded",
            Self::TransferRejected => "transfer_rejected",
        }
    }

    /// Parses a stored code.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_str() == s)
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationLogEntry {
    pub timestamp: DateTime<Utc>,
    pub result: ValidationResultKind,
    pub reason: ReasonCode,
    /// Whether the registry answered during this attempt.
    pub online: bool,
}

/// Kind of audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Activation,
    Transfer,
    RevocationDetected,
    AutoRecovery,
    ManualVerification,
    Reset,
}

impl AuditKind {
    /// Returns the snake_case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Activation => "activation",
            Self::Transfer => "transfer",
            Self::RevocationDetected => "revocation_detected",
            Self::AutoRecovery => "auto_recovery",
            Self::ManualVerification => "manual_verification",
            Self::Reset => "reset",
        }
    }

    /// Parses a stored name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "activation" => Some(Self::Activation),
            "transfer" => Some(Self::Transfer),
            "revocation_detected" => Some(Self::RevocationDetected),
            "auto_recovery" => Some(Self::AutoRecovery),
            "manual_verification" => Some(Self::ManualVerification),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audited state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: AuditKind,
    pub detail: String,
}

impl AuditLogEntry {
    /// Creates an entry.
    pub fn new(timestamp: DateTime<Utc>, kind: AuditKind, detail: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind,
            detail: detail.into(),
        }
    }
}
