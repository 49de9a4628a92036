//! Error types for the licensing engine.

use crate::matcher::MismatchKind;
use thiserror::Error;
use tollgate_registry::RegistryError;
use tollgate_storage::StoreError;
use tollgate_types::{ReasonCode, TypesError};
use uuid::Uuid;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Engine configuration is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// License key could not be parsed.
    #[error("invalid license key: {0}")]
    InvalidKey(#[from] TypesError),

    /// The registry answered, but the license cannot be activated.
    #[error("activation refused: {0}")]
    ActivationRefused(ReasonCode),

    /// Current hardware does not match the license binding.
    #[error("hardware fingerprint mismatch: {0}")]
    FingerprintMismatch(MismatchKind),

    /// The license has already been moved the maximum number of times.
    #[error("transfer limit exceeded ({used} of {max} transfers used)")]
    TransferLimitExceeded { used: u32, max: u32 },

    /// The verification step declined the transfer.
    #[error("transfer rejected: {0}")]
    TransferRejected(String),

    /// No verification capability was configured.
    #[error("no transfer verification capability configured")]
    NoVerifier,

    /// Transfer id does not name a pending transfer.
    #[error("no pending transfer {0}")]
    UnknownTransfer(Uuid),

    /// License has been revoked.
    #[error("license has been revoked")]
    Revoked,

    /// Daily manual verification budget is spent.
    #[error("manual verification limit reached ({limit} per day)")]
    RateLimited { limit: u32 },

    /// Registry unreachable or returned an unusable answer.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Local persistence failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// A blocking task or the background validator failed.
    #[error("task failed: {0}")]
    Task(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LicenseError {
    /// Reason code recorded in the validation log for this error.
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            Self::ActivationRefused(code) => *code,
            Self::FingerprintMismatch(_) => ReasonCode::FingerprintMismatch,
            Self::TransferLimitExceeded { .. } => ReasonCode::TransferLimitExceeded,
            Self::TransferRejected(_) | Self::NoVerifier | Self::UnknownTransfer(_) => {
                ReasonCode::TransferRejected
            }
            Self::Revoked => ReasonCode::Revoked,
            Self::RateLimited { .. } => ReasonCode::RateLimited,
            Self::Registry(e) if e.is_not_found() => ReasonCode::KeyNotFound,
            Self::Registry(RegistryError::InvalidRow { .. }) => ReasonCode::InvalidRegistryRecord,
            Self::Registry(_) => ReasonCode::NetworkError,
            Self::Storage(_) | Self::Task(_) | Self::Serialization(_) => ReasonCode::StoreError,
            Self::Config(_) | Self::InvalidKey(_) => ReasonCode::NotActivated,
        }
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
