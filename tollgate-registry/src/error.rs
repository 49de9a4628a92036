//! Registry error types.

use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur talking to the license registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry unreachable: {0}")]
    Unreachable(String),

    #[error("registry request timed out")]
    Timeout,

    #[error("license not found in registry: {0}")]
    NotFound(String),

    #[error("registry returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed registry response: {0}")]
    Malformed(String),

    #[error("invalid registry row for {key}: {reason}")]
    InvalidRow { key: String, reason: String },

    #[error("invalid registry configuration: {0}")]
    Config(String),
}

impl RegistryError {
    /// Returns true if the registry definitively answered that the key does
    /// not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if the registry could not give an answer at all.
    ///
    /// These failures are accounted against the offline grace window rather
    /// than treated as a verdict on the license.
    pub fn is_connectivity(&self) -> bool {
        !matches!(self, Self::NotFound(_) | Self::InvalidRow { .. })
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::Unreachable(e.to_string())
        }
    }
}
