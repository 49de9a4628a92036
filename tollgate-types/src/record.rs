//! The locally persisted license record.

use crate::fingerprint::HardwareFingerprint;
use crate::key::LicenseKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a license as reported by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Issued but not yet approved.
    Pending,
    /// Valid and usable.
    Active,
    /// Administratively invalidated.
    Revoked,
    /// Past its term.
    Expired,
    /// Temporarily disabled.
    Suspended,
}

impl RecordStatus {
    /// Parses a registry status word, ignoring case and surrounding space.
    ///
    /// Returns `None` for words outside the known set.
    #[must_use]
    pub fn from_registry(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "revoked" => Some(Self::Revoked),
            "expired" => Some(Self::Expired),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }

    /// Returns the lowercase status word.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
            Self::Suspended => "suspended",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last-known license state for this installation.
///
/// Created on activation or auto-recovery, refreshed by every online
/// validation, and only removed by an administrative reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// License key.
    pub key: LicenseKey,
    /// Most recently observed registry status.
    pub status: RecordStatus,
    /// Commercial tier (free-form, registry-defined).
    pub tier: String,
    /// Owner identity (usually an email address).
    pub owner: Option<String>,
    /// Hardware this license is bound to.
    pub bound_fingerprint: Option<HardwareFingerprint>,
    /// Minimum number of agreeing components for a hardware match.
    pub match_threshold: usize,
    /// Expiry instant, or `None` for a perpetual license.
    pub expires_at: Option<DateTime<Utc>>,
    /// Completed hardware transfers.
    pub transfer_count: u32,
    /// Transfer ceiling.
    pub max_transfers: u32,
    /// Manual verifications consumed in the current day.
    pub manual_verification_count: u32,
    /// When the manual verification counter next resets.
    pub verification_reset_time: Option<DateTime<Utc>>,
    /// Last successful online confirmation.
    pub last_online_check: Option<DateTime<Utc>>,
    /// End of the current offline grace window, set on the first failed
    /// online check of a streak.
    pub offline_grace_deadline: Option<DateTime<Utc>>,
    /// When this record was first created on this machine.
    pub activated_at: DateTime<Utc>,
}

impl LicenseRecord {
    /// Returns true if the cached status is revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.status == RecordStatus::Revoked
    }

    /// Returns true if the record has passed its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == RecordStatus::Expired || self.expires_at.is_some_and(|exp| now > exp)
    }

    /// Returns true if no further transfers are allowed.
    #[must_use]
    pub fn transfers_exhausted(&self) -> bool {
        self.transfer_count >= self.max_transfers
    }

    /// Transfers still available.
    #[must_use]
    pub fn remaining_transfers(&self) -> u32 {
        self.max_transfers.saturating_sub(self.transfer_count)
    }
}
