//! License state machine.
//!
//! ```text
//! Unactivated ──activate──▶ Active ◀──online ok──▶ OfflineGrace ──deadline passed──▶ Blocked
//!                             │
//!                             ├── registry says revoked ──▶ Revoked   (sticky)
//!                             ├── past expiry ────────────▶ Expired
//!                             └── pending / suspended / hardware mismatch / unknown key ──▶ Blocked
//! ```
//!
//! The functions here are pure: they take the cached record, what was
//! learned this pass and the current time, update the record in place and
//! return the resulting state. Persistence and notification belong to the
//! engine.

use crate::config::EngineConfig;
use crate::grace::GraceWindow;
use crate::matcher::{match_fingerprints, MatchReport, MismatchKind};
use chrono::{DateTime, Utc};
use std::fmt;
use tollgate_registry::RemoteSnapshot;
use tollgate_types::{HardwareFingerprint, LicenseRecord, ReasonCode, RecordStatus};

/// Canonical status of this installation's license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseState {
    Unactivated,
    Active,
    /// Registry unreachable; running on the cached record until `deadline`.
    OfflineGrace { deadline: DateTime<Utc> },
    Revoked,
    Expired,
    Blocked { reason: BlockReason },
}

/// Why a license is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    GraceExpired,
    FingerprintMismatch(MismatchKind),
    Pending,
    Suspended,
    KeyNotFound,
    InvalidRegistryRecord,
}

impl BlockReason {
    pub const fn reason_code(&self) -> ReasonCode {
        match self {
            Self::GraceExpired => ReasonCode::GraceExpired,
            Self::FingerprintMismatch(_) => ReasonCode::FingerprintMismatch,
            Self::Pending => ReasonCode::Pending,
            Self::Suspended => ReasonCode::Suspended,
            Self::KeyNotFound => ReasonCode::KeyNotFound,
            Self::InvalidRegistryRecord => ReasonCode::InvalidRegistryRecord,
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GraceExpired => write!(f, "offline grace period has ended"),
            Self::FingerprintMismatch(kind) => write!(f, "hardware mismatch: {kind}"),
            Self::Pending => write!(f, "license is pending approval"),
            Self::Suspended => write!(f, "license is suspended"),
            Self::KeyNotFound => write!(f, "license key not found in registry"),
            Self::InvalidRegistryRecord => write!(f, "registry record for this license is invalid"),
        }
    }
}

impl LicenseState {
    /// Returns true if the host must not run.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Self::Active | Self::OfflineGrace { .. })
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unactivated => "unactivated",
            Self::Active => "active",
            Self::OfflineGrace { .. } => "offline_grace",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
            Self::Blocked { .. } => "blocked",
        }
    }

    pub fn reason_code(&self) -> ReasonCode {
        match self {
            Self::Unactivated => ReasonCode::NotActivated,
            Self::Active => ReasonCode::Ok,
            Self::OfflineGrace { .. } => ReasonCode::OfflineGrace,
            Self::Revoked => ReasonCode::Revoked,
            Self::Expired => ReasonCode::Expired,
            Self::Blocked { reason } => reason.reason_code(),
        }
    }

    fn blocked(reason: BlockReason) -> Self {
        Self::Blocked { reason }
    }
}

impl fmt::Display for LicenseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OfflineGrace { deadline } => {
                write!(f, "offline_grace (until {})", deadline.format("%Y-%m-%d %H:%M UTC"))
            }
            Self::Blocked { reason } => write!(f, "blocked ({reason})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Builds a fresh record from a registry row.
pub(crate) fn new_record(
    snapshot: &RemoteSnapshot,
    binding: HardwareFingerprint,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> LicenseRecord {
    LicenseRecord {
        key: snapshot.key.clone(),
        status: snapshot.status,
        tier: snapshot.tier.clone(),
        owner: snapshot.owner.clone(),
        bound_fingerprint: Some(binding),
        match_threshold: snapshot
            .match_threshold
            .unwrap_or(config.default_match_threshold),
        expires_at: snapshot.expires_at,
        transfer_count: snapshot.transfer_count,
        max_transfers: snapshot.max_transfers.unwrap_or(config.default_max_transfers),
        manual_verification_count: 0,
        verification_reset_time: None,
        last_online_check: Some(now),
        offline_grace_deadline: None,
        activated_at: now,
    }
}

/// Transition rules, parameterised by the engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct StateMachine<'a> {
    config: &'a EngineConfig,
}

impl<'a> StateMachine<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Evaluates a record against this machine, ignoring connectivity.
    pub fn evaluate(
        &self,
        record: &LicenseRecord,
        local: &HardwareFingerprint,
        now: DateTime<Utc>,
    ) -> LicenseState {
        match record.status {
            RecordStatus::Revoked => return LicenseState::Revoked,
            RecordStatus::Pending => return LicenseState::blocked(BlockReason::Pending),
            RecordStatus::Suspended => return LicenseState::blocked(BlockReason::Suspended),
            RecordStatus::Expired | RecordStatus::Active => {}
        }
        if record.is_expired_at(now) {
            return LicenseState::Expired;
        }
        match self.check_hardware(record, local) {
            Ok(_) => LicenseState::Active,
            Err(kind) => LicenseState::blocked(BlockReason::FingerprintMismatch(kind)),
        }
    }

    /// Compares the record's binding with this machine.
    ///
    /// Returns the report when a binding exists and matches.
    pub fn check_hardware(
        &self,
        record: &LicenseRecord,
        local: &HardwareFingerprint,
    ) -> Result<Option<MatchReport>, MismatchKind> {
        match record.bound_fingerprint.as_ref().filter(|b| !b.is_empty()) {
            None if self.config.require_remote_hardware_match => Err(MismatchKind::NoBinding),
            None => Ok(None),
            Some(binding) => {
                let report = match_fingerprints(binding, local, record.match_threshold);
                match report.mismatch_kind() {
                    None => Ok(Some(report)),
                    Some(kind) => Err(kind),
                }
            }
        }
    }

    /// The registry returned a row for the cached key.
    ///
    /// The row refreshes the record (most recent observation wins) unless the
    /// record has already seen a revocation, which no later answer clears.
    pub fn apply_online(
        &self,
        record: &mut LicenseRecord,
        snapshot: &RemoteSnapshot,
        local: &HardwareFingerprint,
        now: DateTime<Utc>,
    ) -> LicenseState {
        record.last_online_check = Some(now);
        record.offline_grace_deadline = None;

        if record.is_revoked() {
            return LicenseState::Revoked;
        }

        record.status = snapshot.status;
        record.tier = snapshot.tier.clone();
        record.owner = snapshot.owner.clone();
        record.expires_at = snapshot.expires_at;
        record.transfer_count = snapshot.transfer_count;
        if let Some(max) = snapshot.max_transfers {
            record.max_transfers = max;
        }
        if let Some(threshold) = snapshot.match_threshold {
            record.match_threshold = threshold;
        }
        if let Some(binding) = &snapshot.bound_fingerprint {
            record.bound_fingerprint = Some(binding.clone());
        }

        self.evaluate(record, local, now)
    }

    /// The registry answered, but not with a usable row.
    pub fn apply_answered_block(
        &self,
        record: &mut LicenseRecord,
        reason: BlockReason,
        now: DateTime<Utc>,
    ) -> LicenseState {
        record.last_online_check = Some(now);
        record.offline_grace_deadline = None;
        if record.is_revoked() {
            LicenseState::Revoked
        } else {
            LicenseState::blocked(reason)
        }
    }

    /// The registry could not be reached.
    ///
    /// The first failure of a streak fixes the grace deadline; later failures
    /// leave it where it is.
    pub fn apply_offline(
        &self,
        record: &mut LicenseRecord,
        local: &HardwareFingerprint,
        now: DateTime<Utc>,
    ) -> LicenseState {
        let deadline = *record
            .offline_grace_deadline
            .get_or_insert_with(|| GraceWindow::new(now, now, self.config.grace_window_days).deadline());

        match self.evaluate(record, local, now) {
            LicenseState::Active => {
                if GraceWindow::with_deadline(deadline, now).expired() {
                    LicenseState::blocked(BlockReason::GraceExpired)
                } else {
                    LicenseState::OfflineGrace { deadline }
                }
            }
            other => other,
        }
    }
}
