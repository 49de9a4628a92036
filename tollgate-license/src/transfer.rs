//! Hardware transfer coordination.
//!
//! A transfer moves a license's binding to a new machine. It is requested,
//! confirmed out of band through a [`VerificationCapability`], written back
//! to the registry and only then applied locally. Until confirmation the
//! existing binding stays authoritative.

use crate::error::{LicenseError, LicenseResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tollgate_types::{HardwareFingerprint, LicenseKey, LicenseRecord};
use uuid::Uuid;

/// A transfer waiting for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransfer {
    pub id: Uuid,
    pub key: LicenseKey,
    /// Fingerprint of the machine taking over.
    pub new_fingerprint: HardwareFingerprint,
    /// Transfers used when the request was made. Confirmation counts from
    /// the license as it stands then.
    pub transfer_count: u32,
    pub max_transfers: u32,
    pub requested_at: DateTime<Utc>,
    /// Name of the requesting machine, shown to the verifier.
    pub requested_by: String,
}

impl PendingTransfer {
    /// Transfers left after this one completes.
    pub fn remaining_after(&self) -> u32 {
        self.max_transfers.saturating_sub(self.transfer_count + 1)
    }
}

/// The verifier approved the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmed;

/// The verifier declined the transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub reason: String,
}

impl Rejected {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Out-of-band confirmation of a transfer (email link, support desk, ...).
#[async_trait]
pub trait VerificationCapability: Send + Sync {
    async fn request_confirmation(&self, transfer: &PendingTransfer) -> Result<Confirmed, Rejected>;
}

/// Tracks pending transfers and enforces the transfer ceiling.
#[derive(Debug, Default)]
pub struct TransferCoordinator {
    pending: HashMap<Uuid, PendingTransfer>,
}

impl TransferCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a transfer of `basis` to the machine with `new_fingerprint`.
    ///
    /// Fails with `TransferLimitExceeded` once the ceiling is reached and
    /// with `Revoked` for a revoked license. Nothing is changed on failure.
    pub fn request(
        &mut self,
        basis: LicenseRecord,
        new_fingerprint: HardwareFingerprint,
        requested_by: String,
        now: DateTime<Utc>,
    ) -> LicenseResult<PendingTransfer> {
        Self::admit(&basis)?;

        let transfer = PendingTransfer {
            id: Uuid::now_v7(),
            key: basis.key.clone(),
            new_fingerprint,
            transfer_count: basis.transfer_count,
            max_transfers: basis.max_transfers,
            requested_at: now,
            requested_by,
        };
        // One open transfer per key; a new request replaces the old one.
        self.pending.retain(|_, p| p.key != transfer.key);
        self.pending.insert(transfer.id, transfer.clone());
        Ok(transfer)
    }

    /// Removes a pending transfer for confirmation.
    pub fn take(&mut self, id: Uuid) -> LicenseResult<PendingTransfer> {
        self.pending
            .remove(&id)
            .ok_or(LicenseError::UnknownTransfer(id))
    }

    /// Puts back a transfer whose confirmation could not complete.
    pub fn restore(&mut self, transfer: PendingTransfer) {
        self.pending.insert(transfer.id, transfer);
    }

    pub fn get(&self, id: Uuid) -> Option<&PendingTransfer> {
        self.pending.get(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Fails unless `record` may still be moved to another machine.
    pub fn admit(record: &LicenseRecord) -> LicenseResult<()> {
        if record.is_revoked() {
            return Err(LicenseError::Revoked);
        }
        if record.transfers_exhausted() {
            return Err(LicenseError::TransferLimitExceeded {
                used: record.transfer_count,
                max: record.max_transfers,
            });
        }
        Ok(())
    }

    /// `current` after the transfer: new binding, one more transfer used.
    pub fn rebound(
        mut current: LicenseRecord,
        transfer: &PendingTransfer,
        now: DateTime<Utc>,
    ) -> LicenseRecord {
        current.bound_fingerprint = Some(transfer.new_fingerprint.clone());
        current.transfer_count += 1;
        current.last_online_check = Some(now);
        current.offline_grace_deadline = None;
        current
    }
}
