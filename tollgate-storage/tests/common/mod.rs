//! Shared test helpers for storage tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use tollgate_types::{
    ComponentHash, HardwareComponent, HardwareFingerprint, LicenseKey, LicenseRecord,
    RecordStatus,
};

/// Fixed instant used across storage tests (whole seconds, so it survives
/// every timestamp encoding).
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap()
}

pub fn fingerprint() -> HardwareFingerprint {
    HardwareComponent::ALL
        .into_iter()
        .filter_map(|c| ComponentHash::digest(c, &format!("{c}-value")).map(|h| (c, h)))
        .collect()
}

pub fn sample_record() -> LicenseRecord {
    LicenseRecord {
        key: LicenseKey::parse("TG-STORE-0001").unwrap(),
        status: RecordStatus::Active,
        tier: "standard".into(),
        owner: Some("owner@example.com".into()),
        bound_fingerprint: Some(fingerprint()),
        match_threshold: 2,
        expires_at: None,
        transfer_count: 0,
        max_transfers: 3,
        manual_verification_count: 1,
        verification_reset_time: Some(t0()),
        last_online_check: Some(t0()),
        offline_grace_deadline: None,
        activated_at: t0(),
    }
}
