mod common;

use chrono::Duration;
use common::{
    active_row, bound_record, fingerprint_of, machine_a, machine_b, t0, Harness, ScriptedVerifier,
    KEY,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tollgate_license::{
    host_label, Decision, EngineConfig, LicenseEngine, LicenseError, LicenseState,
    TransferCoordinator,
};
use tollgate_registry::MemoryRegistry;
use tollgate_storage::{AuditLog, MemoryLicenseStore};
use tollgate_types::{AuditKind, RecordStatus};
use uuid::Uuid;

// ── Coordinator ─────────────────────────────────────────────────

#[test]
fn coordinator_opens_pending_transfer() {
    let mut transfers = TransferCoordinator::new();
    let transfer = transfers
        .request(bound_record(&machine_a()), fingerprint_of(&machine_b()), "laptop".into(), t0())
        .unwrap();

    assert_eq!(transfer.transfer_count, 0);
    assert_eq!(transfer.max_transfers, 3);
    assert_eq!(transfer.remaining_after(), 2);
    assert_eq!(transfer.requested_by, "laptop");
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers.get(transfer.id), Some(&transfer));
}

#[test]
fn coordinator_refuses_at_limit() {
    let mut transfers = TransferCoordinator::new();
    let mut record = bound_record(&machine_a());
    record.transfer_count = 3;

    let err = transfers
        .request(record, fingerprint_of(&machine_b()), "laptop".into(), t0())
        .unwrap_err();
    assert!(matches!(
        err,
        LicenseError::TransferLimitExceeded { used: 3, max: 3 }
    ));
    assert!(transfers.is_empty());
}

#[test]
fn coordinator_refuses_revoked() {
    let mut transfers = TransferCoordinator::new();
    let mut record = bound_record(&machine_a());
    record.status = RecordStatus::Revoked;

    let err = transfers
        .request(record, fingerprint_of(&machine_b()), "laptop".into(), t0())
        .unwrap_err();
    assert!(matches!(err, LicenseError::Revoked));
}

#[test]
fn coordinator_keeps_one_transfer_per_key() {
    let mut transfers = TransferCoordinator::new();
    let first = transfers
        .request(bound_record(&machine_a()), fingerprint_of(&machine_b()), "one".into(), t0())
        .unwrap();
    let second = transfers
        .request(bound_record(&machine_a()), fingerprint_of(&machine_b()), "two".into(), t0())
        .unwrap();

    assert_eq!(transfers.len(), 1);
    assert!(transfers.get(first.id).is_none());
    assert!(transfers.get(second.id).is_some());
}

#[test]
fn coordinator_take_and_restore() {
    let mut transfers = TransferCoordinator::new();
    let transfer = transfers
        .request(bound_record(&machine_a()), fingerprint_of(&machine_b()), "laptop".into(), t0())
        .unwrap();

    let taken = transfers.take(transfer.id).unwrap();
    assert!(transfers.is_empty());
    assert!(matches!(
        transfers.take(transfer.id),
        Err(LicenseError::UnknownTransfer(id)) if id == transfer.id
    ));

    transfers.restore(taken);
    assert_eq!(transfers.len(), 1);
}

#[test]
fn rebound_moves_binding_and_counts_from_current_record() {
    let mut transfers = TransferCoordinator::new();
    let transfer = transfers
        .request(bound_record(&machine_a()), fingerprint_of(&machine_b()), "laptop".into(), t0())
        .unwrap();

    // Another transfer completed elsewhere after the request was opened.
    let mut current = bound_record(&machine_a());
    current.transfer_count = 1;
    current.manual_verification_count = 4;
    current.offline_grace_deadline = Some(t0() + Duration::days(7));

    let now = t0() + Duration::hours(1);
    let record = TransferCoordinator::rebound(current, &transfer, now);
    assert_eq!(record.bound_fingerprint, Some(fingerprint_of(&machine_b())));
    assert_eq!(record.transfer_count, 2);
    assert_eq!(record.manual_verification_count, 4);
    assert_eq!(record.last_online_check, Some(now));
    assert_eq!(record.offline_grace_deadline, None);
    assert_eq!(record.activated_at, t0());
}

#[test]
fn admit_checks_revocation_and_ceiling() {
    let mut record = bound_record(&machine_a());
    assert!(TransferCoordinator::admit(&record).is_ok());

    record.transfer_count = 3;
    assert!(matches!(
        TransferCoordinator::admit(&record),
        Err(LicenseError::TransferLimitExceeded { used: 3, max: 3 })
    ));

    record.transfer_count = 0;
    record.status = RecordStatus::Revoked;
    assert!(matches!(
        TransferCoordinator::admit(&record),
        Err(LicenseError::Revoked)
    ));
}

// ── Engine ──────────────────────────────────────────────────────

/// Engine on machine B for a license bound to machine A.
fn new_machine() -> Harness {
    Harness::new(machine_b(), vec![active_row(KEY, &machine_a())])
}

#[tokio::test]
async fn transfer_to_new_machine() {
    let harness = new_machine();

    let transfer = harness.engine.request_transfer(KEY).await.unwrap();
    assert_eq!(transfer.key.as_str(), KEY);
    assert_eq!(transfer.new_fingerprint, fingerprint_of(&machine_b()));
    assert_eq!(transfer.requested_by, host_label());
    assert_eq!(transfer.remaining_after(), 2);
    assert!(harness.store.load().unwrap().is_none());

    let outcome = harness.engine.confirm_transfer(transfer.id).await.unwrap();
    assert_eq!(outcome.decision, Decision::Proceed);
    assert_eq!(outcome.state, LicenseState::Active);
    assert_eq!(harness.verifier.calls(), 1);

    let record = harness.store.load().unwrap().unwrap();
    assert_eq!(record.bound_fingerprint, Some(fingerprint_of(&machine_b())));
    assert_eq!(record.transfer_count, 1);

    let updates = harness.registry.binding_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].fingerprint, fingerprint_of(&machine_b()));
    assert_eq!(updates[0].transfer_count, 1);

    let remote = harness.registry.row(KEY).unwrap().snapshot().unwrap();
    assert_eq!(remote.bound_fingerprint, Some(fingerprint_of(&machine_b())));
    assert_eq!(remote.transfer_count, 1);

    assert_eq!(harness.log.audit_of_kind(AuditKind::Transfer).unwrap().len(), 2);
    assert_eq!(harness.engine.status(), LicenseState::Active);
}

#[tokio::test]
async fn old_machine_loses_license_after_transfer() {
    let harness = new_machine();
    let transfer = harness.engine.request_transfer(KEY).await.unwrap();
    harness.engine.confirm_transfer(transfer.id).await.unwrap();

    // Machine A still has its old record cached; the registry now disagrees.
    let old = Harness::new(machine_a(), vec![]);
    old.store.save(&bound_record(&machine_a())).unwrap();
    old.registry.upsert(harness.registry.row(KEY).unwrap());

    let outcome = old.engine.validate_startup().await;
    assert!(outcome.is_blocked());
    assert!(matches!(outcome.state, LicenseState::Blocked { .. }));
}

#[tokio::test]
async fn transfer_uses_local_record_when_present() {
    let harness = Harness::new(machine_a(), vec![active_row(KEY, &machine_a())]);
    harness.engine.activate(KEY).await.unwrap();
    let validations = harness.registry.validate_calls();

    let transfer = harness.engine.request_transfer(KEY).await.unwrap();
    assert_eq!(transfer.transfer_count, 0);
    assert_eq!(harness.registry.validate_calls(), validations);
}

#[tokio::test]
async fn transfer_limit_leaves_everything_unchanged() {
    let mut row = active_row(KEY, &machine_a());
    row.transfer_count = Some(3);
    let harness = Harness::new(machine_a(), vec![row]);
    harness.engine.activate(KEY).await.unwrap();
    let before = harness.store.load().unwrap();

    let err = harness.engine.request_transfer(KEY).await.unwrap_err();
    assert!(matches!(
        err,
        LicenseError::TransferLimitExceeded { used: 3, max: 3 }
    ));
    assert_eq!(harness.store.load().unwrap(), before);
    assert_eq!(harness.registry.update_calls(), 0);
    assert_eq!(harness.engine.status(), LicenseState::Active);

    let audits = harness.log.audit_of_kind(AuditKind::Transfer).unwrap();
    assert_eq!(audits.len(), 1);
    assert!(audits[0].detail.contains("transfer refused"));
}

#[tokio::test]
async fn rejected_transfer_changes_nothing() {
    let harness = Harness::build(
        machine_b(),
        Arc::new(MemoryRegistry::with_rows(vec![active_row(KEY, &machine_a())])),
        Arc::new(MemoryLicenseStore::new()),
        EngineConfig::default(),
        Arc::new(ScriptedVerifier::rejecting()),
    );

    let transfer = harness.engine.request_transfer(KEY).await.unwrap();
    let err = harness.engine.confirm_transfer(transfer.id).await.unwrap_err();
    assert!(matches!(err, LicenseError::TransferRejected(ref reason) if reason == "owner declined"));
    assert!(harness.store.load().unwrap().is_none());
    assert_eq!(harness.registry.update_calls(), 0);

    let err = harness.engine.confirm_transfer(transfer.id).await.unwrap_err();
    assert!(matches!(err, LicenseError::UnknownTransfer(_)));
}

#[tokio::test]
async fn failed_write_back_keeps_transfer_pending() {
    let harness = new_machine();
    let transfer = harness.engine.request_transfer(KEY).await.unwrap();

    harness.registry.set_reject_updates(true);
    let err = harness.engine.confirm_transfer(transfer.id).await.unwrap_err();
    assert!(matches!(err, LicenseError::Registry(_)));
    assert!(harness.store.load().unwrap().is_none());

    harness.registry.set_reject_updates(false);
    harness.engine.confirm_transfer(transfer.id).await.unwrap();
    assert_eq!(harness.verifier.calls(), 2);
    assert_eq!(
        harness.store.load().unwrap().unwrap().bound_fingerprint,
        Some(fingerprint_of(&machine_b()))
    );
}

#[tokio::test]
async fn confirm_without_verifier_fails() {
    let engine = LicenseEngine::builder(
        Arc::new(MemoryLicenseStore::new()),
        Arc::new(MemoryRegistry::with_rows(vec![active_row(KEY, &machine_a())])),
        AuditLog::open_in_memory().unwrap(),
    )
    .fingerprint_source(Arc::new(machine_b()))
    .build()
    .unwrap();

    let transfer = engine.request_transfer(KEY).await.unwrap();
    let err = engine.confirm_transfer(transfer.id).await.unwrap_err();
    assert!(matches!(err, LicenseError::NoVerifier));
}

#[tokio::test]
async fn confirm_unknown_transfer_fails() {
    let harness = new_machine();
    let err = harness.engine.confirm_transfer(Uuid::now_v7()).await.unwrap_err();
    assert!(matches!(err, LicenseError::UnknownTransfer(_)));
    assert_eq!(harness.verifier.calls(), 0);
}

#[tokio::test]
async fn transfer_of_unknown_key_fails() {
    let harness = new_machine();
    let err = harness
        .engine
        .request_transfer("TG-2026-NOPE-9999")
        .await
        .unwrap_err();
    assert!(matches!(err, LicenseError::Registry(ref e) if e.is_not_found()));
}

#[tokio::test]
async fn reset_drops_pending_transfers() {
    let harness = new_machine();
    let transfer = harness.engine.request_transfer(KEY).await.unwrap();

    harness.engine.reset().await.unwrap();
    let err = harness.engine.confirm_transfer(transfer.id).await.unwrap_err();
    assert!(matches!(err, LicenseError::UnknownTransfer(_)));
}

// ── Changes while verification is pending ───────────────────────

#[tokio::test]
async fn revocation_seen_before_confirmation_is_kept() {
    let harness = Harness::new(machine_a(), vec![active_row(KEY, &machine_a())]);
    harness.engine.activate(KEY).await.unwrap();
    let transfer = harness.engine.request_transfer(KEY).await.unwrap();

    harness.registry.set_status(KEY, "revoked");
    let outcome = harness.engine.validate_startup().await;
    assert_eq!(outcome.state, LicenseState::Revoked);

    let err = harness.engine.confirm_transfer(transfer.id).await.unwrap_err();
    assert!(matches!(err, LicenseError::Revoked));
    assert_eq!(harness.verifier.calls(), 1);
    assert_eq!(harness.registry.update_calls(), 0);
    assert_eq!(
        harness.store.load().unwrap().unwrap().status,
        RecordStatus::Revoked
    );
    assert_eq!(harness.engine.status(), LicenseState::Revoked);

    let audits = harness.log.audit_of_kind(AuditKind::Transfer).unwrap();
    assert!(audits.last().unwrap().detail.contains("refused at confirmation"));

    // The refused transfer is gone, and going offline does not bring the
    // license back.
    let err = harness.engine.confirm_transfer(transfer.id).await.unwrap_err();
    assert!(matches!(err, LicenseError::UnknownTransfer(_)));
    harness.registry.set_offline(true);
    let outcome = harness.engine.validate_startup().await;
    assert_eq!(outcome.state, LicenseState::Revoked);
    assert!(outcome.is_blocked());
}

#[tokio::test]
async fn confirmation_counts_from_refreshed_record() {
    let harness = Harness::new(machine_a(), vec![active_row(KEY, &machine_a())]);
    harness.engine.activate(KEY).await.unwrap();
    let transfer = harness.engine.request_transfer(KEY).await.unwrap();
    assert_eq!(transfer.transfer_count, 0);

    let mut row = active_row(KEY, &machine_a());
    row.transfer_count = Some(1);
    harness.registry.upsert(row);
    harness.engine.validate_startup().await;
    assert_eq!(harness.store.load().unwrap().unwrap().transfer_count, 1);

    harness.engine.confirm_transfer(transfer.id).await.unwrap();
    let updates = harness.registry.binding_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].transfer_count, 2);
    assert_eq!(harness.store.load().unwrap().unwrap().transfer_count, 2);
}

#[tokio::test]
async fn limit_reached_before_confirmation_refuses() {
    let harness = new_machine();
    let transfer = harness.engine.request_transfer(KEY).await.unwrap();

    let mut row = active_row(KEY, &machine_a());
    row.transfer_count = Some(3);
    harness.registry.upsert(row);

    let err = harness.engine.confirm_transfer(transfer.id).await.unwrap_err();
    assert!(matches!(
        err,
        LicenseError::TransferLimitExceeded { used: 3, max: 3 }
    ));
    assert_eq!(harness.registry.update_calls(), 0);
    assert!(harness.store.load().unwrap().is_none());
    assert_eq!(
        harness.registry.row(KEY).unwrap().snapshot().unwrap().bound_fingerprint,
        Some(fingerprint_of(&machine_a()))
    );
}

#[tokio::test]
async fn unreachable_registry_at_confirmation_keeps_transfer_pending() {
    let harness = new_machine();
    let transfer = harness.engine.request_transfer(KEY).await.unwrap();

    harness.registry.set_offline(true);
    let err = harness.engine.confirm_transfer(transfer.id).await.unwrap_err();
    assert!(matches!(err, LicenseError::Registry(ref e) if e.is_connectivity()));

    harness.registry.set_offline(false);
    let outcome = harness.engine.confirm_transfer(transfer.id).await.unwrap();
    assert_eq!(outcome.state, LicenseState::Active);
}
