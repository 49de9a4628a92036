//! Shared test helpers for license tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tollgate_license::{
    collect, Clock, Confirmed, EngineConfig, HostCallbacks, LicenseEngine, LicenseState,
    ManualClock, PendingTransfer, Rejected, StaticProbe, VerificationCapability,
};
use tollgate_registry::{MemoryRegistry, RemoteLicenseRow};
use tollgate_storage::{AuditLog, LicenseStore, MemoryLicenseStore};
use tollgate_types::{
    HardwareComponent, HardwareFingerprint, LicenseKey, LicenseRecord, ReasonCode, RecordStatus,
};

pub const KEY: &str = "TG-2026-ALPHA-0001";

/// Fixed instant used across license tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap()
}

// ── Machines ────────────────────────────────────────────────────

pub fn machine_a() -> StaticProbe {
    StaticProbe::new()
        .with(HardwareComponent::NetworkAdapter, "aa:bb:cc:00:00:01")
        .with(HardwareComponent::Processor, "GenuineIntel 11th Gen Intel(R) Core(TM) i7-1185G7")
        .with(HardwareComponent::SystemBoard, "BOARD-A-0001")
}

pub fn machine_b() -> StaticProbe {
    StaticProbe::new()
        .with(HardwareComponent::NetworkAdapter, "aa:bb:cc:00:00:02")
        .with(HardwareComponent::Processor, "AuthenticAMD Ryzen 7 7840U")
        .with(HardwareComponent::SystemBoard, "BOARD-B-0002")
}

pub fn fingerprint_of(probe: &StaticProbe) -> HardwareFingerprint {
    collect(probe)
}

/// Active row bound to `probe`, threshold 2, three transfers allowed.
pub fn active_row(key: &str, probe: &StaticProbe) -> RemoteLicenseRow {
    let mut row = RemoteLicenseRow::new(key, "active").with_fingerprint(&fingerprint_of(probe));
    row.tier = Some("pro".to_string());
    row.match_threshold = Some(2);
    row.max_transfers = Some(3);
    row.transfer_count = Some(0);
    row
}

/// Active record for `KEY` bound to `probe`, as activation at `t0` leaves it.
pub fn bound_record(probe: &StaticProbe) -> LicenseRecord {
    LicenseRecord {
        key: LicenseKey::parse(KEY).unwrap(),
        status: RecordStatus::Active,
        tier: "pro".into(),
        owner: None,
        bound_fingerprint: Some(fingerprint_of(probe)),
        match_threshold: 2,
        expires_at: None,
        transfer_count: 0,
        max_transfers: 3,
        manual_verification_count: 0,
        verification_reset_time: None,
        last_online_check: Some(t0()),
        offline_grace_deadline: None,
        activated_at: t0(),
    }
}

// ── Callbacks ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Blocked(ReasonCode),
    Revoked,
    StatusChanged(LicenseState),
}

#[derive(Default)]
pub struct RecordingCallbacks {
    events: Mutex<Vec<Event>>,
}

impl RecordingCallbacks {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn revoked_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == Event::Revoked)
            .count()
    }
}

impl HostCallbacks for RecordingCallbacks {
    fn on_blocked(&self, reason: ReasonCode, _message: &str) {
        self.events.lock().unwrap().push(Event::Blocked(reason));
    }

    fn on_revoked(&self) {
        self.events.lock().unwrap().push(Event::Revoked);
    }

    fn on_status_changed(&self, status: &LicenseState) {
        self.events
            .lock()
            .unwrap()
            .push(Event::StatusChanged(status.clone()));
    }
}

// ── Verifier ────────────────────────────────────────────────────

pub struct ScriptedVerifier {
    approve: bool,
    calls: AtomicUsize,
}

impl ScriptedVerifier {
    pub fn approving() -> Self {
        Self {
            approve: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            approve: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationCapability for ScriptedVerifier {
    async fn request_confirmation(&self, _transfer: &PendingTransfer) -> Result<Confirmed, Rejected> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.approve {
            Ok(Confirmed)
        } else {
            Err(Rejected::new("owner declined"))
        }
    }
}

// ── Harness ─────────────────────────────────────────────────────

pub struct Harness {
    pub engine: LicenseEngine,
    pub store: Arc<dyn LicenseStore>,
    pub registry: Arc<MemoryRegistry>,
    pub clock: Arc<ManualClock>,
    pub callbacks: Arc<RecordingCallbacks>,
    pub verifier: Arc<ScriptedVerifier>,
    pub log: AuditLog,
}

impl Harness {
    /// Engine on `probe` against a registry holding `rows`, with an empty
    /// in-memory store.
    pub fn new(probe: StaticProbe, rows: Vec<RemoteLicenseRow>) -> Self {
        Self::build(
            probe,
            Arc::new(MemoryRegistry::with_rows(rows)),
            Arc::new(MemoryLicenseStore::new()),
            EngineConfig::default(),
            Arc::new(ScriptedVerifier::approving()),
        )
    }

    pub fn build(
        probe: StaticProbe,
        registry: Arc<MemoryRegistry>,
        store: Arc<dyn LicenseStore>,
        config: EngineConfig,
        verifier: Arc<ScriptedVerifier>,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let callbacks = Arc::new(RecordingCallbacks::default());
        let log = AuditLog::open_in_memory().unwrap();

        let engine = LicenseEngine::builder(store.clone(), registry.clone(), log.clone())
            .config(config)
            .fingerprint_source(Arc::new(probe))
            .clock(clock.clone())
            .callbacks(callbacks.clone())
            .verifier(verifier.clone())
            .build()
            .unwrap();

        Self {
            engine,
            store,
            registry,
            clock,
            callbacks,
            verifier,
            log,
        }
    }

    /// Same store, registry and clock, seen from a different machine.
    pub fn on_machine(&self, probe: StaticProbe) -> LicenseEngine {
        LicenseEngine::builder(self.store.clone(), self.registry.clone(), self.log.clone())
            .fingerprint_source(Arc::new(probe))
            .clock(self.clock.clone())
            .callbacks(self.callbacks.clone())
            .verifier(self.verifier.clone())
            .build()
            .unwrap()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
