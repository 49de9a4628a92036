//! The license engine: the host's single entry point.
//!
//! All operations serialise on one lock around the cached record, the last
//! published state and the pending transfers, so a background tick can never
//! interleave with a foreground call. Store and log I/O run on the blocking
//! pool; registry calls are bounded by the configured network timeout.

use crate::callbacks::{HostCallbacks, NoopCallbacks};
use crate::clock::{Clock, SystemClock};
use crate::collector::{collect, host_label, FingerprintSource, SystemProbe};
use crate::config::EngineConfig;
use crate::error::{LicenseError, LicenseResult};
use crate::matcher::{match_fingerprints, MismatchKind};
use crate::outcome::ValidationOutcome;
use crate::recovery::find_recovery;
use crate::state::{new_record, BlockReason, LicenseState, StateMachine};
use crate::transfer::{PendingTransfer, TransferCoordinator, VerificationCapability};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tollgate_registry::{BindingUpdate, RegistryClient, RegistryError, RegistryResult};
use tollgate_storage::{AuditLog, LicenseStore};
use tollgate_types::{
    AuditKind, AuditLogEntry, HardwareFingerprint, LicenseKey, LicenseRecord, ReasonCode,
    RecordStatus, ValidationLogEntry, ValidationResultKind,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Startup,
    Manual,
    Background,
}

impl Trigger {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Manual => "manual",
            Self::Background => "background",
        }
    }
}

/// State guarded by the engine lock.
struct Session {
    record: Option<LicenseRecord>,
    published: LicenseState,
    transfers: TransferCoordinator,
}

struct Inner {
    config: EngineConfig,
    store: Arc<dyn LicenseStore>,
    registry: Arc<dyn RegistryClient>,
    log: AuditLog,
    source: Arc<dyn FingerprintSource>,
    clock: Arc<dyn Clock>,
    callbacks: Arc<dyn HostCallbacks>,
    verifier: Option<Arc<dyn VerificationCapability>>,
    session: Mutex<Session>,
    status_tx: watch::Sender<LicenseState>,
}

/// Builder for [`LicenseEngine`].
pub struct EngineBuilder {
    config: EngineConfig,
    store: Arc<dyn LicenseStore>,
    registry: Arc<dyn RegistryClient>,
    log: AuditLog,
    source: Arc<dyn FingerprintSource>,
    clock: Arc<dyn Clock>,
    callbacks: Arc<dyn HostCallbacks>,
    verifier: Option<Arc<dyn VerificationCapability>>,
}

impl EngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn fingerprint_source(mut self, source: Arc<dyn FingerprintSource>) -> Self {
        self.source = source;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn callbacks(mut self, callbacks: Arc<dyn HostCallbacks>) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn verifier(mut self, verifier: Arc<dyn VerificationCapability>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Validates the configuration and builds the engine.
    pub fn build(self) -> LicenseResult<LicenseEngine> {
        self.config.validate()?;
        let (status_tx, _) = watch::channel(LicenseState::Unactivated);
        Ok(LicenseEngine {
            inner: Arc::new(Inner {
                config: self.config,
                store: self.store,
                registry: self.registry,
                log: self.log,
                source: self.source,
                clock: self.clock,
                callbacks: self.callbacks,
                verifier: self.verifier,
                session: Mutex::new(Session {
                    record: None,
                    published: LicenseState::Unactivated,
                    transfers: TransferCoordinator::new(),
                }),
                status_tx,
            }),
        })
    }
}

/// License validation and hardware-binding engine.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct LicenseEngine {
    inner: Arc<Inner>,
}

impl LicenseEngine {
    /// Starts building an engine over the given collaborators.
    ///
    /// Defaults: [`EngineConfig::default`], the host's hardware, the system
    /// clock, no callbacks and no transfer verifier.
    pub fn builder(
        store: Arc<dyn LicenseStore>,
        registry: Arc<dyn RegistryClient>,
        log: AuditLog,
    ) -> EngineBuilder {
        EngineBuilder {
            config: EngineConfig::default(),
            store,
            registry,
            log,
            source: Arc::new(SystemProbe),
            clock: Arc::new(SystemClock),
            callbacks: Arc::new(NoopCallbacks),
            verifier: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.inner.log
    }

    /// Last published state.
    pub fn status(&self) -> LicenseState {
        self.inner.status_tx.borrow().clone()
    }

    /// Receives every published state change.
    pub fn subscribe(&self) -> watch::Receiver<LicenseState> {
        self.inner.status_tx.subscribe()
    }

    /// Record as of the last operation.
    pub async fn cached_record(&self) -> Option<LicenseRecord> {
        self.inner.session.lock().await.record.clone()
    }

    // ── Validation ──────────────────────────────────────────────

    /// Validates at application start.
    ///
    /// Always tries the registry first; falls back to the cached record and
    /// grace arithmetic only when the registry cannot be reached.
    pub async fn validate_startup(&self) -> ValidationOutcome {
        let mut session = self.inner.session.lock().await;
        self.run_pass(&mut session, Trigger::Startup).await
    }

    /// Same pass as [`validate_startup`](Self::validate_startup), run by the
    /// background validator.
    pub async fn validate_background(&self) -> ValidationOutcome {
        let mut session = self.inner.session.lock().await;
        self.run_pass(&mut session, Trigger::Background).await
    }

    /// Validates on user request, limited per UTC day.
    pub async fn validate_manual(&self) -> LicenseResult<ValidationOutcome> {
        let mut session = self.inner.session.lock().await;
        let now = self.inner.clock.now();
        let limit = self.inner.config.max_manual_verifications_per_day;

        // Without a readable record there is no budget to charge; the pass
        // below handles recovery.
        if let Ok(Some(mut record)) = self.load_record().await {
            roll_daily_counter(&mut record, now);
            if record.manual_verification_count >= limit {
                warn!(limit, "manual verification limit reached");
                self.log_validation(ValidationResultKind::Failure, ReasonCode::RateLimited, false, now)
                    .await;
                return Err(LicenseError::RateLimited { limit });
            }
            record.manual_verification_count += 1;
            self.save_record(&record).await?;
            self.audit(
                AuditKind::ManualVerification,
                format!(
                    "manual verification {} of {limit} today",
                    record.manual_verification_count
                ),
                now,
            )
            .await;
        }

        Ok(self.run_pass(&mut session, Trigger::Manual).await)
    }

    async fn run_pass(&self, session: &mut Session, trigger: Trigger) -> ValidationOutcome {
        let now = self.inner.clock.now();
        let local = self.fingerprint().await;

        let outcome = match self.load_record().await {
            Ok(Some(record)) => self.check_cached(session, record, &local, now).await,
            Ok(None) => self.recover(session, &local, now).await,
            Err(e) => {
                warn!(error = %e, "local license record unusable, treating as unactivated");
                let outcome = self.recover(session, &local, now).await;
                if outcome.state == LicenseState::Unactivated {
                    outcome.with_reason(ReasonCode::StoreError, "local license record is unreadable")
                } else {
                    outcome
                }
            }
        };

        self.log_outcome(&outcome, now).await;
        self.transition(session, &outcome);
        debug!(
            trigger = trigger.as_str(),
            decision = %outcome.decision,
            reason = %outcome.reason_code,
            online = outcome.online,
            "validation pass complete"
        );
        outcome
    }

    async fn check_cached(
        &self,
        session: &mut Session,
        mut record: LicenseRecord,
        local: &HardwareFingerprint,
        now: DateTime<Utc>,
    ) -> ValidationOutcome {
        let machine = StateMachine::new(&self.inner.config);
        let key = record.key.clone();
        let was_revoked = record.is_revoked();

        let response = self
            .registry_call(self.inner.registry.validate_one(&key))
            .await;
        let (state, online) = match response {
            Ok(row) => match row.snapshot() {
                Ok(snapshot) => (machine.apply_online(&mut record, &snapshot, local, now), true),
                Err(e) => {
                    warn!(key = %key.masked(), error = %e, "registry row is invalid");
                    let state =
                        machine.apply_answered_block(&mut record, BlockReason::InvalidRegistryRecord, now);
                    (state, true)
                }
            },
            Err(e) if e.is_not_found() => {
                warn!(key = %key.masked(), "license key not found in registry");
                let state = machine.apply_answered_block(&mut record, BlockReason::KeyNotFound, now);
                (state, true)
            }
            Err(e) if !e.is_connectivity() => {
                warn!(key = %key.masked(), error = %e, "registry row is invalid");
                let state =
                    machine.apply_answered_block(&mut record, BlockReason::InvalidRegistryRecord, now);
                (state, true)
            }
            Err(e) => {
                info!(error = %e, "registry unreachable, using cached license record");
                (machine.apply_offline(&mut record, local, now), false)
            }
        };

        if state == LicenseState::Revoked && !was_revoked {
            warn!(key = %key.masked(), "license revocation detected");
            self.audit(
                AuditKind::RevocationDetected,
                format!("registry reports {} revoked", key.masked()),
                now,
            )
            .await;
        }

        if let Err(e) = self.save_record(&record).await {
            warn!(error = %e, "failed to persist license record");
        }

        let outcome = ValidationOutcome::from_state(
            state,
            record.expires_at,
            now,
            self.inner.config.expiry_warning(),
            online,
        );
        session.record = Some(record);
        outcome
    }

    async fn recover(
        &self,
        session: &mut Session,
        local: &HardwareFingerprint,
        now: DateTime<Utc>,
    ) -> ValidationOutcome {
        session.record = None;
        let config = &self.inner.config;

        let rows = match self.registry_call(self.inner.registry.fetch_all()).await {
            Ok(rows) => rows,
            Err(e) => {
                info!(error = %e, "registry unreachable, auto-recovery not possible");
                return self.outcome(LicenseState::Unactivated, None, now, false);
            }
        };

        let scan = find_recovery(&rows, local, config.default_match_threshold);
        let Some(candidate) = scan.accepted else {
            info!(
                rows = rows.len(),
                examined = scan.examined,
                unbound = scan.unbound,
                invalid = scan.invalid,
                "no registry record matches this machine"
            );
            return self.outcome(LicenseState::Unactivated, None, now, true);
        };

        let binding = candidate
            .snapshot
            .bound_fingerprint
            .clone()
            .unwrap_or_else(|| local.clone());
        let record = new_record(&candidate.snapshot, binding, config, now);
        let state = StateMachine::new(config).evaluate(&record, local, now);

        if let Err(e) = self.save_record(&record).await {
            warn!(error = %e, "failed to persist recovered license record");
        }
        info!(
            key = %record.key.masked(),
            matched = candidate.report.matched,
            status = %record.status,
            "license restored by auto-recovery"
        );
        self.audit(
            AuditKind::AutoRecovery,
            format!(
                "restored {} with status {}: {}",
                record.key.masked(),
                record.status,
                candidate.report.summary()
            ),
            now,
        )
        .await;

        let outcome = self.outcome(state, record.expires_at, now, true);
        session.record = Some(record);
        outcome
    }

    // ── Activation and reset ────────────────────────────────────

    /// Activates this installation with a license key.
    ///
    /// Succeeds only if the registry reports the key active and unexpired and
    /// its hardware binding (if any) matches this machine. On failure the
    /// engine state is unchanged and the reason is logged.
    pub async fn activate(&self, key: &str) -> LicenseResult<ValidationOutcome> {
        let mut session = self.inner.session.lock().await;
        let now = self.inner.clock.now();

        match self.activate_locked(&mut session, key, now).await {
            Ok(outcome) => {
                self.log_outcome(&outcome, now).await;
                self.transition(&mut session, &outcome);
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "activation failed");
                let online = !matches!(&e, LicenseError::Registry(r) if r.is_connectivity());
                self.log_validation(ValidationResultKind::Failure, e.reason_code(), online, now)
                    .await;
                Err(e)
            }
        }
    }

    async fn activate_locked(
        &self,
        session: &mut Session,
        key: &str,
        now: DateTime<Utc>,
    ) -> LicenseResult<ValidationOutcome> {
        let config = &self.inner.config;
        let key = LicenseKey::parse(key)?;

        if let Ok(Some(existing)) = self.load_record().await {
            if existing.is_revoked() {
                return Err(LicenseError::Revoked);
            }
        }

        let row = self
            .registry_call(self.inner.registry.validate_one(&key))
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    LicenseError::ActivationRefused(ReasonCode::KeyNotFound)
                } else {
                    LicenseError::Registry(e)
                }
            })?;
        let snapshot = row
            .snapshot()
            .map_err(|_| LicenseError::ActivationRefused(ReasonCode::InvalidRegistryRecord))?;

        let refused = match snapshot.status {
            RecordStatus::Active => None,
            RecordStatus::Revoked => Some(ReasonCode::Revoked),
            RecordStatus::Expired => Some(ReasonCode::Expired),
            RecordStatus::Pending => Some(ReasonCode::Pending),
            RecordStatus::Suspended => Some(ReasonCode::Suspended),
        };
        if let Some(code) = refused {
            return Err(LicenseError::ActivationRefused(code));
        }
        if snapshot.expires_at.is_some_and(|at| at <= now) {
            return Err(LicenseError::ActivationRefused(ReasonCode::Expired));
        }

        let local = self.fingerprint().await;
        let threshold = snapshot
            .match_threshold
            .unwrap_or(config.default_match_threshold);
        let binding = match &snapshot.bound_fingerprint {
            Some(remote) => {
                let report = match_fingerprints(remote, &local, threshold);
                debug!(result = %report.summary(), "activation hardware check");
                if let Some(kind) = report.mismatch_kind() {
                    return Err(LicenseError::FingerprintMismatch(kind));
                }
                remote.clone()
            }
            None if config.require_remote_hardware_match => {
                return Err(LicenseError::FingerprintMismatch(MismatchKind::NoBinding));
            }
            None if local.len() < threshold => {
                return Err(LicenseError::FingerprintMismatch(MismatchKind::BelowThreshold {
                    matched: local.len(),
                    threshold,
                }));
            }
            None => local.clone(),
        };

        let record = new_record(&snapshot, binding, config, now);
        let state = StateMachine::new(config).evaluate(&record, &local, now);
        self.save_record(&record).await?;

        info!(key = %key.masked(), tier = %record.tier, "license activated");
        self.audit(
            AuditKind::Activation,
            format!("activated {} (tier {})", key.masked(), record.tier),
            now,
        )
        .await;

        let outcome = self.outcome(state, record.expires_at, now, true);
        session.record = Some(record);
        Ok(outcome)
    }

    /// Clears the local record. The only path that deletes it.
    pub async fn reset(&self) -> LicenseResult<()> {
        let mut session = self.inner.session.lock().await;
        let now = self.inner.clock.now();

        let store = Arc::clone(&self.inner.store);
        blocking(move || store.clear()).await??;
        session.record = None;
        session.transfers.clear();

        info!("local license record cleared");
        self.audit(AuditKind::Reset, "local license record cleared", now)
            .await;

        let outcome = self.outcome(LicenseState::Unactivated, None, now, false);
        self.transition(&mut session, &outcome);
        Ok(())
    }

    // ── Transfers ───────────────────────────────────────────────

    /// Opens a transfer of `key` to this machine.
    ///
    /// Uses the local record when it holds that key, otherwise the registry
    /// row. Fails without side effects once the transfer ceiling is reached.
    pub async fn request_transfer(&self, key: &str) -> LicenseResult<PendingTransfer> {
        let mut session = self.inner.session.lock().await;
        let now = self.inner.clock.now();

        let result = self.request_transfer_locked(&mut session, key, now).await;
        match &result {
            Ok(transfer) => {
                info!(
                    key = %transfer.key.masked(),
                    transfer = %transfer.id,
                    remaining_after = transfer.remaining_after(),
                    "transfer requested"
                );
                self.audit(
                    AuditKind::Transfer,
                    format!(
                        "transfer {} of {} requested from {}",
                        transfer.id,
                        transfer.key.masked(),
                        transfer.requested_by
                    ),
                    now,
                )
                .await;
            }
            Err(e) => {
                warn!(error = %e, "transfer request refused");
                self.audit(AuditKind::Transfer, format!("transfer refused: {e}"), now)
                    .await;
                let online = !matches!(e, LicenseError::Registry(r) if r.is_connectivity());
                self.log_validation(ValidationResultKind::Failure, e.reason_code(), online, now)
                    .await;
            }
        }
        result
    }

    async fn request_transfer_locked(
        &self,
        session: &mut Session,
        key: &str,
        now: DateTime<Utc>,
    ) -> LicenseResult<PendingTransfer> {
        let key = LicenseKey::parse(key)?;
        let basis = self.transfer_basis(&key, now).await?;
        let fingerprint = self.fingerprint().await;
        session
            .transfers
            .request(basis, fingerprint, host_label(), now)
    }

    /// The license as it stands now: the local record if it holds `key`,
    /// otherwise the registry row.
    async fn transfer_basis(
        &self,
        key: &LicenseKey,
        now: DateTime<Utc>,
    ) -> LicenseResult<LicenseRecord> {
        let local_record = match self.load_record().await {
            Ok(record) => record.filter(|r| r.key == *key),
            Err(e) => {
                warn!(error = %e, "local license record unusable, using registry row");
                None
            }
        };

        match local_record {
            Some(record) => Ok(record),
            None => {
                let row = self
                    .registry_call(self.inner.registry.validate_one(key))
                    .await?;
                let snapshot = row.snapshot()?;
                let binding = snapshot.bound_fingerprint.clone().unwrap_or_default();
                Ok(new_record(&snapshot, binding, &self.inner.config, now))
            }
        }
    }

    /// Runs verification for a pending transfer and, once confirmed, writes
    /// the new binding to the registry and rebinds locally.
    ///
    /// The engine lock is released while the verifier is awaited.
    pub async fn confirm_transfer(&self, id: Uuid) -> LicenseResult<ValidationOutcome> {
        let verifier = self
            .inner
            .verifier
            .clone()
            .ok_or(LicenseError::NoVerifier)?;
        let transfer = self.inner.session.lock().await.transfers.take(id)?;

        let verdict = verifier.request_confirmation(&transfer).await;

        let mut session = self.inner.session.lock().await;
        let now = self.inner.clock.now();

        if let Err(rejected) = verdict {
            warn!(transfer = %transfer.id, reason = %rejected.reason, "transfer rejected");
            self.audit(
                AuditKind::Transfer,
                format!("transfer {} rejected: {}", transfer.id, rejected.reason),
                now,
            )
            .await;
            self.log_validation(
                ValidationResultKind::Failure,
                ReasonCode::TransferRejected,
                true,
                now,
            )
            .await;
            return Err(LicenseError::TransferRejected(rejected.reason));
        }

        // The license may have been revoked or transferred elsewhere while
        // the verifier was waiting.
        let current = match self.transfer_basis(&transfer.key, now).await {
            Ok(current) => current,
            Err(e) => {
                warn!(transfer = %transfer.id, error = %e, "could not re-read license, transfer kept pending");
                session.transfers.restore(transfer);
                return Err(e);
            }
        };
        if let Err(e) = TransferCoordinator::admit(&current) {
            warn!(transfer = %transfer.id, error = %e, "transfer no longer allowed");
            self.audit(
                AuditKind::Transfer,
                format!("transfer {} refused at confirmation: {e}", transfer.id),
                now,
            )
            .await;
            self.log_validation(ValidationResultKind::Failure, e.reason_code(), true, now)
                .await;
            return Err(e);
        }

        let update = BindingUpdate {
            key: transfer.key.clone(),
            fingerprint: transfer.new_fingerprint.clone(),
            transfer_count: current.transfer_count + 1,
        };
        if let Err(e) = self
            .registry_call(self.inner.registry.update_binding(&update))
            .await
        {
            warn!(transfer = %transfer.id, error = %e, "registry write-back failed, transfer kept pending");
            session.transfers.restore(transfer);
            return Err(e.into());
        }

        let record = TransferCoordinator::rebound(current, &transfer, now);
        self.save_record(&record).await?;
        info!(
            key = %record.key.masked(),
            used = record.transfer_count,
            max = record.max_transfers,
            "license transferred to this machine"
        );
        self.audit(
            AuditKind::Transfer,
            format!(
                "transfer {} of {} completed to {} ({} of {} used)",
                transfer.id,
                record.key.masked(),
                transfer.requested_by,
                record.transfer_count,
                record.max_transfers
            ),
            now,
        )
        .await;

        let local = self.fingerprint().await;
        let state = StateMachine::new(&self.inner.config).evaluate(&record, &local, now);
        let outcome = self.outcome(state, record.expires_at, now, true);
        session.record = Some(record);
        self.log_outcome(&outcome, now).await;
        self.transition(&mut session, &outcome);
        Ok(outcome)
    }

    // ── Helpers ─────────────────────────────────────────────────

    fn outcome(
        &self,
        state: LicenseState,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        online: bool,
    ) -> ValidationOutcome {
        ValidationOutcome::from_state(
            state,
            expires_at,
            now,
            self.inner.config.expiry_warning(),
            online,
        )
    }

    /// Publishes a state change and notifies the host.
    fn transition(&self, session: &mut Session, outcome: &ValidationOutcome) {
        if session.published == outcome.state {
            return;
        }
        info!(from = %session.published, to = %outcome.state, "license state changed");

        let callbacks = &self.inner.callbacks;
        match &outcome.state {
            LicenseState::Revoked => callbacks.on_revoked(),
            state if state.is_blocking() => {
                callbacks.on_blocked(outcome.reason_code, &outcome.reason)
            }
            _ => {}
        }
        callbacks.on_status_changed(&outcome.state);

        session.published = outcome.state.clone();
        self.inner.status_tx.send_replace(outcome.state.clone());
    }

    async fn registry_call<T>(
        &self,
        call: impl Future<Output = RegistryResult<T>>,
    ) -> RegistryResult<T> {
        match tokio::time::timeout(self.inner.config.network_timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(RegistryError::Timeout),
        }
    }

    async fn fingerprint(&self) -> HardwareFingerprint {
        let source = Arc::clone(&self.inner.source);
        blocking(move || collect(source.as_ref()))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "hardware probe failed");
                HardwareFingerprint::new()
            })
    }

    async fn load_record(&self) -> LicenseResult<Option<LicenseRecord>> {
        let store = Arc::clone(&self.inner.store);
        Ok(blocking(move || store.load()).await??)
    }

    async fn save_record(&self, record: &LicenseRecord) -> LicenseResult<()> {
        let store = Arc::clone(&self.inner.store);
        let record = record.clone();
        Ok(blocking(move || store.save(&record)).await??)
    }

    async fn log_outcome(&self, outcome: &ValidationOutcome, now: DateTime<Utc>) {
        self.log_validation(outcome.result_kind(), outcome.reason_code, outcome.online, now)
            .await;
    }

    async fn log_validation(
        &self,
        result: ValidationResultKind,
        reason: ReasonCode,
        online: bool,
        now: DateTime<Utc>,
    ) {
        let entry = ValidationLogEntry {
            timestamp: now,
            result,
            reason,
            online,
        };
        let log = self.inner.log.clone();
        match blocking(move || log.append_validation(&entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "failed to append validation log"),
            Err(e) => warn!(error = %e, "failed to append validation log"),
        }
    }

    async fn audit(&self, kind: AuditKind, detail: impl Into<String>, now: DateTime<Utc>) {
        let entry = AuditLogEntry::new(now, kind, detail);
        let log = self.inner.log.clone();
        match blocking(move || log.append_audit(&entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, kind = %kind, "failed to append audit log"),
            Err(e) => warn!(error = %e, kind = %kind, "failed to append audit log"),
        }
    }
}

async fn blocking<T, F>(f: F) -> LicenseResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| LicenseError::Task(e.to_string()))
}

/// Starts a new daily budget once the reset time has passed.
fn roll_daily_counter(record: &mut LicenseRecord, now: DateTime<Utc>) {
    match record.verification_reset_time {
        Some(reset) if now < reset => {}
        _ => {
            record.manual_verification_count = 0;
            record.verification_reset_time = Some(next_utc_midnight(now));
        }
    }
}

fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now + chrono::Duration::days(1))
}
