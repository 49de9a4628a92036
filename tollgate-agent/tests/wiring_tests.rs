use chrono::{TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;
use tollgate_agent::console::{is_yes, render_audit, render_outcome, render_validation};
use tollgate_agent::{build_engine, AgentConfig, ConsoleVerifier, StorageConfig};
use tollgate_license::{Decision, LicenseError, LicenseState, ValidationOutcome};
use tollgate_registry::RegistryConfig;
use tollgate_types::{
    AuditKind, AuditLogEntry, ReasonCode, ValidationLogEntry, ValidationResultKind,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(base_url: String, data_dir: &std::path::Path) -> AgentConfig {
    AgentConfig {
        registry: RegistryConfig {
            base_url,
            api_token: None,
            timeout_secs: 2,
        },
        storage: StorageConfig {
            data_dir: Some(data_dir.to_path_buf()),
        },
        ..Default::default()
    }
}

// ── Engine wiring ───────────────────────────────────────────────

#[tokio::test]
async fn unreachable_registry_leaves_agent_unactivated() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for("http://127.0.0.1:1".to_string(), &dir.path().join("data"));
    let engine = build_engine(&config, Arc::new(ConsoleVerifier::new(true))).unwrap();

    let outcome = engine.validate_startup().await;
    assert_eq!(outcome.state, LicenseState::Unactivated);
    assert!(!outcome.online);
    assert!(config.storage.log_path().exists());
    assert!(!config.storage.record_path().exists());
    assert_eq!(engine.audit_log().validation_count().unwrap(), 1);
}

#[tokio::test]
async fn empty_registry_answers_online() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/licenses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let engine = build_engine(
        &config_for(server.uri(), dir.path()),
        Arc::new(ConsoleVerifier::new(true)),
    )
    .unwrap();

    let outcome = engine.validate_startup().await;
    assert_eq!(outcome.state, LicenseState::Unactivated);
    assert!(outcome.online);
}

#[tokio::test]
async fn unknown_key_is_refused_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/licenses/TG-UNKNOWN-0000"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let engine = build_engine(
        &config_for(server.uri(), dir.path()),
        Arc::new(ConsoleVerifier::new(true)),
    )
    .unwrap();

    let err = engine.activate("TG-UNKNOWN-0000").await.unwrap_err();
    assert!(matches!(
        err,
        LicenseError::ActivationRefused(ReasonCode::KeyNotFound)
    ));
}

#[tokio::test]
async fn reset_is_audited_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for("http://127.0.0.1:1".to_string(), dir.path());
    let engine = build_engine(&config, Arc::new(ConsoleVerifier::new(true))).unwrap();
    engine.reset().await.unwrap();
    drop(engine);

    let reopened = build_engine(&config, Arc::new(ConsoleVerifier::new(true))).unwrap();
    let audits = reopened.audit_log().audit_of_kind(AuditKind::Reset).unwrap();
    assert_eq!(audits.len(), 1);
}

// ── Console ─────────────────────────────────────────────────────

#[test]
fn yes_answers() {
    for answer in ["y", "Y\n", " yes ", "YES\r\n"] {
        assert!(is_yes(answer), "{answer:?}");
    }
    for answer in ["", "n", "no", "yep", "\n"] {
        assert!(!is_yes(answer), "{answer:?}");
    }
}

#[test]
fn outcome_rendering() {
    let now = Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap();
    let outcome = ValidationOutcome::from_state(
        LicenseState::Active,
        Some(Utc.with_ymd_and_hms(2026, 5, 6, 9, 30, 0).unwrap()),
        now,
        chrono::Duration::days(7),
        true,
    );
    assert_eq!(outcome.decision, Decision::ProceedWithWarning);

    let text = render_outcome(&outcome);
    assert!(text.contains("status   active"));
    assert!(text.contains("license expires in 2 days (expiring_soon)"));
    assert!(text.contains("registry online"));
    assert!(text.contains("expires  2026-05-06 09:30 UTC"));
    assert!(text.ends_with("decision proceed-with-warning"));
}

#[test]
fn log_rendering() {
    let at = Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap();
    let validation = render_validation(&ValidationLogEntry {
        timestamp: at,
        result: ValidationResultKind::Blocked,
        reason: ReasonCode::GraceExpired,
        online: false,
    });
    assert!(validation.starts_with("2026-05-04 09:30:00  blocked"));
    assert!(validation.contains("grace_expired"));
    assert!(validation.ends_with("offline"));

    let audit = render_audit(&AuditLogEntry::new(at, AuditKind::Reset, "local license record cleared"));
    assert!(audit.contains("reset"));
    assert!(audit.ends_with("local license record cleared"));
}
