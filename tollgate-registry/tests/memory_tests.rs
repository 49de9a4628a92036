use std::time::Duration;
use tollgate_registry::{BindingUpdate, MemoryRegistry, RegistryClient, RemoteLicenseRow};
use tollgate_types::{ComponentHash, HardwareComponent, HardwareFingerprint, LicenseKey};

fn key(s: &str) -> LicenseKey {
    LicenseKey::parse(s).unwrap()
}

#[tokio::test]
async fn validate_one_finds_rows_by_key() {
    let registry = MemoryRegistry::with_rows([
        RemoteLicenseRow::new("TG-1", "active"),
        RemoteLicenseRow::new("TG-2", "suspended"),
    ]);

    let row = registry.validate_one(&key("TG-2")).await.unwrap();
    assert_eq!(row.status.as_deref(), Some("suspended"));
    assert_eq!(registry.validate_calls(), 1);

    let err = registry.validate_one(&key("TG-3")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn offline_registry_is_unreachable() {
    let registry = MemoryRegistry::with_rows([RemoteLicenseRow::new("TG-1", "active")]);
    registry.set_offline(true);

    assert!(registry.fetch_all().await.unwrap_err().is_connectivity());
    assert!(registry.validate_one(&key("TG-1")).await.unwrap_err().is_connectivity());

    registry.set_offline(false);
    assert_eq!(registry.fetch_all().await.unwrap().len(), 1);
    assert_eq!(registry.fetch_calls(), 2);
}

#[tokio::test]
async fn set_status_changes_row() {
    let registry = MemoryRegistry::with_rows([RemoteLicenseRow::new("TG-1", "active")]);
    assert!(registry.set_status("TG-1", "revoked"));
    assert!(!registry.set_status("TG-9", "revoked"));

    let row = registry.validate_one(&key("TG-1")).await.unwrap();
    assert_eq!(row.status.as_deref(), Some("revoked"));
}

#[tokio::test]
async fn update_binding_rewrites_hardware_columns() {
    let registry = MemoryRegistry::with_rows([
        RemoteLicenseRow::new("TG-1", "active").with_column("cpu", "old processor"),
    ]);
    let hash = ComponentHash::digest(HardwareComponent::Processor, "new processor").unwrap();
    let update = BindingUpdate {
        key: key("TG-1"),
        fingerprint: HardwareFingerprint::new().with(HardwareComponent::Processor, hash.clone()),
        transfer_count: 1,
    };

    registry.update_binding(&update).await.unwrap();

    let row = registry.row("TG-1").unwrap();
    assert_eq!(row.transfer_count, Some(1));
    assert_eq!(
        row.map_hardware().fingerprint.get(HardwareComponent::Processor),
        Some(&hash)
    );
    assert_eq!(registry.binding_updates(), vec![update]);
}

#[tokio::test]
async fn rejected_updates_leave_row_unchanged() {
    let registry = MemoryRegistry::with_rows([RemoteLicenseRow::new("TG-1", "active")]);
    registry.set_reject_updates(true);

    let result = registry
        .update_binding(&BindingUpdate {
            key: key("TG-1"),
            fingerprint: HardwareFingerprint::new(),
            transfer_count: 1,
        })
        .await;

    assert!(result.is_err());
    assert_eq!(registry.row("TG-1").unwrap().transfer_count, None);
    assert!(registry.binding_updates().is_empty());
    assert_eq!(registry.update_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn latency_delays_calls() {
    let registry = MemoryRegistry::with_rows([RemoteLicenseRow::new("TG-1", "active")]);
    registry.set_latency(Some(Duration::from_secs(30)));

    let timed_out = tokio::time::timeout(
        Duration::from_secs(10),
        registry.validate_one(&key("TG-1")),
    )
    .await;
    assert!(timed_out.is_err());

    let completed = tokio::time::timeout(
        Duration::from_secs(60),
        registry.validate_one(&key("TG-1")),
    )
    .await;
    assert!(completed.unwrap().is_ok());
}
