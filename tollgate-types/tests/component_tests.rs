use std::str::FromStr;
use tollgate_types::HardwareComponent;

// ── Canonical names ───────────────────────────────────────────────

#[test]
fn all_lists_every_component_once() {
    let all = HardwareComponent::ALL;
    assert_eq!(all.len(), 3);
    let mut sorted = all.to_vec();
    sorted.dedup();
    assert_eq!(sorted.len(), 3);
}

#[test]
fn canonical_names_map_back() {
    for component in HardwareComponent::ALL {
        assert_eq!(HardwareComponent::from_column(component.as_str()), Some(component));
        assert_eq!(HardwareComponent::from_column(component.column_name()), Some(component));
    }
}

#[test]
fn display_matches_as_str() {
    assert_eq!(HardwareComponent::NetworkAdapter.to_string(), "network_adapter");
    assert_eq!(HardwareComponent::Processor.to_string(), "processor");
    assert_eq!(HardwareComponent::SystemBoard.to_string(), "system_board");
}

#[test]
fn serde_uses_snake_case() {
    let json = serde_json::to_string(&HardwareComponent::SystemBoard).unwrap();
    assert_eq!(json, "\"system_board\"");
    let parsed: HardwareComponent = serde_json::from_str("\"network_adapter\"").unwrap();
    assert_eq!(parsed, HardwareComponent::NetworkAdapter);
}

// ── Column aliases ────────────────────────────────────────────────

#[test]
fn spreadsheet_headers_are_normalized() {
    assert_eq!(
        HardwareComponent::from_column("MAC Address"),
        Some(HardwareComponent::NetworkAdapter)
    );
    assert_eq!(
        HardwareComponent::from_column("mac-hash"),
        Some(HardwareComponent::NetworkAdapter)
    );
    assert_eq!(
        HardwareComponent::from_column("  CPU_ID "),
        Some(HardwareComponent::Processor)
    );
    assert_eq!(
        HardwareComponent::from_column("Motherboard Serial"),
        Some(HardwareComponent::SystemBoard)
    );
}

#[test]
fn non_hardware_columns_are_not_mapped() {
    assert_eq!(HardwareComponent::from_column("owner_email"), None);
    assert_eq!(HardwareComponent::from_column("status"), None);
    assert_eq!(HardwareComponent::from_column(""), None);
}

#[test]
fn from_str_rejects_unknown() {
    assert_eq!(
        HardwareComponent::from_str("cpu").unwrap(),
        HardwareComponent::Processor
    );
    let err = HardwareComponent::from_str("gpu").unwrap_err();
    assert!(err.to_string().contains("unknown hardware component"));
}

#[test]
fn ordering_follows_declaration() {
    assert!(HardwareComponent::NetworkAdapter < HardwareComponent::Processor);
    assert!(HardwareComponent::Processor < HardwareComponent::SystemBoard);
}
