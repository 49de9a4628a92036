//! Canonical hardware component names.
//!
//! This is the single vocabulary shared by the fingerprint collector and the
//! registry row mapping. Adding a component means adding a variant here; every
//! `match` over the enum then fails to compile until both sides handle it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A hardware component that contributes to a machine fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareComponent {
    /// Primary physical network adapter (MAC address).
    NetworkAdapter,
    /// Processor identity.
    Processor,
    /// System board / platform identity.
    SystemBoard,
}

impl HardwareComponent {
    /// Every canonical component, in fingerprint order.
    pub const ALL: [Self; 3] = [Self::NetworkAdapter, Self::Processor, Self::SystemBoard];

    /// Returns the canonical name used in persisted records and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkAdapter => "network_adapter",
            Self::Processor => "processor",
            Self::SystemBoard => "system_board",
        }
    }

    /// Returns the column name written back to the registry.
    #[must_use]
    pub const fn column_name(&self) -> &'static str {
        match self {
            Self::NetworkAdapter => "hw_network_adapter",
            Self::Processor => "hw_processor",
            Self::SystemBoard => "hw_system_board",
        }
    }

    /// Maps a registry column header onto a canonical component.
    ///
    /// Headers are compared after lowercasing and folding spaces and hyphens
    /// into underscores, so `"MAC Address"`, `"mac-address"` and
    /// `"mac_address"` are the same column. Returns `None` for columns that do
    /// not describe hardware.
    #[must_use]
    pub fn from_column(header: &str) -> Option<Self> {
        let normalized: String = header
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' | '.' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "network_adapter" | "hw_network_adapter" | "mac" | "mac_address" | "mac_hash"
            | "hw_mac" | "network_mac" | "nic" | "nic_id" => Some(Self::NetworkAdapter),
            "processor" | "hw_processor" | "cpu" | "cpu_id" | "cpu_hash" | "hw_cpu"
            | "processor_id" => Some(Self::Processor),
            "system_board" | "hw_system_board" | "motherboard" | "motherboard_serial"
            | "motherboard_id" | "board" | "board_serial" | "board_id" | "hw_board"
            | "machine_id" => Some(Self::SystemBoard),
            _ => None,
        }
    }
}

impl fmt::Display for HardwareComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HardwareComponent {
    type Err = crate::TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_column(s).ok_or_else(|| crate::TypesError::UnknownComponent(s.to_string()))
    }
}
