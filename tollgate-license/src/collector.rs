//! Hardware fingerprint collection.
//!
//! Reads stable machine identifiers and hashes them into a
//! [`HardwareFingerprint`]. A component that cannot be read is left out, so a
//! degraded machine still yields a partial fingerprint rather than an error.
//! Raw values never leave this module unhashed.

use std::collections::BTreeMap;
use tollgate_types::{ComponentHash, HardwareComponent, HardwareFingerprint};
use tracing::debug;

/// Something that can read raw hardware identifiers.
pub trait FingerprintSource: Send + Sync {
    /// Reads the raw identifier for one component, or `None` if unavailable.
    fn read(&self, component: HardwareComponent) -> Option<String>;
}

/// Collects and hashes every canonical component the source can read.
pub fn collect(source: &dyn FingerprintSource) -> HardwareFingerprint {
    let mut fingerprint = HardwareFingerprint::new();
    for component in HardwareComponent::ALL {
        match source
            .read(component)
            .and_then(|raw| ComponentHash::digest(component, &raw))
        {
            Some(hash) => fingerprint.insert(component, hash),
            None => debug!(component = %component, "hardware component unavailable"),
        }
    }
    debug!(
        components = fingerprint.len(),
        of = HardwareComponent::ALL.len(),
        "collected hardware fingerprint"
    );
    fingerprint
}

/// Name of this machine, for transfer requests shown to a human verifier.
pub fn host_label() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown host".to_string())
}

/// Fixed identifiers (for tests and for hosts that probe hardware themselves).
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    values: BTreeMap<HardwareComponent, String>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, component: HardwareComponent, raw: impl Into<String>) -> Self {
        self.values.insert(component, raw.into());
        self
    }

    #[must_use]
    pub fn without(mut self, component: HardwareComponent) -> Self {
        self.values.remove(&component);
        self
    }
}

impl FingerprintSource for StaticProbe {
    fn read(&self, component: HardwareComponent) -> Option<String> {
        self.values.get(&component).cloned()
    }
}

/// Reads identifiers from the running host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl FingerprintSource for SystemProbe {
    fn read(&self, component: HardwareComponent) -> Option<String> {
        match component {
            HardwareComponent::NetworkAdapter => platform::network_adapter(),
            HardwareComponent::Processor => platform::processor(),
            HardwareComponent::SystemBoard => platform::system_board(),
        }
    }
}

/// Returns the first candidate that hashes to a usable value.
fn first_usable(
    component: HardwareComponent,
    candidates: impl IntoIterator<Item = Option<String>>,
) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| ComponentHash::digest(component, value).is_some())
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

#[cfg(target_os = "linux")]
mod platform {
    use super::first_usable;
    use std::fs;
    use std::path::Path;
    use tollgate_types::HardwareComponent;

    fn read_trimmed(path: impl AsRef<Path>) -> Option<String> {
        fs::read_to_string(path).ok().map(|s| s.trim().to_string())
    }

    pub(super) fn network_adapter() -> Option<String> {
        let mut names: Vec<String> = fs::read_dir("/sys/class/net")
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name != "lo")
            .collect();
        names.sort();

        // Physical adapters have a backing device; prefer them over bridges and tunnels.
        let (physical, virtual_): (Vec<_>, Vec<_>) = names
            .into_iter()
            .partition(|name| Path::new("/sys/class/net").join(name).join("device").exists());

        first_usable(
            HardwareComponent::NetworkAdapter,
            physical
                .iter()
                .chain(virtual_.iter())
                .map(|name| read_trimmed(Path::new("/sys/class/net").join(name).join("address"))),
        )
    }

    pub(super) fn processor() -> Option<String> {
        let cpuinfo = fs::read_to_string("/proc/cpuinfo").ok()?;
        let mut parts = Vec::new();
        for field in ["vendor_id", "model name", "CPU implementer", "CPU part", "Hardware"] {
            let value = cpuinfo.lines().find_map(|line| {
                let (name, value) = line.split_once(':')?;
                (name.trim() == field).then(|| value.trim().to_string())
            });
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                parts.push(value);
            }
        }
        first_usable(HardwareComponent::Processor, [Some(parts.join(" "))])
    }

    pub(super) fn system_board() -> Option<String> {
        first_usable(
            HardwareComponent::SystemBoard,
            [
                read_trimmed("/sys/class/dmi/id/board_serial"),
                read_trimmed("/sys/class/dmi/id/product_uuid"),
                read_trimmed("/etc/machine-id"),
                read_trimmed("/var/lib/dbus/machine-id"),
            ],
        )
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use super::{command_output, first_usable};
    use tollgate_types::HardwareComponent;

    fn ioreg_value(output: &str, field: &str) -> Option<String> {
        output
            .lines()
            .find(|l| l.contains(field))
            .and_then(|l| l.split('"').nth(3))
            .map(String::from)
    }

    pub(super) fn network_adapter() -> Option<String> {
        let candidates = ["en0", "en1"].into_iter().map(|iface| {
            command_output("ifconfig", &[iface]).and_then(|out| {
                out.lines()
                    .map(str::trim)
                    .find_map(|l| l.strip_prefix("ether "))
                    .map(|mac| mac.trim().to_string())
            })
        });
        first_usable(HardwareComponent::NetworkAdapter, candidates)
    }

    pub(super) fn processor() -> Option<String> {
        first_usable(
            HardwareComponent::Processor,
            [command_output("sysctl", &["-n", "machdep.cpu.brand_string"])],
        )
    }

    pub(super) fn system_board() -> Option<String> {
        let output = command_output("ioreg", &["-rd1", "-c", "IOPlatformExpertDevice"]);
        first_usable(
            HardwareComponent::SystemBoard,
            [
                output.as_deref().and_then(|o| ioreg_value(o, "IOPlatformSerialNumber")),
                output.as_deref().and_then(|o| ioreg_value(o, "IOPlatformUUID")),
            ],
        )
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use super::{command_output, first_usable};
    use tollgate_types::HardwareComponent;

    /// Runs `wmic ... get <field> /value` and returns every `field=value` line's value.
    fn wmic(args: &[&str], field: &str) -> Vec<Option<String>> {
        let mut full: Vec<&str> = args.to_vec();
        full.extend(["get", field, "/value"]);
        command_output("wmic", &full)
            .map(|out| {
                out.lines()
                    .filter_map(|l| l.trim().strip_prefix(&format!("{field}=")).map(String::from))
                    .map(Some)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(super) fn network_adapter() -> Option<String> {
        first_usable(
            HardwareComponent::NetworkAdapter,
            wmic(&["nic", "where", "PhysicalAdapter=True"], "MACAddress"),
        )
    }

    pub(super) fn processor() -> Option<String> {
        first_usable(HardwareComponent::Processor, wmic(&["cpu"], "ProcessorId"))
    }

    pub(super) fn system_board() -> Option<String> {
        let mut candidates = wmic(&["baseboard"], "SerialNumber");
        candidates.extend(wmic(&["csproduct"], "UUID"));
        first_usable(HardwareComponent::SystemBoard, candidates)
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
mod platform {
    pub(super) fn network_adapter() -> Option<String> {
        None
    }

    pub(super) fn processor() -> Option<String> {
        None
    }

    pub(super) fn system_board() -> Option<String> {
        None
    }
}
