//! Hashed hardware fingerprints.
//!
//! Raw identifiers never leave this module: they are normalised and hashed on
//! the way in, and only the digest is stored, compared or sent anywhere.

use crate::component::HardwareComponent;
use crate::{TypesError, TypesResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Domain separator mixed into every component digest.
const HASH_DOMAIN: &str = "tollgate:hw:v1";

/// Length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// Values that hardware probes and spreadsheets use to mean "no value".
const PLACEHOLDERS: &[&str] = &[
    "",
    "-",
    "0",
    "n/a",
    "na",
    "none",
    "null",
    "unknown",
    "default string",
    "to be filled by o.e.m.",
    "not specified",
    "system serial number",
    "00:00:00:00:00:00",
];

/// One-way hash of a single component's raw identifier.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComponentHash(String);

impl ComponentHash {
    /// Hashes a raw identifier read from the host.
    ///
    /// Returns `None` when the value is empty or a known placeholder, so a
    /// blank probe result is treated as a missing component rather than as a
    /// value that happens to match every other blank machine.
    #[must_use]
    pub fn digest(component: HardwareComponent, raw: &str) -> Option<Self> {
        let normalized = normalize_raw(component, raw);
        if is_placeholder(&normalized) {
            return None;
        }

        let mut hasher = Sha256::new();
        hasher.update(HASH_DOMAIN.as_bytes());
        hasher.update(b":");
        hasher.update(component.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(normalized.as_bytes());
        Some(Self(hex::encode(hasher.finalize())))
    }

    /// Parses an already-hashed value (64 hex characters, any case).
    pub fn from_hex(value: &str) -> TypesResult<Self> {
        let value = value.trim();
        if value.len() != DIGEST_HEX_LEN || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypesError::InvalidHash(format!(
                "expected {DIGEST_HEX_LEN} hex characters, got {} characters",
                value.len()
            )));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    /// Interprets a value read from a registry column.
    ///
    /// A digest is taken as-is; any other non-placeholder value is treated as
    /// a raw identifier and hashed with the same normalisation the collector
    /// applies.
    #[must_use]
    pub fn from_registry_value(component: HardwareComponent, value: &str) -> Option<Self> {
        match Self::from_hex(value) {
            Ok(hash) => Some(hash),
            Err(_) => Self::digest(component, value),
        }
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ComponentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentHash({}…)", &self.0[..8])
    }
}

impl TryFrom<String> for ComponentHash {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<ComponentHash> for String {
    fn from(hash: ComponentHash) -> Self {
        hash.0
    }
}

/// Normalises a raw identifier before hashing.
fn normalize_raw(component: HardwareComponent, raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let lowered = collapsed.to_lowercase();
    match component {
        HardwareComponent::NetworkAdapter => lowered.replace('-', ":").replace(' ', ""),
        HardwareComponent::Processor | HardwareComponent::SystemBoard => lowered,
    }
}

fn is_placeholder(normalized: &str) -> bool {
    PLACEHOLDERS.contains(&normalized)
}

/// Ordered mapping from canonical component to hashed identifier.
///
/// A fingerprint may be degraded (fewer than [`HardwareComponent::ALL`]
/// entries) when some probes fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HardwareFingerprint {
    components: BTreeMap<HardwareComponent, ComponentHash>,
}

impl HardwareFingerprint {
    /// Creates an empty fingerprint.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hash for a component, replacing any previous value.
    pub fn insert(&mut self, component: HardwareComponent, hash: ComponentHash) {
        self.components.insert(component, hash);
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, component: HardwareComponent, hash: ComponentHash) -> Self {
        self.insert(component, hash);
        self
    }

    /// Returns the hash recorded for a component, if any.
    #[must_use]
    pub fn get(&self, component: HardwareComponent) -> Option<&ComponentHash> {
        self.components.get(&component)
    }

    /// Returns true if the component is present.
    #[must_use]
    pub fn contains(&self, component: HardwareComponent) -> bool {
        self.components.contains_key(&component)
    }

    /// Number of components present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if no component is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Returns true if every canonical component is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        HardwareComponent::ALL.iter().all(|c| self.contains(*c))
    }

    /// Iterates over present components in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (HardwareComponent, &ComponentHash)> {
        self.components.iter().map(|(c, h)| (*c, h))
    }

    /// Returns the present component names.
    pub fn components(&self) -> impl Iterator<Item = HardwareComponent> + '_ {
        self.components.keys().copied()
    }
}

impl FromIterator<(HardwareComponent, ComponentHash)> for HardwareFingerprint {
    fn from_iter<I: IntoIterator<Item = (HardwareComponent, ComponentHash)>>(iter: I) -> Self {
        Self {
            components: iter.into_iter().collect(),
        }
    }
}
