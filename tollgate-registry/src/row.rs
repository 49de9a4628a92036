//! Registry rows and their mapping onto the shared vocabulary.

use crate::error::{RegistryError, RegistryResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tollgate_types::{ComponentHash, HardwareComponent, HardwareFingerprint, LicenseKey, RecordStatus};
use tracing::{debug, warn};

/// Tier reported when the registry leaves the column blank.
const DEFAULT_TIER: &str = "standard";

/// A raw registry row.
///
/// Every field except the key is optional, and any column the registry adds
/// beyond the known ones lands in `columns`, where hardware columns are found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteLicenseRow {
    #[serde(alias = "license_key", alias = "License Key", alias = "licenseKey")]
    pub key: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,

    #[serde(default, alias = "plan", deserialize_with = "lenient_string")]
    pub tier: Option<String>,

    #[serde(
        default,
        alias = "owner_email",
        alias = "email",
        deserialize_with = "lenient_string"
    )]
    pub owner: Option<String>,

    #[serde(
        default,
        alias = "expiry_date",
        alias = "expires_at",
        alias = "expiration",
        deserialize_with = "lenient_string"
    )]
    pub expiry: Option<String>,

    #[serde(default, alias = "threshold", deserialize_with = "lenient_u32")]
    pub match_threshold: Option<u32>,

    #[serde(default, alias = "transfers", deserialize_with = "lenient_u32")]
    pub transfer_count: Option<u32>,

    #[serde(default, deserialize_with = "lenient_u32")]
    pub max_transfers: Option<u32>,

    #[serde(flatten)]
    pub columns: BTreeMap<String, Value>,
}

/// Result of mapping a row's hardware columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HardwareMapping {
    /// Components recovered from recognised columns.
    pub fingerprint: HardwareFingerprint,
    /// Columns that did not name a known component.
    pub unrecognized_columns: Vec<String>,
}

/// A registry row mapped onto typed license fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSnapshot {
    pub key: LicenseKey,
    pub status: RecordStatus,
    pub tier: String,
    pub owner: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Threshold from the row, if the registry sets one.
    pub match_threshold: Option<usize>,
    pub transfer_count: u32,
    /// Ceiling from the row, if the registry sets one.
    pub max_transfers: Option<u32>,
    /// Bound hardware, or `None` if the row carries no usable hardware column.
    pub bound_fingerprint: Option<HardwareFingerprint>,
    pub unrecognized_columns: Vec<String>,
}

impl RemoteLicenseRow {
    /// Creates a row with just a key and status (for tests and demos).
    pub fn new(key: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: Some(status.into()),
            ..Default::default()
        }
    }

    /// Adds a raw column.
    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(name.into(), value.into());
        self
    }

    /// Writes a fingerprint into the canonical hardware columns.
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: &HardwareFingerprint) -> Self {
        for (component, hash) in fingerprint.iter() {
            self.columns.insert(
                component.column_name().to_string(),
                Value::String(hash.as_str().to_string()),
            );
        }
        self
    }

    /// Maps hardware columns onto canonical components.
    ///
    /// Missing, blank or placeholder values simply leave the component out.
    /// When several columns name the same component, the canonical column
    /// wins; otherwise the first (by column name) non-empty value is used.
    pub fn map_hardware(&self) -> HardwareMapping {
        let mut mapping = HardwareMapping::default();

        for (name, value) in &self.columns {
            let Some(component) = HardwareComponent::from_column(name) else {
                mapping.unrecognized_columns.push(name.clone());
                continue;
            };

            let Some(raw) = value_as_string(value) else {
                continue;
            };
            let Some(hash) = ComponentHash::from_registry_value(component, &raw) else {
                continue;
            };

            let canonical = name == component.column_name();
            if canonical || !mapping.fingerprint.contains(component) {
                mapping.fingerprint.insert(component, hash);
            }
        }

        if !mapping.unrecognized_columns.is_empty() {
            debug!(
                columns = ?mapping.unrecognized_columns,
                "registry row has unrecognized columns"
            );
        }
        mapping
    }

    /// Maps the row onto typed license fields.
    ///
    /// Fails only for a missing key or an unparseable expiry; every other
    /// irregularity falls back to a conservative default.
    pub fn snapshot(&self) -> RegistryResult<RemoteSnapshot> {
        let key = LicenseKey::parse(&self.key).map_err(|e| RegistryError::InvalidRow {
            key: self.key.clone(),
            reason: e.to_string(),
        })?;

        let status = match self.status.as_deref() {
            None => RecordStatus::Pending,
            Some(word) => RecordStatus::from_registry(word).unwrap_or_else(|| {
                warn!(key = %key.masked(), status = word, "unknown registry status, treating as suspended");
                RecordStatus::Suspended
            }),
        };

        let expires_at = match self.expiry.as_deref() {
            None => None,
            Some(raw) => parse_expiry(raw).map_err(|reason| RegistryError::InvalidRow {
                key: self.key.clone(),
                reason,
            })?,
        };

        let HardwareMapping {
            fingerprint,
            unrecognized_columns,
        } = self.map_hardware();

        Ok(RemoteSnapshot {
            key,
            status,
            tier: self
                .tier
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TIER.to_string()),
            owner: self.owner.clone().filter(|o| !o.trim().is_empty()),
            expires_at,
            match_threshold: self.match_threshold.filter(|t| *t > 0).map(|t| t as usize),
            transfer_count: self.transfer_count.unwrap_or(0),
            max_transfers: self.max_transfers,
            bound_fingerprint: (!fingerprint.is_empty()).then_some(fingerprint),
            unrecognized_columns,
        })
    }
}

/// Parses an expiry cell.
///
/// Blank, `never` and `perpetual` mean no expiry. A bare date is valid through
/// the end of that UTC day.
pub(crate) fn parse_expiry(raw: &str) -> Result<Option<DateTime<Utc>>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || ["never", "perpetual", "none", "n/a"]
            .iter()
            .any(|w| trimmed.eq_ignore_ascii_case(w))
    {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(Some(naive.and_utc()));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(end_of_day) = date.and_hms_opt(23, 59, 59) {
            return Ok(Some(end_of_day.and_utc()));
        }
    }

    Err(format!("unrecognized expiry date {trimmed:?}"))
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_as_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    })
}
