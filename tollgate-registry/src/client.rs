//! Registry client abstraction.

use crate::error::RegistryResult;
use crate::row::RemoteLicenseRow;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tollgate_types::{HardwareFingerprint, LicenseKey};

/// New hardware binding written back after a confirmed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingUpdate {
    /// License being rebound.
    pub key: LicenseKey,
    /// Fingerprint of the machine taking over the license.
    pub fingerprint: HardwareFingerprint,
    /// Transfer count after this transfer.
    pub transfer_count: u32,
}

impl BindingUpdate {
    /// Renders the update as registry columns, using the canonical column
    /// name for each component.
    pub fn to_columns(&self) -> Map<String, Value> {
        let mut columns = Map::new();
        for (component, hash) in self.fingerprint.iter() {
            columns.insert(
                component.column_name().to_string(),
                Value::String(hash.as_str().to_string()),
            );
        }
        columns.insert(
            "transfer_count".to_string(),
            Value::from(self.transfer_count),
        );
        columns
    }
}

/// The authoritative license directory.
///
/// Implementations only report what the registry holds; mapping raw hardware
/// columns onto canonical components is done by [`RemoteLicenseRow`].
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fetches every row visible to this installation.
    async fn fetch_all(&self) -> RegistryResult<Vec<RemoteLicenseRow>>;

    /// Fetches the row for one key.
    async fn validate_one(&self, key: &LicenseKey) -> RegistryResult<RemoteLicenseRow>;

    /// Writes a new hardware binding and transfer count for a key.
    async fn update_binding(&self, update: &BindingUpdate) -> RegistryResult<()>;
}
