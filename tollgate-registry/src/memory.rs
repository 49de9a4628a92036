//! In-process registry.

use crate::client::{BindingUpdate, RegistryClient};
use crate::error::{RegistryError, RegistryResult};
use crate::row::RemoteLicenseRow;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tollgate_types::LicenseKey;
use tracing::debug;

/// Registry held in memory.
///
/// Can be switched offline or slowed down to exercise the engine's
/// connectivity handling, and records every binding written to it.
#[derive(Default)]
pub struct MemoryRegistry {
    rows: Mutex<BTreeMap<String, RemoteLicenseRow>>,
    bindings: Mutex<Vec<BindingUpdate>>,
    latency: Mutex<Option<Duration>>,
    offline: AtomicBool,
    reject_updates: AtomicBool,
    fetch_calls: AtomicUsize,
    validate_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the given rows.
    pub fn with_rows(rows: impl IntoIterator<Item = RemoteLicenseRow>) -> Self {
        let registry = Self::new();
        for row in rows {
            registry.upsert(row);
        }
        registry
    }

    /// Inserts or replaces a row.
    pub fn upsert(&self, row: RemoteLicenseRow) {
        lock(&self.rows).insert(row.key.trim().to_string(), row);
    }

    /// Removes a row.
    pub fn remove(&self, key: &str) -> Option<RemoteLicenseRow> {
        lock(&self.rows).remove(key.trim())
    }

    /// Returns a copy of a row.
    pub fn row(&self, key: &str) -> Option<RemoteLicenseRow> {
        lock(&self.rows).get(key.trim()).cloned()
    }

    /// Changes a row's status. Returns false if the key is unknown.
    pub fn set_status(&self, key: &str, status: &str) -> bool {
        match lock(&self.rows).get_mut(key.trim()) {
            Some(row) => {
                row.status = Some(status.to_string());
                true
            }
            None => false,
        }
    }

    /// Makes every call fail as unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delays every call.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *lock(&self.latency) = latency;
    }

    /// Makes `update_binding` fail with a server error.
    pub fn set_reject_updates(&self, reject: bool) {
        self.reject_updates.store(reject, Ordering::SeqCst);
    }

    /// Bindings written so far, oldest first.
    pub fn binding_updates(&self) -> Vec<BindingUpdate> {
        lock(&self.bindings).clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    async fn simulate_network(&self) -> RegistryResult<()> {
        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(RegistryError::Unreachable(
                "memory registry is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RegistryClient for MemoryRegistry {
    async fn fetch_all(&self) -> RegistryResult<Vec<RemoteLicenseRow>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;
        Ok(lock(&self.rows).values().cloned().collect())
    }

    async fn validate_one(&self, key: &LicenseKey) -> RegistryResult<RemoteLicenseRow> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;
        lock(&self.rows)
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(key.masked()))
    }

    async fn update_binding(&self, update: &BindingUpdate) -> RegistryResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;
        if self.reject_updates.load(Ordering::SeqCst) {
            return Err(RegistryError::Status {
                status: 503,
                message: "updates disabled".to_string(),
            });
        }

        {
            let mut rows = lock(&self.rows);
            let row = rows
                .get_mut(update.key.as_str())
                .ok_or_else(|| RegistryError::NotFound(update.key.masked()))?;
            for (column, value) in update.to_columns() {
                if column == "transfer_count" {
                    row.transfer_count = value.as_u64().and_then(|n| u32::try_from(n).ok());
                } else {
                    row.columns.insert(column, value);
                }
            }
        }

        debug!(key = %update.key.masked(), "memory registry binding updated");
        lock(&self.bindings).push(update.clone());
        Ok(())
    }
}

impl From<Vec<RemoteLicenseRow>> for MemoryRegistry {
    fn from(rows: Vec<RemoteLicenseRow>) -> Self {
        Self::with_rows(rows)
    }
}
