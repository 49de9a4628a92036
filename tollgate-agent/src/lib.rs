//! Host wiring for the Tollgate license engine.
//!
//! Builds a [`LicenseEngine`] from an `agent.toml` file: HTTP registry,
//! checksummed file store and SQLite log under the data directory, with
//! terminal callbacks and transfer confirmation.

pub mod config;
pub mod console;

pub use config::{AgentConfig, StorageConfig};
pub use console::{ConsoleCallbacks, ConsoleVerifier};

use anyhow::{Context, Result};
use std::sync::Arc;
use tollgate_license::{LicenseEngine, VerificationCapability};
use tollgate_registry::HttpRegistry;
use tollgate_storage::{AuditLog, FileLicenseStore};
use tracing::debug;

/// Builds the engine described by `config`.
pub fn build_engine(
    config: &AgentConfig,
    verifier: Arc<dyn VerificationCapability>,
) -> Result<LicenseEngine> {
    let data_dir = config.storage.data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let store = FileLicenseStore::new(config.storage.record_path());
    let log = AuditLog::open(config.storage.log_path()).context("failed to open license log")?;
    let registry =
        HttpRegistry::new(config.registry.clone()).context("failed to set up registry client")?;
    debug!(data_dir = %data_dir.display(), registry = %config.registry.base_url, "engine wiring");

    let engine = LicenseEngine::builder(Arc::new(store), Arc::new(registry), log)
        .config(config.engine.clone())
        .callbacks(Arc::new(ConsoleCallbacks))
        .verifier(verifier)
        .build()?;
    Ok(engine)
}
