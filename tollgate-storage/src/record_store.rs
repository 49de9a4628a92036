//! Local persistence of the license record.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tollgate_types::LicenseRecord;
use tracing::{debug, warn};

/// Current on-disk envelope version.
const STORE_VERSION: u32 = 1;

/// Domain separator for the record checksum.
const CHECKSUM_DOMAIN: &str = "tollgate:record:v1";

/// Durable home of the installation's license record.
///
/// Implementations must replace the whole record on `save`; a reader never
/// observes a partially written record.
pub trait LicenseStore: Send + Sync {
    /// Loads the record, or `None` if this installation has never been
    /// activated (or was reset).
    fn load(&self) -> StoreResult<Option<LicenseRecord>>;

    /// Replaces the stored record.
    fn save(&self, record: &LicenseRecord) -> StoreResult<()>;

    /// Removes the stored record.
    fn clear(&self) -> StoreResult<()>;
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    record: LicenseRecord,
    checksum: String,
}

fn checksum(record: &LicenseRecord) -> StoreResult<String> {
    let json = serde_json::to_vec(record)?;
    let mut hasher = Sha256::new();
    hasher.update(CHECKSUM_DOMAIN.as_bytes());
    hasher.update(&json);
    Ok(hex::encode(hasher.finalize()))
}

/// JSON file store with a checksum envelope.
pub struct FileLicenseStore {
    path: PathBuf,
}

impl FileLicenseStore {
    /// Creates a store backed by the given file. The file is created on the
    /// first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the record file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "license.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LicenseStore for FileLicenseStore {
    fn load(&self) -> StoreResult<Option<LicenseRecord>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let envelope: Envelope = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Corrupt(format!("unreadable record file: {e}")))?;

        if envelope.version != STORE_VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported record version {}",
                envelope.version
            )));
        }

        if checksum(&envelope.record)? != envelope.checksum {
            warn!(path = %self.path.display(), "license record checksum mismatch");
            return Err(StoreError::Corrupt("checksum mismatch".to_string()));
        }

        debug!(path = %self.path.display(), "loaded license record");
        Ok(Some(envelope.record))
    }

    fn save(&self, record: &LicenseRecord) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let envelope = Envelope {
            version: STORE_VERSION,
            checksum: checksum(record)?,
            record: record.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&envelope)?;

        let tmp = self.temp_path();
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), "saved license record");
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store (for testing and ephemeral hosts).
#[derive(Default)]
pub struct MemoryLicenseStore {
    record: Mutex<Option<LicenseRecord>>,
}

impl MemoryLicenseStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds a record.
    pub fn with_record(record: LicenseRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }
}

impl LicenseStore for MemoryLicenseStore {
    fn load(&self) -> StoreResult<Option<LicenseRecord>> {
        let guard = self.record.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(guard.clone())
    }

    fn save(&self, record: &LicenseRecord) -> StoreResult<()> {
        let mut guard = self.record.lock().map_err(|_| StoreError::LockPoisoned)?;
        *guard = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let mut guard = self.record.lock().map_err(|_| StoreError::LockPoisoned)?;
        *guard = None;
        Ok(())
    }
}
