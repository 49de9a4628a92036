//! Auto-recovery of a lost local record.

use crate::matcher::{match_fingerprints, MatchReport};
use tollgate_registry::{RemoteLicenseRow, RemoteSnapshot};
use tollgate_types::HardwareFingerprint;
use tracing::{debug, warn};

/// A registry row whose binding matches this machine.
#[derive(Debug, Clone)]
pub struct RecoveryCandidate {
    pub snapshot: RemoteSnapshot,
    pub report: MatchReport,
}

/// Result of scanning the registry.
#[derive(Debug, Clone, Default)]
pub struct RecoveryScan {
    pub accepted: Option<RecoveryCandidate>,
    /// Rows compared against this machine.
    pub examined: usize,
    /// Rows skipped because they carry no binding.
    pub unbound: usize,
    /// Rows skipped because they could not be mapped.
    pub invalid: usize,
}

/// Finds the first row whose bound hardware matches `local`.
///
/// Rows with missing or renamed hardware columns simply match fewer
/// components; unreadable rows are skipped.
pub fn find_recovery(
    rows: &[RemoteLicenseRow],
    local: &HardwareFingerprint,
    default_threshold: usize,
) -> RecoveryScan {
    let mut scan = RecoveryScan::default();
    if local.is_empty() {
        warn!("no hardware identifiers available, skipping auto-recovery");
        return scan;
    }

    for row in rows {
        let snapshot = match row.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "skipping registry row during auto-recovery");
                scan.invalid += 1;
                continue;
            }
        };
        let Some(binding) = snapshot.bound_fingerprint.as_ref() else {
            scan.unbound += 1;
            continue;
        };

        scan.examined += 1;
        let threshold = snapshot.match_threshold.unwrap_or(default_threshold);
        let report = match_fingerprints(binding, local, threshold);
        debug!(key = %snapshot.key.masked(), result = %report.summary(), "auto-recovery candidate");

        if report.passed {
            scan.accepted = Some(RecoveryCandidate { snapshot, report });
            break;
        }
    }
    scan
}
