//! Host application notifications.

use crate::state::LicenseState;
use tollgate_types::ReasonCode;

/// Notifications delivered to the host on state transitions.
///
/// Called synchronously from whichever path observed the transition
/// (foreground validation or a background tick) while the engine lock is
/// held. Implementations must return promptly and must not call back into
/// the engine.
pub trait HostCallbacks: Send + Sync {
    /// The license entered a blocking state other than revocation.
    fn on_blocked(&self, _reason: ReasonCode, _message: &str) {}

    /// The license was revoked.
    fn on_revoked(&self) {}

    /// The license state changed.
    fn on_status_changed(&self, _status: &LicenseState) {}
}

/// Ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallbacks;

impl HostCallbacks for NoopCallbacks {}
