//! Engine configuration.

use crate::error::{LicenseError, LicenseResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tollgate_types::HardwareComponent;

const MIN_REVALIDATION_SECS: u64 = 60 * 60;
const MAX_REVALIDATION_SECS: u64 = 12 * 60 * 60;

/// Validation policy, fixed when the engine is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Days the license may run without a successful online check.
    pub grace_window_days: u32,
    /// Components that must agree when the registry row sets no threshold.
    pub default_match_threshold: usize,
    /// Transfer ceiling when the registry row sets none.
    pub default_max_transfers: u32,
    /// Refuse licenses whose registry row carries no hardware binding.
    pub require_remote_hardware_match: bool,
    /// Manual verifications allowed per UTC day.
    pub max_manual_verifications_per_day: u32,
    /// Timeout applied to every registry call.
    pub network_timeout_secs: u64,
    /// Period of the background validator.
    pub revalidation_interval_secs: u64,
    /// Warn when the license expires within this many days.
    pub expiry_warning_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grace_window_days: 7,
            default_match_threshold: 2,
            default_max_transfers: 3,
            require_remote_hardware_match: false,
            max_manual_verifications_per_day: 5,
            network_timeout_secs: 15,
            revalidation_interval_secs: 6 * 60 * 60,
            expiry_warning_days: 7,
        }
    }
}

impl EngineConfig {
    /// Checks every value is in range.
    pub fn validate(&self) -> LicenseResult<()> {
        if self.grace_window_days == 0 {
            return Err(LicenseError::Config(
                "grace_window_days must be at least 1".to_string(),
            ));
        }
        let components = HardwareComponent::ALL.len();
        if self.default_match_threshold == 0 || self.default_match_threshold > components {
            return Err(LicenseError::Config(format!(
                "default_match_threshold must be between 1 and {components}"
            )));
        }
        if self.max_manual_verifications_per_day == 0 {
            return Err(LicenseError::Config(
                "max_manual_verifications_per_day must be at least 1".to_string(),
            ));
        }
        if self.network_timeout_secs == 0 {
            return Err(LicenseError::Config(
                "network_timeout_secs must be at least 1".to_string(),
            ));
        }
        if !(MIN_REVALIDATION_SECS..=MAX_REVALIDATION_SECS).contains(&self.revalidation_interval_secs)
        {
            return Err(LicenseError::Config(format!(
                "revalidation_interval_secs must be between {MIN_REVALIDATION_SECS} and {MAX_REVALIDATION_SECS}"
            )));
        }
        Ok(())
    }

    pub fn grace_window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.grace_window_days))
    }

    pub fn expiry_warning(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.expiry_warning_days))
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    /// Period the host should pass to the background validator.
    pub fn revalidation_interval(&self) -> Duration {
        Duration::from_secs(self.revalidation_interval_secs)
    }
}
