//! What the host receives from a validation pass.

use crate::state::LicenseState;
use chrono::{DateTime, Utc};
use std::fmt;
use tollgate_types::{ReasonCode, ValidationResultKind};

/// Tri-state verdict for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    ProceedWithWarning,
    Block,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Proceed => "proceed",
            Self::ProceedWithWarning => "proceed-with-warning",
            Self::Block => "block",
        })
    }
}

/// Result of a validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub decision: Decision,
    /// Human-readable explanation.
    pub reason: String,
    pub reason_code: ReasonCode,
    pub expires_at: Option<DateTime<Utc>>,
    pub state: LicenseState,
    /// Whether the registry answered during this pass.
    pub online: bool,
}

impl ValidationOutcome {
    /// Builds the outcome for a state.
    ///
    /// An active license close to its expiry, and any offline grace, proceed
    /// with a warning.
    pub fn from_state(
        state: LicenseState,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        warning_window: chrono::Duration,
        online: bool,
    ) -> Self {
        let (decision, reason_code, reason) = match &state {
            LicenseState::Active => match expires_at.filter(|at| *at - now <= warning_window) {
                Some(at) => {
                    let days = (at - now).num_days();
                    (
                        Decision::ProceedWithWarning,
                        ReasonCode::ExpiringSoon,
                        format!("license expires in {days} day{}", plural(days)),
                    )
                }
                None => (Decision::Proceed, ReasonCode::Ok, "license active".to_string()),
            },
            LicenseState::OfflineGrace { deadline } => {
                let hours = (*deadline - now).num_hours().max(0);
                (
                    Decision::ProceedWithWarning,
                    ReasonCode::OfflineGrace,
                    format!(
                        "license server unreachable; offline grace ends in {hours} hour{}",
                        plural(hours)
                    ),
                )
            }
            LicenseState::Unactivated => (
                Decision::Block,
                ReasonCode::NotActivated,
                "license not activated".to_string(),
            ),
            LicenseState::Revoked => (
                Decision::Block,
                ReasonCode::Revoked,
                "license has been revoked".to_string(),
            ),
            LicenseState::Expired => (
                Decision::Block,
                ReasonCode::Expired,
                match expires_at {
                    Some(at) => format!("license expired on {}", at.format("%Y-%m-%d")),
                    None => "license has expired".to_string(),
                },
            ),
            LicenseState::Blocked { reason } => {
                (Decision::Block, reason.reason_code(), reason.to_string())
            }
        };

        Self {
            decision,
            reason,
            reason_code,
            expires_at,
            state,
            online,
        }
    }

    /// Overrides the reason for outcomes whose cause lies outside the state,
    /// such as an unreadable local record.
    #[must_use]
    pub fn with_reason(mut self, code: ReasonCode, reason: impl Into<String>) -> Self {
        self.reason_code = code;
        self.reason = reason.into();
        self
    }

    pub fn is_blocked(&self) -> bool {
        self.decision == Decision::Block
    }

    /// How this outcome is classified in the validation log.
    pub fn result_kind(&self) -> ValidationResultKind {
        match (self.decision, self.online) {
            (Decision::Block, _) => ValidationResultKind::Blocked,
            (_, true) => ValidationResultKind::Success,
            (_, false) => ValidationResultKind::Failure,
        }
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 { "" } else { "s" }
}
