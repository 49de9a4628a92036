//! Fuzzy hardware matching.
//!
//! Two fingerprints match when at least `threshold` components are present on
//! both sides with equal hashes. A component missing on either side is
//! reported but neither agrees nor disagrees.

use std::fmt;
use tollgate_types::{HardwareComponent, HardwareFingerprint};

/// Outcome for a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOutcome {
    Matched,
    Mismatched,
    /// Present in the registry binding only.
    MissingLocal,
    /// Present on this machine only.
    MissingRemote,
}

impl FieldOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Mismatched => "mismatched",
            Self::MissingLocal => "missing_local",
            Self::MissingRemote => "missing_remote",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldReport {
    pub component: HardwareComponent,
    pub outcome: FieldOutcome,
}

/// Full result of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchReport {
    pub passed: bool,
    /// Components present on both sides with equal hashes.
    pub matched: usize,
    /// Components present on both sides.
    pub compared: usize,
    pub threshold: usize,
    /// One entry per component present on either side, in canonical order.
    pub fields: Vec<FieldReport>,
}

impl MatchReport {
    pub fn mismatched(&self) -> usize {
        self.count(FieldOutcome::Mismatched)
    }

    /// Components present on only one side.
    pub fn missing(&self) -> usize {
        self.count(FieldOutcome::MissingLocal) + self.count(FieldOutcome::MissingRemote)
    }

    pub fn outcome(&self, component: HardwareComponent) -> Option<FieldOutcome> {
        self.fields
            .iter()
            .find(|f| f.component == component)
            .map(|f| f.outcome)
    }

    /// Why the match failed, or `None` if it passed.
    pub fn mismatch_kind(&self) -> Option<MismatchKind> {
        if self.passed {
            None
        } else if self.matched == 0 {
            Some(MismatchKind::NoMatch)
        } else {
            Some(MismatchKind::BelowThreshold {
                matched: self.matched,
                threshold: self.threshold,
            })
        }
    }

    /// Per-field summary safe for logs (component names and outcomes only).
    pub fn summary(&self) -> String {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("{}={}", f.component, f.outcome.as_str()))
            .collect();
        format!(
            "{} of {} required ({})",
            self.matched,
            self.threshold,
            fields.join(", ")
        )
    }

    fn count(&self, outcome: FieldOutcome) -> usize {
        self.fields.iter().filter(|f| f.outcome == outcome).count()
    }
}

/// Why current hardware was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchKind {
    /// The license carries no hardware binding to compare against.
    NoBinding,
    /// Not a single component agrees: a different machine.
    NoMatch,
    /// Some components agree, but fewer than the threshold.
    BelowThreshold { matched: usize, threshold: usize },
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBinding => write!(f, "license has no hardware binding"),
            Self::NoMatch => write!(f, "no matching hardware found"),
            Self::BelowThreshold { matched, threshold } => write!(
                f,
                "only {matched} of {threshold} required hardware components match"
            ),
        }
    }
}

/// Compares a registry binding with this machine's fingerprint.
pub fn match_fingerprints(
    remote: &HardwareFingerprint,
    local: &HardwareFingerprint,
    threshold: usize,
) -> MatchReport {
    let mut fields = Vec::new();
    let mut matched = 0;
    let mut compared = 0;

    for component in HardwareComponent::ALL {
        let outcome = match (remote.get(component), local.get(component)) {
            (None, None) => continue,
            (Some(_), None) => FieldOutcome::MissingLocal,
            (None, Some(_)) => FieldOutcome::MissingRemote,
            (Some(r), Some(l)) => {
                compared += 1;
                if r == l {
                    matched += 1;
                    FieldOutcome::Matched
                } else {
                    FieldOutcome::Mismatched
                }
            }
        };
        fields.push(FieldReport { component, outcome });
    }

    MatchReport {
        passed: matched >= threshold,
        matched,
        compared,
        threshold,
        fields,
    }
}
