//! Offline grace arithmetic.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// A bounded offline period, evaluated at a fixed instant.
///
/// Holds nothing but the deadline and the evaluation time. The deadline
/// itself is still allowed; only instants after it are expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraceWindow {
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
}

impl GraceWindow {
    /// Window that opened at `anchor` and lasts `window_days`.
    pub fn new(anchor: DateTime<Utc>, now: DateTime<Utc>, window_days: u32) -> Self {
        Self {
            deadline: anchor + chrono::Duration::days(i64::from(window_days)),
            now,
        }
    }

    pub fn with_deadline(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self { deadline, now }
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Time left before the window closes; zero once expired.
    pub fn remaining(&self) -> Duration {
        (self.deadline - self.now).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn expired(&self) -> bool {
        self.now > self.deadline
    }
}
