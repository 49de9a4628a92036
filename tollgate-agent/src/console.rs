//! Terminal side of the host contract: callbacks, transfer confirmation and
//! output formatting.

use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use tollgate_license::{
    Confirmed, HostCallbacks, LicenseState, PendingTransfer, Rejected, ValidationOutcome,
    VerificationCapability,
};
use tollgate_types::{AuditLogEntry, ReasonCode, ValidationLogEntry};
use tracing::{error, info, warn};

/// Reports engine notifications through the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleCallbacks;

impl HostCallbacks for ConsoleCallbacks {
    fn on_blocked(&self, reason: ReasonCode, message: &str) {
        warn!(reason = %reason, "license blocked: {}", message);
    }

    fn on_revoked(&self) {
        error!("license has been revoked");
    }

    fn on_status_changed(&self, status: &LicenseState) {
        info!(status = %status, "license status changed");
    }
}

/// Confirms transfers by asking at the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleVerifier {
    assume_yes: bool,
}

impl ConsoleVerifier {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

#[async_trait]
impl VerificationCapability for ConsoleVerifier {
    async fn request_confirmation(&self, transfer: &PendingTransfer) -> Result<Confirmed, Rejected> {
        if self.assume_yes {
            return Ok(Confirmed);
        }

        let prompt = transfer_prompt(transfer);
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stdout = io::stdout();
            write!(stdout, "{prompt} [y/N] ")?;
            stdout.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) if is_yes(&line) => Ok(Confirmed),
            Ok(Ok(_)) => Err(Rejected::new("declined at console")),
            Ok(Err(e)) => Err(Rejected::new(format!("could not read answer: {e}"))),
            Err(e) => Err(Rejected::new(format!("prompt failed: {e}"))),
        }
    }
}

/// Question shown before a transfer is confirmed.
pub fn transfer_prompt(transfer: &PendingTransfer) -> String {
    format!(
        "Move license {} to {}? {} of {} transfers used, {} left afterwards.",
        transfer.key.masked(),
        transfer.requested_by,
        transfer.transfer_count,
        transfer.max_transfers,
        transfer.remaining_after()
    )
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// ── Formatting ──────────────────────────────────────────────────

pub fn render_outcome(outcome: &ValidationOutcome) -> String {
    let mut out = format!(
        "{:<8} {}\nreason   {} ({})\nregistry {}",
        "status",
        outcome.state,
        outcome.reason,
        outcome.reason_code,
        if outcome.online { "online" } else { "offline" },
    );
    if let Some(at) = outcome.expires_at {
        out.push_str(&format!("\nexpires  {}", at.format("%Y-%m-%d %H:%M UTC")));
    }
    out.push_str(&format!("\ndecision {}", outcome.decision));
    out
}

pub fn render_validation(entry: &ValidationLogEntry) -> String {
    format!(
        "{}  {:<8} {:<24} {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.result.as_str(),
        entry.reason,
        if entry.online { "online" } else { "offline" }
    )
}

pub fn render_audit(entry: &AuditLogEntry) -> String {
    format!(
        "{}  {:<20} {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.kind.as_str(),
        entry.detail
    )
}
